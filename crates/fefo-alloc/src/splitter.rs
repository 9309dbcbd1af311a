//! 數量切分器（多列分配）

use std::collections::HashMap;

use chrono::NaiveDate;
use fefo_core::{
    AllocError, AllocationResultRow, DocumentRow, PricingRuleConstraint, QtyBounds, Result,
    RowBinding, SelectionMode,
};
use rust_decimal::Decimal;

use crate::catalog::BatchCatalog;

/// 批次容量池中的單一批次
#[derive(Debug, Clone)]
pub struct PoolEntry {
    batch_id: String,
    /// 切分前的原始庫存（顯示快照）
    original_qty: Decimal,
    /// 尚可切分的容量
    remaining_qty: Decimal,
    /// 已綁定到既有單據列的數量
    bound_qty: Decimal,
    shortdated: bool,
}

impl PoolEntry {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn original_qty(&self) -> Decimal {
        self.original_qty
    }

    pub fn remaining_qty(&self) -> Decimal {
        self.remaining_qty
    }

    pub fn bound_qty(&self) -> Decimal {
        self.bound_qty
    }

    pub fn shortdated(&self) -> bool {
        self.shortdated
    }
}

/// FEFO 順序的批次容量池
///
/// 付費切分與免費品切分共用同一個池：免費品階段接手的是已被付費
/// 分配扣減過的容量。
#[derive(Debug, Clone)]
pub struct BatchPool {
    entries: Vec<PoolEntry>,
}

impl BatchPool {
    /// 依篩選模式建池：排除已過期與零/負庫存批次
    pub fn build(
        catalog: &BatchCatalog,
        mode: SelectionMode,
        today: NaiveDate,
        alert_date: NaiveDate,
    ) -> Self {
        let entries = catalog
            .candidates()
            .iter()
            .filter(|c| c.has_stock() && !c.is_expired(today))
            .filter(|c| mode.accepts(c.is_shortdated(alert_date)))
            .map(|c| PoolEntry {
                batch_id: c.batch_id.clone(),
                original_qty: c.on_hand_qty,
                remaining_qty: c.on_hand_qty,
                bound_qty: Decimal::ZERO,
                shortdated: c.is_shortdated(alert_date),
            })
            .collect();

        Self { entries }
    }

    /// 池中批次
    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    /// 查詢批次在池中的索引
    pub fn index_of(&self, batch_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.batch_id == batch_id)
    }

    /// 剩餘可切分總容量
    pub fn total_remaining(&self) -> Decimal {
        self.entries.iter().map(|e| e.remaining_qty).sum()
    }

    /// 依 FEFO 順序切分需求；回傳（批次索引, 數量）序列與未滿足餘量
    pub fn carve(&mut self, mut demand: Decimal) -> (Vec<(usize, Decimal)>, Decimal) {
        let mut carved = Vec::new();

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if demand <= Decimal::ZERO {
                break;
            }
            if entry.remaining_qty <= Decimal::ZERO {
                continue;
            }

            let take = entry.remaining_qty.min(demand);
            entry.remaining_qty -= take;
            demand -= take;
            carved.push((index, take));
        }

        (carved, demand)
    }

    fn record_bound(&mut self, index: usize, qty: Decimal) {
        self.entries[index].bound_qty += qty;
    }
}

/// 切分記錄（arena 中的一筆；綁定透過索引工作清單進行，不跨階段共享可變參照）
#[derive(Debug, Clone)]
struct Carve {
    pool_index: usize,
    qty: Decimal,
    binding: RowBinding,
}

/// 切分輸入
#[derive(Debug)]
pub struct SplitInput<'a> {
    /// 需求數量（涵蓋整張單據，免費列數量會先被扣除）
    pub requested_qty: Decimal,

    /// 批次篩選模式
    pub selection_mode: SelectionMode,

    /// 單據中既有的同物料列
    pub rows: &'a [DocumentRow],

    /// 價格規則約束（以規則ID索引）
    pub constraints: &'a HashMap<String, PricingRuleConstraint>,

    /// 是否套用價格規則界限（僅帶價格規則的單據類型）
    pub enforce_constraints: bool,
}

/// 切分結果：結果列、未滿足餘量、與交棒給免費品對帳的容量池
#[derive(Debug)]
pub struct SplitResult {
    pub result_rows: Vec<AllocationResultRow>,
    pub remaining_qty: Decimal,
    pub pool: BatchPool,
}

/// 數量切分器
pub struct QuantitySplitter;

impl QuantitySplitter {
    /// 將需求數量切分到候選批次與既有單據列上
    ///
    /// 兩階段：先依 FEFO 順序把需求刻進未綁定的切分記錄（容量切分），
    /// 再依既定順序將切分記錄綁定到既有單據列，超出列上限的記錄
    /// 一分為二（綁定上限量 + 殘量回到工作清單）。
    pub fn split(
        catalog: &BatchCatalog,
        input: &SplitInput<'_>,
        today: NaiveDate,
        alert_date: NaiveDate,
    ) -> Result<SplitResult> {
        if input.requested_qty < Decimal::ZERO {
            return Err(AllocError::InvalidArgument(format!(
                "需求數量不可為負數: {}",
                input.requested_qty
            )));
        }

        let mut pool = BatchPool::build(catalog, input.selection_mode, today, alert_date);

        // 免費列不計入付費需求，於對帳階段重新進入
        let free_qty: Decimal = input
            .rows
            .iter()
            .filter(|r| r.is_free_item)
            .map(|r| r.qty)
            .sum();
        let open_qty = (input.requested_qty - free_qty).max(Decimal::ZERO);

        // 容量切分：依 FEFO 順序刻出未綁定的切分記錄
        let (carved, remaining_qty) = pool.carve(open_qty);
        let mut arena: Vec<Carve> = carved
            .into_iter()
            .map(|(pool_index, qty)| Carve {
                pool_index,
                qty,
                binding: RowBinding::New,
            })
            .collect();
        let mut worklist: Vec<usize> = (0..arena.len()).collect();

        // 列配對：既有非免費列依（批次ID小寫降冪、數量降冪）排序後
        // 依序認領切分記錄
        let mut matchable: Vec<&DocumentRow> = input
            .rows
            .iter()
            .filter(|r| !r.is_free_item)
            .filter(|r| match &r.batch_id {
                Some(batch_id) => pool.index_of(batch_id).is_some(),
                None => true,
            })
            .collect();
        matchable.sort_by(|a, b| {
            let key_a = (
                a.batch_id.clone().unwrap_or_default().to_lowercase(),
                a.qty,
            );
            let key_b = (
                b.batch_id.clone().unwrap_or_default().to_lowercase(),
                b.qty,
            );
            key_b.cmp(&key_a)
        });

        for row in matchable {
            let bounds = if input.enforce_constraints && row.has_constraints() {
                QtyBounds::effective(
                    row.pricing_rule_ids
                        .iter()
                        .filter_map(|rule_id| input.constraints.get(rule_id)),
                )
            } else {
                QtyBounds::unbounded()
            };

            Self::bind_row(row, &bounds, &mut arena, &mut worklist, &mut pool);
        }

        let result_rows = arena
            .into_iter()
            .map(|carve| {
                let entry = &pool.entries()[carve.pool_index];
                AllocationResultRow::new(
                    carve.binding,
                    entry.batch_id().to_string(),
                    carve.qty,
                    entry.original_qty(),
                    entry.shortdated(),
                )
            })
            .collect();

        Ok(SplitResult {
            result_rows,
            remaining_qty,
            pool,
        })
    }

    /// 為單一單據列認領一筆切分記錄：界限內整筆綁定；超過上限則
    /// 拆成綁定上限量的新記錄與回到工作清單的殘量
    fn bind_row(
        row: &DocumentRow,
        bounds: &QtyBounds,
        arena: &mut Vec<Carve>,
        worklist: &mut Vec<usize>,
        pool: &mut BatchPool,
    ) {
        let mut position = 0;
        while position < worklist.len() {
            let carve_index = worklist[position];
            let (pool_index, carve_qty) = {
                let carve = &arena[carve_index];
                (carve.pool_index, carve.qty)
            };

            // 列已選定批次時僅認領同批次的切分記錄
            if let Some(batch_id) = &row.batch_id {
                if pool.entries()[pool_index].batch_id() != batch_id.as_str() {
                    position += 1;
                    continue;
                }
            }

            if carve_qty < bounds.min_qty {
                position += 1;
                continue;
            }

            match bounds.max_qty {
                Some(max_qty) if carve_qty > max_qty => {
                    // 拆分：上限量綁定到此列，殘量留在原位回到配對池
                    arena[carve_index].qty = carve_qty - max_qty;
                    arena.push(Carve {
                        pool_index,
                        qty: max_qty,
                        binding: RowBinding::Existing(row.row_id.clone()),
                    });
                    pool.record_bound(pool_index, max_qty);
                    return;
                }
                _ => {
                    arena[carve_index].binding = RowBinding::Existing(row.row_id.clone());
                    pool.record_bound(pool_index, carve_qty);
                    worklist.remove(position);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBatchStore, InMemoryStockLedger};
    use fefo_core::BatchMeta;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 8, 1)
    }

    fn alert_date() -> NaiveDate {
        // 6 個月門檻
        date(2027, 2, 1)
    }

    fn catalog(batches: &[(&str, Option<NaiveDate>, i64)]) -> BatchCatalog {
        let mut store = InMemoryBatchStore::new();
        let mut ledger = InMemoryStockLedger::new();
        for (batch_id, expiry, qty) in batches {
            let mut meta = BatchMeta::new(batch_id.to_string());
            meta.expiry_date = *expiry;
            store = store.with_batch("ITEM-1", meta);
            ledger = ledger.with_movement("ITEM-1", "WH-A", Some(batch_id), Decimal::from(*qty));
        }
        BatchCatalog::load(&store, &ledger, "ITEM-1", "WH-A", today())
    }

    fn split(
        catalog: &BatchCatalog,
        requested: i64,
        mode: SelectionMode,
        rows: &[DocumentRow],
        constraints: &HashMap<String, PricingRuleConstraint>,
    ) -> SplitResult {
        let input = SplitInput {
            requested_qty: Decimal::from(requested),
            selection_mode: mode,
            rows,
            constraints,
            enforce_constraints: true,
        };
        QuantitySplitter::split(catalog, &input, today(), alert_date()).unwrap()
    }

    #[test]
    fn test_fefo_carving_across_two_batches() {
        // 批次 B1(50, +10d 短效期)、B2(80, +400d 長效期)，需求 60
        let catalog = catalog(&[
            ("B1", Some(date(2026, 8, 11)), 50),
            ("B2", Some(date(2027, 9, 5)), 80),
        ]);

        let result = split(&catalog, 60, SelectionMode::AnyDated, &[], &HashMap::new());

        assert_eq!(result.result_rows.len(), 2);
        assert_eq!(result.result_rows[0].batch_id, "B1");
        assert_eq!(result.result_rows[0].qty, Decimal::from(50));
        assert!(result.result_rows[0].shortdated);
        assert_eq!(result.result_rows[1].batch_id, "B2");
        assert_eq!(result.result_rows[1].qty, Decimal::from(10));
        assert!(!result.result_rows[1].shortdated);
        assert_eq!(result.remaining_qty, Decimal::ZERO);
    }

    #[test]
    fn test_capacity_conservation() {
        let catalog = catalog(&[
            ("B1", Some(date(2026, 9, 1)), 30),
            ("B2", Some(date(2026, 10, 1)), 20),
        ]);

        let result = split(&catalog, 80, SelectionMode::AnyDated, &[], &HashMap::new());

        let allocated: Decimal = result.result_rows.iter().map(|r| r.qty).sum();
        // sum(result.qty) + remaining == requested
        assert_eq!(allocated + result.remaining_qty, Decimal::from(80));
        // 每一批次的分配量不超過其現有庫存
        assert_eq!(allocated, Decimal::from(50));
        assert_eq!(result.remaining_qty, Decimal::from(30));
    }

    #[test]
    fn test_selection_mode_filters_pool() {
        let catalog = catalog(&[
            ("B-SHORT", Some(date(2026, 10, 1)), 50),
            ("B-LONG", Some(date(2028, 1, 1)), 50),
        ]);

        let longdated = split(
            &catalog,
            30,
            SelectionMode::LongdatedOnly,
            &[],
            &HashMap::new(),
        );
        assert_eq!(longdated.result_rows.len(), 1);
        assert_eq!(longdated.result_rows[0].batch_id, "B-LONG");

        let shortdated = split(
            &catalog,
            30,
            SelectionMode::ShortdatedOnly,
            &[],
            &HashMap::new(),
        );
        assert_eq!(shortdated.result_rows.len(), 1);
        assert_eq!(shortdated.result_rows[0].batch_id, "B-SHORT");
    }

    #[test]
    fn test_existing_row_is_bound() {
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 100)]);
        let rows = vec![DocumentRow::new("row-1".to_string(), Decimal::from(40))];

        let result = split(&catalog, 40, SelectionMode::AnyDated, &rows, &HashMap::new());

        assert_eq!(result.result_rows.len(), 1);
        assert_eq!(
            result.result_rows[0].row_binding,
            RowBinding::Existing("row-1".to_string())
        );
        assert_eq!(result.result_rows[0].available_qty_at_batch, Decimal::from(100));
    }

    #[test]
    fn test_row_pinned_to_other_batch_not_bound() {
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 100)]);
        let rows = vec![
            DocumentRow::new("row-1".to_string(), Decimal::from(40))
                .with_batch_id("B1".to_string()),
            DocumentRow::new("row-2".to_string(), Decimal::from(40))
                .with_batch_id("B-GONE".to_string()),
        ];

        let result = split(&catalog, 40, SelectionMode::AnyDated, &rows, &HashMap::new());

        // B-GONE 不在池中：row-2 不參與配對，切分記錄綁給 row-1
        assert_eq!(result.result_rows.len(), 1);
        assert_eq!(
            result.result_rows[0].row_binding,
            RowBinding::Existing("row-1".to_string())
        );
    }

    #[test]
    fn test_over_max_carve_is_split() {
        // 需求 35 刻進單一批次，列上限 20：拆成綁定 20 + 殘量 15
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 50)]);
        let rows = vec![DocumentRow::new("row-1".to_string(), Decimal::from(35))
            .with_pricing_rule_ids(vec!["PRLE-MAX20".to_string()])];
        let mut constraints = HashMap::new();
        constraints.insert(
            "PRLE-MAX20".to_string(),
            PricingRuleConstraint::new("PRLE-MAX20".to_string(), Decimal::ZERO, Decimal::from(20)),
        );

        let result = split(&catalog, 35, SelectionMode::AnyDated, &rows, &constraints);

        assert_eq!(result.result_rows.len(), 2);
        // 殘量留在原位（未綁定）
        assert_eq!(result.result_rows[0].qty, Decimal::from(15));
        assert_eq!(result.result_rows[0].row_binding, RowBinding::New);
        // 上限量綁定到單據列
        assert_eq!(result.result_rows[1].qty, Decimal::from(20));
        assert_eq!(
            result.result_rows[1].row_binding,
            RowBinding::Existing("row-1".to_string())
        );
        assert_eq!(result.remaining_qty, Decimal::ZERO);
    }

    #[test]
    fn test_below_min_carve_is_skipped() {
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 5)]);
        let rows = vec![DocumentRow::new("row-1".to_string(), Decimal::from(5))
            .with_pricing_rule_ids(vec!["PRLE-MIN10".to_string()])];
        let mut constraints = HashMap::new();
        constraints.insert(
            "PRLE-MIN10".to_string(),
            PricingRuleConstraint::new("PRLE-MIN10".to_string(), Decimal::from(10), Decimal::ZERO),
        );

        let result = split(&catalog, 5, SelectionMode::AnyDated, &rows, &constraints);

        // 切分記錄低於列下限：維持未綁定
        assert_eq!(result.result_rows.len(), 1);
        assert_eq!(result.result_rows[0].row_binding, RowBinding::New);
    }

    #[test]
    fn test_row_matching_order_is_preserved() {
        // 既定排序：(批次ID小寫, 數量) 降冪。此排序為既有行為，不可改動。
        let catalog = catalog(&[
            ("alpha", Some(date(2026, 9, 1)), 30),
            ("beta", Some(date(2026, 10, 1)), 30),
        ]);
        let rows = vec![
            DocumentRow::new("row-alpha".to_string(), Decimal::from(30))
                .with_batch_id("alpha".to_string()),
            DocumentRow::new("row-beta".to_string(), Decimal::from(30))
                .with_batch_id("beta".to_string()),
        ];

        let result = split(&catalog, 60, SelectionMode::AnyDated, &rows, &HashMap::new());

        // row-beta 排序在前（"beta" > "alpha" 降冪），但各列仍綁到各自批次
        assert_eq!(result.result_rows.len(), 2);
        assert_eq!(result.result_rows[0].batch_id, "alpha");
        assert_eq!(
            result.result_rows[0].row_binding,
            RowBinding::Existing("row-alpha".to_string())
        );
        assert_eq!(result.result_rows[1].batch_id, "beta");
        assert_eq!(
            result.result_rows[1].row_binding,
            RowBinding::Existing("row-beta".to_string())
        );
    }

    #[test]
    fn test_free_rows_reduce_paid_demand() {
        // 單據總量 60 中有 20 為免費列：付費切分僅處理 40
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 100)]);
        let rows = vec![
            DocumentRow::new("row-paid".to_string(), Decimal::from(40)),
            DocumentRow::new("row-free".to_string(), Decimal::from(20)).as_free_item(),
        ];

        let result = split(&catalog, 60, SelectionMode::AnyDated, &rows, &HashMap::new());

        let allocated: Decimal = result.result_rows.iter().map(|r| r.qty).sum();
        assert_eq!(allocated, Decimal::from(40));
        assert_eq!(result.remaining_qty, Decimal::ZERO);
    }

    #[test]
    fn test_negative_requested_qty_rejected() {
        let catalog = catalog(&[("B1", Some(date(2027, 6, 1)), 10)]);
        let constraints = HashMap::new();
        let input = SplitInput {
            requested_qty: Decimal::from(-1),
            selection_mode: SelectionMode::AnyDated,
            rows: &[],
            constraints: &constraints,
            enforce_constraints: false,
        };

        let result = QuantitySplitter::split(&catalog, &input, today(), alert_date());

        assert!(matches!(result, Err(AllocError::InvalidArgument(_))));
    }

    #[test]
    fn test_expired_and_empty_batches_excluded_from_pool() {
        let catalog = catalog(&[
            ("B-EMPTY", Some(date(2027, 1, 1)), 0),
            ("B-OK", Some(date(2027, 6, 1)), 25),
        ]);

        let result = split(&catalog, 40, SelectionMode::AnyDated, &[], &HashMap::new());

        assert_eq!(result.result_rows.len(), 1);
        assert_eq!(result.result_rows[0].batch_id, "B-OK");
        assert_eq!(result.remaining_qty, Decimal::from(15));
    }
}
