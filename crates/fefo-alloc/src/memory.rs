//! 記憶體內協作者實作（測試與展示用）

use std::collections::HashMap;

use fefo_core::{
    BatchMeta, BatchMetadataReader, FreeItemSpec, PriceLookup, PricingContext, PricingOutcome,
    PricingRuleEvaluator, StockLedgerReader,
};
use rust_decimal::Decimal;

/// 一筆帳面異動
#[derive(Debug, Clone)]
pub struct LedgerMovement {
    pub item_code: String,
    pub warehouse: String,
    pub batch_id: Option<String>,
    pub qty: Decimal,
    pub cancelled: bool,
}

/// 記憶體內庫存帳
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    movements: Vec<LedgerMovement>,
}

impl InMemoryStockLedger {
    /// 創建空的庫存帳
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入一筆異動
    pub fn with_movement(
        mut self,
        item_code: &str,
        warehouse: &str,
        batch_id: Option<&str>,
        qty: Decimal,
    ) -> Self {
        self.movements.push(LedgerMovement {
            item_code: item_code.to_string(),
            warehouse: warehouse.to_string(),
            batch_id: batch_id.map(str::to_string),
            qty,
            cancelled: false,
        });
        self
    }

    /// 建構器模式：加入一筆已取消的異動（不列入加總）
    pub fn with_cancelled_movement(
        mut self,
        item_code: &str,
        warehouse: &str,
        batch_id: Option<&str>,
        qty: Decimal,
    ) -> Self {
        self.movements.push(LedgerMovement {
            item_code: item_code.to_string(),
            warehouse: warehouse.to_string(),
            batch_id: batch_id.map(str::to_string),
            qty,
            cancelled: true,
        });
        self
    }
}

impl StockLedgerReader for InMemoryStockLedger {
    fn sum_signed_qty(&self, item_code: &str, warehouse: &str, batch_id: Option<&str>) -> Decimal {
        self.movements
            .iter()
            .filter(|m| !m.cancelled)
            .filter(|m| m.item_code == item_code && m.warehouse == warehouse)
            .filter(|m| match batch_id {
                Some(batch) => m.batch_id.as_deref() == Some(batch),
                None => true,
            })
            .map(|m| m.qty)
            .sum()
    }
}

/// 記憶體內批次主檔（批次主檔不分倉庫；倉庫僅影響帳面數量）
#[derive(Debug, Clone, Default)]
pub struct InMemoryBatchStore {
    entries: Vec<(String, BatchMeta)>,
}

impl InMemoryBatchStore {
    /// 創建空的批次主檔
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入批次（建立順序未設置時依加入順序編號）
    pub fn with_batch(mut self, item_code: &str, mut meta: BatchMeta) -> Self {
        if meta.creation_order == 0 {
            meta.creation_order = self.entries.len() as u64 + 1;
        }
        self.entries.push((item_code.to_string(), meta));
        self
    }
}

impl BatchMetadataReader for InMemoryBatchStore {
    fn list_batches(&self, item_code: &str, _warehouse: &str) -> Vec<BatchMeta> {
        self.entries
            .iter()
            .filter(|(item, _)| item == item_code)
            .map(|(_, meta)| meta.clone())
            .collect()
    }
}

/// 表驅動的價格規則定義
#[derive(Debug, Clone)]
pub struct PricingRuleDef {
    pub rule_id: String,
    pub item_code: String,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub free_item: Option<FreeItemSpec>,
    /// 每滿 N 送 M（免費數量隨付費數量縮放）
    pub free_per_paid: Option<(Decimal, Decimal)>,
}

impl PricingRuleDef {
    /// 創建新的規則定義
    pub fn new(rule_id: String, item_code: String) -> Self {
        Self {
            rule_id,
            item_code,
            min_qty: Decimal::ZERO,
            max_qty: Decimal::ZERO,
            free_item: None,
            free_per_paid: None,
        }
    }

    /// 建構器模式：設置數量界限（max 為 0 表示無上限）
    pub fn with_qty_bounds(mut self, min_qty: Decimal, max_qty: Decimal) -> Self {
        self.min_qty = min_qty;
        self.max_qty = max_qty;
        self
    }

    /// 建構器模式：設置固定免費品
    pub fn with_free_item(mut self, spec: FreeItemSpec) -> Self {
        self.free_item = Some(spec);
        self
    }

    /// 建構器模式：設置每滿 N 送 M 的免費品（同物料、單價 0）
    pub fn with_free_per_paid(mut self, per_qty: Decimal, free_qty: Decimal) -> Self {
        self.free_per_paid = Some((per_qty, free_qty));
        self
    }

    fn applies_to(&self, context: &PricingContext) -> bool {
        self.item_code == context.item_code
            && context.qty >= self.min_qty
            && (self.max_qty <= Decimal::ZERO || context.qty <= self.max_qty)
    }

    fn free_item_for(&self, context: &PricingContext) -> Option<FreeItemSpec> {
        if let Some((per_qty, free_qty)) = self.free_per_paid {
            if per_qty <= Decimal::ZERO {
                return None;
            }
            let multiples = (context.qty / per_qty).floor();
            if multiples <= Decimal::ZERO {
                return None;
            }
            return Some(FreeItemSpec {
                item_code: self.item_code.clone(),
                qty: multiples * free_qty,
                rate: Decimal::ZERO,
            });
        }
        self.free_item.clone()
    }
}

/// 表驅動的價格規則評估器
#[derive(Debug, Clone, Default)]
pub struct TableDrivenPricing {
    rules: Vec<PricingRuleDef>,
}

impl TableDrivenPricing {
    /// 創建空的評估器
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入規則
    pub fn with_rule(mut self, rule: PricingRuleDef) -> Self {
        self.rules.push(rule);
        self
    }
}

impl PricingRuleEvaluator for TableDrivenPricing {
    fn evaluate(&self, context: &PricingContext) -> Option<PricingOutcome> {
        if context.ignore_pricing_rules {
            return None;
        }

        let rule = self.rules.iter().find(|r| r.applies_to(context))?;
        let free_item = rule.free_item_for(context);

        Some(PricingOutcome {
            pricing_rule_ids: vec![rule.rule_id.clone()],
            min_qty: rule.min_qty,
            max_qty: rule.max_qty,
            is_product_discount: free_item.is_some(),
            free_item,
        })
    }
}

/// 固定匯率的價目表（以價目表 + 物料為鍵，忽略客戶）
#[derive(Debug, Clone, Default)]
pub struct FixedPriceList {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedPriceList {
    /// 創建空的價目表
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置單價
    pub fn with_rate(mut self, price_list: &str, item_code: &str, rate: Decimal) -> Self {
        self.rates
            .insert((price_list.to_string(), item_code.to_string()), rate);
        self
    }
}

impl PriceLookup for FixedPriceList {
    fn price_list_rate(
        &self,
        price_list: &str,
        item_code: &str,
        _customer: Option<&str>,
    ) -> Option<Decimal> {
        self.rates
            .get(&(price_list.to_string(), item_code.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fefo_core::DocumentKind;

    fn context(qty: i64) -> PricingContext {
        PricingContext {
            item_code: "ITEM-1".to_string(),
            qty: Decimal::from(qty),
            rate: None,
            price_list_rate: None,
            price_list: None,
            customer: None,
            customer_group: None,
            company: None,
            transaction_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            document_kind: DocumentKind::SalesInvoice,
            pricing_rule_ids: Vec::new(),
            ignore_pricing_rules: false,
        }
    }

    #[test]
    fn test_ledger_sum_by_batch_and_total() {
        let ledger = InMemoryStockLedger::new()
            .with_movement("ITEM-1", "WH-A", Some("B1"), Decimal::from(40))
            .with_movement("ITEM-1", "WH-A", Some("B2"), Decimal::from(10))
            .with_movement("ITEM-1", "WH-B", Some("B1"), Decimal::from(7));

        assert_eq!(
            ledger.sum_signed_qty("ITEM-1", "WH-A", Some("B1")),
            Decimal::from(40)
        );
        // 不指定批次：整倉加總
        assert_eq!(ledger.sum_signed_qty("ITEM-1", "WH-A", None), Decimal::from(50));
        assert_eq!(ledger.sum_signed_qty("ITEM-1", "WH-B", None), Decimal::from(7));
    }

    #[test]
    fn test_rule_qty_window() {
        let pricing = TableDrivenPricing::new().with_rule(
            PricingRuleDef::new("PRLE-1".to_string(), "ITEM-1".to_string())
                .with_qty_bounds(Decimal::from(10), Decimal::from(100)),
        );

        assert!(pricing.evaluate(&context(5)).is_none());
        assert!(pricing.evaluate(&context(10)).is_some());
        assert!(pricing.evaluate(&context(100)).is_some());
        assert!(pricing.evaluate(&context(101)).is_none());
    }

    #[test]
    fn test_free_per_paid_scales() {
        let pricing = TableDrivenPricing::new().with_rule(
            PricingRuleDef::new("PRLE-1".to_string(), "ITEM-1".to_string())
                .with_free_per_paid(Decimal::from(10), Decimal::ONE),
        );

        let outcome = pricing.evaluate(&context(35)).unwrap();
        // 35 / 10 = 3 組
        assert_eq!(outcome.free_item.unwrap().qty, Decimal::from(3));
        assert!(outcome.is_product_discount);
    }

    #[test]
    fn test_ignore_pricing_rules_short_circuits() {
        let pricing = TableDrivenPricing::new().with_rule(PricingRuleDef::new(
            "PRLE-1".to_string(),
            "ITEM-1".to_string(),
        ));

        let mut ctx = context(10);
        ctx.ignore_pricing_rules = true;
        assert!(pricing.evaluate(&ctx).is_none());
    }

    #[test]
    fn test_fixed_price_list() {
        let prices =
            FixedPriceList::new().with_rate("NZ Wholesale", "ITEM-1", Decimal::new(2065, 2));

        assert_eq!(
            prices.price_list_rate("NZ Wholesale", "ITEM-1", None),
            Some(Decimal::new(2065, 2))
        );
        assert_eq!(prices.price_list_rate("AU Retail", "ITEM-1", None), None);
    }
}
