//! 免費品對帳

use fefo_core::{
    AllocationResultRow, BackorderLine, DocumentRow, PricingContext, PricingRuleEvaluator,
    RowBinding,
};
use rust_decimal::Decimal;

use crate::splitter::BatchPool;

/// 以規則集合為鍵合併後的免費品需求
#[derive(Debug, Clone)]
struct FreeItemDemand {
    pricing_rule_ids: Vec<String>,
    qty: Decimal,
    rate: Decimal,
    binding: RowBinding,
    discount_percentage: Option<Decimal>,
}

/// 對帳輸出：免費品結果列、欠交列、與未滿足的免費數量
#[derive(Debug)]
pub struct ReconcileResult {
    pub free_rows: Vec<AllocationResultRow>,
    pub backorders: Vec<BackorderLine>,
    pub unsatisfied_qty: Decimal,
}

/// 免費品對帳器
///
/// 將每筆已分配的付費列回饋給價格規則評估器，取得免費品需求後
/// 對（已被付費分配扣減的）同一容量池重跑切分；切不進去的餘量
/// 成為欠交列而非結果列。
pub struct FreeItemReconciler;

impl FreeItemReconciler {
    pub fn reconcile(
        item_code: &str,
        paid_rows: &[AllocationResultRow],
        free_rows: &[&DocumentRow],
        pool: &mut BatchPool,
        evaluator: &dyn PricingRuleEvaluator,
        base_context: &PricingContext,
    ) -> ReconcileResult {
        let demands = Self::collect_demands(item_code, paid_rows, free_rows, evaluator, base_context);

        let mut result = ReconcileResult {
            free_rows: Vec::new(),
            backorders: Vec::new(),
            unsatisfied_qty: Decimal::ZERO,
        };

        for demand in demands {
            let (carved, rest) = pool.carve(demand.qty);

            for (pool_index, qty) in carved {
                let entry = &pool.entries()[pool_index];
                let mut row = AllocationResultRow::new(
                    demand.binding.clone(),
                    entry.batch_id().to_string(),
                    qty,
                    entry.original_qty(),
                    entry.shortdated(),
                )
                .as_free_item()
                .with_rate(demand.rate)
                .with_pricing_rule_ids(demand.pricing_rule_ids.clone());
                if let Some(discount) = demand.discount_percentage {
                    row = row.with_discount_percentage(discount);
                }
                result.free_rows.push(row);
            }

            if rest > Decimal::ZERO {
                result.backorders.push(BackorderLine::new(
                    rest,
                    Some(demand.rate),
                    demand.pricing_rule_ids.clone(),
                ));
                result.unsatisfied_qty += rest;
            }
        }

        result
    }

    /// 逐付費列評估價格規則，依規則集合合併免費品需求
    ///
    /// 同一規則的多次評估取較大的需求數量（後見的較大值取代較小值，
    /// 不重複累加）。命中既有免費列時沿用該列身份，否則視為新列並
    /// 以價目表單價推導折扣百分比。
    fn collect_demands(
        item_code: &str,
        paid_rows: &[AllocationResultRow],
        free_rows: &[&DocumentRow],
        evaluator: &dyn PricingRuleEvaluator,
        base_context: &PricingContext,
    ) -> Vec<FreeItemDemand> {
        let mut demands: Vec<FreeItemDemand> = Vec::new();

        for paid in paid_rows {
            let mut context = base_context.clone();
            context.qty = paid.qty;
            context.rate = paid.rate.or(base_context.price_list_rate);
            context.pricing_rule_ids = paid.pricing_rule_ids.clone();

            let Some(outcome) = evaluator.evaluate(&context) else {
                continue;
            };
            if !outcome.is_product_discount {
                continue;
            }
            let Some(free_spec) = outcome.free_item else {
                continue;
            };
            if free_spec.item_code != item_code {
                continue;
            }

            if let Some(existing) = demands
                .iter_mut()
                .find(|d| d.pricing_rule_ids == outcome.pricing_rule_ids)
            {
                existing.qty = existing.qty.max(free_spec.qty);
                existing.rate = free_spec.rate;
                continue;
            }

            let matched_row = free_rows
                .iter()
                .find(|r| r.pricing_rule_ids == outcome.pricing_rule_ids);

            let (binding, discount_percentage) = match matched_row {
                Some(row) => (RowBinding::Existing(row.row_id.clone()), None),
                None => {
                    let discount = base_context.price_list_rate.and_then(|list_rate| {
                        if list_rate > Decimal::ZERO {
                            Some(
                                (list_rate - free_spec.rate) / list_rate * Decimal::from(100),
                            )
                        } else {
                            Some(Decimal::ZERO)
                        }
                    });
                    (RowBinding::New, discount)
                }
            };

            demands.push(FreeItemDemand {
                pricing_rule_ids: outcome.pricing_rule_ids,
                qty: free_spec.qty,
                rate: free_spec.rate,
                binding,
                discount_percentage,
            });
        }

        demands
    }
}
