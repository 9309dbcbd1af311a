//! 價格規則數量界限模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 價格規則的數量約束（max_qty 為 0 表示無上限）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRuleConstraint {
    /// 規則ID
    pub rule_id: String,

    /// 最小適用數量
    pub min_qty: Decimal,

    /// 最大適用數量（0 表示無上限）
    pub max_qty: Decimal,
}

impl PricingRuleConstraint {
    /// 創建新的數量約束
    pub fn new(rule_id: String, min_qty: Decimal, max_qty: Decimal) -> Self {
        Self {
            rule_id,
            min_qty,
            max_qty,
        }
    }

    /// 檢查上限是否為無界
    pub fn is_unbounded_max(&self) -> bool {
        self.max_qty <= Decimal::ZERO
    }
}

/// 單列的有效數量區間（多條規則取最緊界限）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QtyBounds {
    /// 有效下限
    pub min_qty: Decimal,

    /// 有效上限（None 表示無上限）
    pub max_qty: Option<Decimal>,
}

impl QtyBounds {
    /// 無界區間
    pub fn unbounded() -> Self {
        Self {
            min_qty: Decimal::ZERO,
            max_qty: None,
        }
    }

    /// 合併多條規則：下限取最大值，上限取最小值（0 視為無上限）
    pub fn effective<'a>(constraints: impl IntoIterator<Item = &'a PricingRuleConstraint>) -> Self {
        let mut bounds = Self::unbounded();

        for constraint in constraints {
            if constraint.min_qty > bounds.min_qty {
                bounds.min_qty = constraint.min_qty;
            }
            if !constraint.is_unbounded_max() {
                bounds.max_qty = match bounds.max_qty {
                    Some(current) => Some(current.min(constraint.max_qty)),
                    None => Some(constraint.max_qty),
                };
            }
        }

        bounds
    }

    /// 檢查數量是否落在區間內
    pub fn contains(&self, qty: Decimal) -> bool {
        qty >= self.min_qty && self.max_qty.map_or(true, |max| qty <= max)
    }

    /// 檢查數量是否超過上限
    pub fn exceeds_max(&self, qty: Decimal) -> bool {
        self.max_qty.map_or(false, |max| qty > max)
    }
}
