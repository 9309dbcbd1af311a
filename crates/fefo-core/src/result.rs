//! 分配結果模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 結果列對應的單據列身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowBinding {
    /// 綁定到既有單據列
    Existing(String),
    /// 需要新增單據列
    New,
}

impl RowBinding {
    /// 檢查是否為新列
    pub fn is_new(&self) -> bool {
        matches!(self, RowBinding::New)
    }

    /// 取得綁定的既有列ID
    pub fn row_id(&self) -> Option<&str> {
        match self {
            RowBinding::Existing(row_id) => Some(row_id),
            RowBinding::New => None,
        }
    }
}

/// 分配結果列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResultRow {
    /// 單據列身份（既有列或新列）
    pub row_binding: RowBinding,

    /// 批次ID
    pub batch_id: String,

    /// 分配數量
    pub qty: Decimal,

    /// 批次分配前的現有庫存（供顯示用的快照）
    pub available_qty_at_batch: Decimal,

    /// 是否為短效期批次
    pub shortdated: bool,

    /// 是否為免費品列
    pub is_free_item: bool,

    /// 單價（免費品列由價格規則給定）
    pub rate: Option<Decimal>,

    /// 來源價格規則ID
    pub pricing_rule_ids: Vec<String>,

    /// 折扣百分比（免費品顯示用）
    pub discount_percentage: Option<Decimal>,
}

impl AllocationResultRow {
    /// 創建新的結果列
    pub fn new(
        row_binding: RowBinding,
        batch_id: String,
        qty: Decimal,
        available_qty_at_batch: Decimal,
        shortdated: bool,
    ) -> Self {
        Self {
            row_binding,
            batch_id,
            qty,
            available_qty_at_batch,
            shortdated,
            is_free_item: false,
            rate: None,
            pricing_rule_ids: Vec::new(),
            discount_percentage: None,
        }
    }

    /// 建構器模式：標記為免費品列
    pub fn as_free_item(mut self) -> Self {
        self.is_free_item = true;
        self
    }

    /// 建構器模式：設置單價
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    /// 建構器模式：設置來源價格規則
    pub fn with_pricing_rule_ids(mut self, rule_ids: Vec<String>) -> Self {
        self.pricing_rule_ids = rule_ids;
        self
    }

    /// 建構器模式：設置折扣百分比
    pub fn with_discount_percentage(mut self, discount: Decimal) -> Self {
        self.discount_percentage = Some(discount);
        self
    }
}

/// 欠交列（免費品需求無法由任何批次滿足的部分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackorderLine {
    /// 欠交列ID
    pub id: Uuid,

    /// 欠交數量
    pub qty: Decimal,

    /// 單價
    pub rate: Option<Decimal>,

    /// 來源價格規則ID
    pub pricing_rule_ids: Vec<String>,
}

impl BackorderLine {
    /// 創建新的欠交列
    pub fn new(qty: Decimal, rate: Option<Decimal>, pricing_rule_ids: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            qty,
            rate,
            pricing_rule_ids,
        }
    }
}

/// 可呈現的候選批次摘要（手動選批表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// 批次ID
    pub batch_id: String,

    /// 現有庫存
    pub on_hand_qty: Decimal,

    /// 效期
    pub expiry_date: Option<NaiveDate>,

    /// 是否為短效期批次
    pub shortdated: bool,
}

/// 選定批次的效期分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryStatus {
    /// 無警示
    Clean,
    /// 選定批次為短效期
    Shortdated,
    /// 選定長效期批次，但仍有短效期批次可用
    LongdatedWithShortdatedAvailable,
}

/// 批次挑選結果（具名結果，不經由旁路欄位推斷）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectionOutcome {
    /// 已選定批次
    Selected {
        batch_id: String,
        on_hand_qty: Decimal,
        expiry_date: Option<NaiveDate>,
        status: ExpiryStatus,
    },
    /// 所有候選批次皆無庫存，無可建議
    NothingToSuggest,
    /// 無單一批次可滿足需求，附上可呈現的候選表
    ManualSelectionRequired { candidates: Vec<BatchSummary> },
}

impl SelectionOutcome {
    /// 取得選定的批次ID
    pub fn selected_batch_id(&self) -> Option<&str> {
        match self {
            SelectionOutcome::Selected { batch_id, .. } => Some(batch_id),
            _ => None,
        }
    }

    /// 取得效期分類
    pub fn status(&self) -> Option<ExpiryStatus> {
        match self {
            SelectionOutcome::Selected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
