//! 批次候選模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 批次候選（某物料/倉庫組合下可動用的實體批次）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCandidate {
    /// 批次ID
    pub batch_id: String,

    /// 物料ID
    pub item_code: String,

    /// 倉庫
    pub warehouse: String,

    /// 現有庫存（帳面異動的帶號加總，每次分配呼叫重新計算，不做長期快取）
    pub on_hand_qty: Decimal,

    /// 效期（None 表示永不過期）
    pub expiry_date: Option<NaiveDate>,

    /// 是否停用（停用批次永不參與分配）
    pub disabled: bool,

    /// 建立順序（同效期批次的排序依據）
    pub creation_order: u64,
}

impl BatchCandidate {
    /// 創建新的批次候選
    pub fn new(batch_id: String, item_code: String, warehouse: String, on_hand_qty: Decimal) -> Self {
        Self {
            batch_id,
            item_code,
            warehouse,
            on_hand_qty,
            expiry_date: None,
            disabled: false,
            creation_order: 0,
        }
    }

    /// 建構器模式：設置效期
    pub fn with_expiry_date(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// 建構器模式：設置停用
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// 建構器模式：設置建立順序
    pub fn with_creation_order(mut self, creation_order: u64) -> Self {
        self.creation_order = creation_order;
        self
    }

    /// 檢查是否有正庫存
    pub fn has_stock(&self) -> bool {
        self.on_hand_qty > Decimal::ZERO
    }

    /// 檢查是否已過期（無效期的批次永不過期）
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry < today,
            None => false,
        }
    }

    /// 檢查是否為短效期批次（效期落在警示日之前；無效期的批次視為長效期）
    pub fn is_shortdated(&self, alert_date: NaiveDate) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry < alert_date,
            None => false,
        }
    }
}
