//! 分配請求模型

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AllocError, Result};

/// 批次篩選模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// 不限效期
    AnyDated,
    /// 僅長效期批次
    LongdatedOnly,
    /// 僅短效期批次
    ShortdatedOnly,
}

impl SelectionMode {
    /// 檢查短效期分類是否通過此篩選
    pub fn accepts(&self, shortdated: bool) -> bool {
        match self {
            SelectionMode::AnyDated => true,
            SelectionMode::LongdatedOnly => !shortdated,
            SelectionMode::ShortdatedOnly => shortdated,
        }
    }
}

/// 單列批次挑選請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// 物料ID
    pub item_code: String,

    /// 倉庫
    pub warehouse: String,

    /// 需求數量
    pub requested_qty: Decimal,

    /// 批次篩選模式
    pub selection_mode: SelectionMode,

    /// 短效期警示門檻（月），依物料設定
    pub shortdated_threshold_months: u32,

    /// 既有選定批次（重新驗證時若仍有足量則沿用）
    pub pinned_batch_id: Option<String>,

    /// 是否要求硬性失敗（無法自動選批時回傳錯誤而非建議）
    pub hard_fail: bool,
}

impl AllocationRequest {
    /// 創建新的挑選請求
    pub fn new(item_code: String, warehouse: String, requested_qty: Decimal) -> Self {
        Self {
            item_code,
            warehouse,
            requested_qty,
            selection_mode: SelectionMode::AnyDated,
            shortdated_threshold_months: 6,
            pinned_batch_id: None,
            hard_fail: false,
        }
    }

    /// 建構器模式：設置篩選模式
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// 建構器模式：設置短效期門檻（月）
    pub fn with_shortdated_threshold_months(mut self, months: u32) -> Self {
        self.shortdated_threshold_months = months;
        self
    }

    /// 建構器模式：設置既有選定批次
    pub fn with_pinned_batch_id(mut self, batch_id: String) -> Self {
        self.pinned_batch_id = Some(batch_id);
        self
    }

    /// 建構器模式：設置硬性失敗
    pub fn with_hard_fail(mut self, hard_fail: bool) -> Self {
        self.hard_fail = hard_fail;
        self
    }

    /// 計算短效期警示日（今日 + 門檻月數）
    pub fn alert_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_months(Months::new(self.shortdated_threshold_months))
            .expect("日期溢出")
    }

    /// 驗證挑選請求的呼叫契約（非正數量屬呼叫端錯誤）
    pub fn validate_for_selection(&self) -> Result<()> {
        if self.requested_qty <= Decimal::ZERO {
            return Err(AllocError::InvalidArgument(format!(
                "需求數量必須為正數: {}",
                self.requested_qty
            )));
        }
        Ok(())
    }
}
