//! 物料批次參數配置

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// 物料批次管理參數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBatchSettings {
    /// 物料ID
    pub item_code: String,

    /// 是否啟用批次管理（未啟用的物料不做批次指派）
    pub batch_tracking_enabled: bool,

    /// 短效期警示門檻（月）
    pub shortdated_threshold_months: u32,
}

impl ItemBatchSettings {
    /// 創建新的批次參數（預設啟用批次管理，門檻 6 個月）
    pub fn new(item_code: String) -> Self {
        Self {
            item_code,
            batch_tracking_enabled: true,
            shortdated_threshold_months: 6,
        }
    }

    /// 建構器模式：設置是否啟用批次管理
    pub fn with_batch_tracking(mut self, enabled: bool) -> Self {
        self.batch_tracking_enabled = enabled;
        self
    }

    /// 建構器模式：設置短效期門檻（月）
    pub fn with_shortdated_threshold_months(mut self, months: u32) -> Self {
        self.shortdated_threshold_months = months;
        self
    }

    /// 計算短效期警示日（今日 + 門檻月數）
    pub fn alert_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_months(Months::new(self.shortdated_threshold_months))
            .expect("日期溢出")
    }
}
