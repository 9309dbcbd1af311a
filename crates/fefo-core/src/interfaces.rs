//! 外部協作者介面
//!
//! 分配核心以唯讀快照運作：帳面數量、批次主檔、價格規則評估與價目表
//! 查詢都是外部系統提供的純函式呼叫，核心不做任何持久化或交易控制。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::DocumentKind;

/// 批次主檔資料（由外部批次主檔讀取器提供）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMeta {
    /// 批次ID
    pub batch_id: String,

    /// 效期（None 表示永不過期）
    pub expiry_date: Option<NaiveDate>,

    /// 是否停用
    pub disabled: bool,

    /// 建立順序
    pub creation_order: u64,
}

impl BatchMeta {
    /// 創建新的批次主檔資料
    pub fn new(batch_id: String) -> Self {
        Self {
            batch_id,
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
}

/// 庫存帳讀取器：帳面異動的帶號加總（實作端需排除已取消的異動）
pub trait StockLedgerReader {
    /// 加總指定物料/倉庫（可選批次）的帳面異動
    fn sum_signed_qty(&self, item_code: &str, warehouse: &str, batch_id: Option<&str>) -> Decimal;
}

/// 批次主檔讀取器
pub trait BatchMetadataReader {
    /// 列出指定物料/倉庫的批次主檔
    fn list_batches(&self, item_code: &str, warehouse: &str) -> Vec<BatchMeta>;
}

/// 價格規則評估的輸入脈絡（對應一筆已分配的付費列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingContext {
    /// 物料ID
    pub item_code: String,

    /// 付費列數量
    pub qty: Decimal,

    /// 列單價
    pub rate: Option<Decimal>,

    /// 價目表單價
    pub price_list_rate: Option<Decimal>,

    /// 價目表
    pub price_list: Option<String>,

    /// 客戶
    pub customer: Option<String>,

    /// 客戶群組
    pub customer_group: Option<String>,

    /// 公司
    pub company: Option<String>,

    /// 交易日期
    pub transaction_date: NaiveDate,

    /// 單據類型
    pub document_kind: DocumentKind,

    /// 列上已附加的價格規則ID
    pub pricing_rule_ids: Vec<String>,

    /// 是否忽略價格規則
    pub ignore_pricing_rules: bool,
}

/// 免費品規格（產品折扣型規則的給贈內容）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeItemSpec {
    /// 免費品物料ID
    pub item_code: String,

    /// 免費數量
    pub qty: Decimal,

    /// 免費品單價
    pub rate: Decimal,
}

/// 價格規則評估結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOutcome {
    /// 命中的規則ID
    pub pricing_rule_ids: Vec<String>,

    /// 最小適用數量
    pub min_qty: Decimal,

    /// 最大適用數量（0 表示無上限）
    pub max_qty: Decimal,

    /// 是否為產品折扣型規則（帶免費品）
    pub is_product_discount: bool,

    /// 免費品規格
    pub free_item: Option<FreeItemSpec>,
}

/// 價格規則評估器：不透明的商業規則引擎，核心視為黑盒
pub trait PricingRuleEvaluator {
    /// 評估一筆付費列；None 表示沒有規則命中
    fn evaluate(&self, context: &PricingContext) -> Option<PricingOutcome>;
}

/// 價目表查詢：僅用於計算免費品的折扣百分比顯示，不參與分配決策
pub trait PriceLookup {
    /// 查詢價目表單價
    fn price_list_rate(
        &self,
        price_list: &str,
        item_code: &str,
        customer: Option<&str>,
    ) -> Option<Decimal>;
}
