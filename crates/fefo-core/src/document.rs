//! 單據列模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單據類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// 銷售發票
    SalesInvoice,
    /// 採購發票
    PurchaseInvoice,
    /// 出貨單
    DeliveryNote,
    /// 庫存異動單
    StockEntry,
}

impl DocumentKind {
    /// 檢查此單據類型是否帶有價格規則（免費品對帳僅對這類單據執行）
    pub fn carries_pricing_rules(&self) -> bool {
        matches!(self, DocumentKind::SalesInvoice | DocumentKind::PurchaseInvoice)
    }
}

/// 目標單據中既有的同物料列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRow {
    /// 列ID
    pub row_id: String,

    /// 列數量
    pub qty: Decimal,

    /// 已選定批次（可為空）
    pub batch_id: Option<String>,

    /// 附加的價格規則ID（保序、去重）
    pub pricing_rule_ids: Vec<String>,

    /// 是否為免費品列（不計入付費數量，於對帳階段重新進入）
    pub is_free_item: bool,

    /// 是否忽略價格規則
    pub ignore_pricing_rules: bool,

    /// 列單價
    pub rate: Option<Decimal>,
}

impl DocumentRow {
    /// 創建新的單據列
    pub fn new(row_id: String, qty: Decimal) -> Self {
        Self {
            row_id,
            qty,
            batch_id: None,
            pricing_rule_ids: Vec::new(),
            is_free_item: false,
            ignore_pricing_rules: false,
            rate: None,
        }
    }

    /// 建構器模式：設置批次
    pub fn with_batch_id(mut self, batch_id: String) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// 建構器模式：設置價格規則
    pub fn with_pricing_rule_ids(mut self, rule_ids: Vec<String>) -> Self {
        self.pricing_rule_ids = dedup_preserving_order(rule_ids);
        self
    }

    /// 建構器模式：標記為免費品列
    pub fn as_free_item(mut self) -> Self {
        self.is_free_item = true;
        self
    }

    /// 建構器模式：設置忽略價格規則
    pub fn with_ignore_pricing_rules(mut self, ignore: bool) -> Self {
        self.ignore_pricing_rules = ignore;
        self
    }

    /// 建構器模式：設置單價
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    /// 檢查此列是否參與價格規則界限計算
    pub fn has_constraints(&self) -> bool {
        !self.ignore_pricing_rules && !self.pricing_rule_ids.is_empty()
    }
}

/// 解析單據存放的價格規則欄位（JSON 陣列字串；非 JSON 時視為單一規則ID）
pub fn pricing_rules_from_json(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<String>>(trimmed) {
        Ok(list) => dedup_preserving_order(list),
        Err(_) => vec![trimmed.to_string()],
    }
}

fn dedup_preserving_order(rule_ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rule_ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
