//! # FEFO Core
//!
//! 批次分配核心資料模型與類型定義

pub mod batch;
pub mod document;
pub mod interfaces;
pub mod pricing;
pub mod request;
pub mod result;
pub mod settings;

// Re-export 主要類型
pub use batch::BatchCandidate;
pub use document::{DocumentKind, DocumentRow};
pub use interfaces::{
    BatchMeta, BatchMetadataReader, FreeItemSpec, PriceLookup, PricingContext, PricingOutcome,
    PricingRuleEvaluator, StockLedgerReader,
};
pub use pricing::{PricingRuleConstraint, QtyBounds};
pub use request::{AllocationRequest, SelectionMode};
pub use result::{
    AllocationResultRow, BackorderLine, BatchSummary, ExpiryStatus, RowBinding, SelectionOutcome,
};
pub use settings::ItemBatchSettings;

/// 批次分配錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("無效的參數: {0}")]
    InvalidArgument(String),

    #[error("物料 {0} 沒有可用批次")]
    NoEligibleBatch(String),

    #[error("物料 {item_code} 需求 {requested_qty} 無單一批次可滿足，請手動選擇批次（候選 {} 筆）", .candidates.len())]
    ManualSelectionRequired {
        item_code: String,
        requested_qty: rust_decimal::Decimal,
        candidates: Vec<result::BatchSummary>,
    },

    #[error("序號對應到多個批次: {batch_ids:?}（序號 {serial_count} 筆）")]
    AmbiguousSerialBatchLink {
        serial_count: usize,
        batch_ids: Vec<String>,
    },

    #[error("批次 {batch_id} 庫存不足: 需要 {requested}, 可用 {available}")]
    InsufficientBatchQty {
        batch_id: String,
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },
}

pub type Result<T> = std::result::Result<T, AllocError>;
