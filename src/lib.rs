//! # FEFO
//!
//! 效期批次分配引擎：FEFO 挑批、多列數量切分與免費品對帳

// Re-export 主要類型
pub use fefo_alloc::{
    AllocWarning, AllocationInput, AllocationOutcome, AssignableLine, BatchAllocator,
    BatchCatalog, FefoSelector, QuantitySplitter, RowAssignment, WarningSeverity,
};
pub use fefo_core::{
    AllocError, AllocationRequest, AllocationResultRow, BackorderLine, BatchCandidate,
    BatchMeta, BatchSummary, DocumentKind, DocumentRow, ExpiryStatus, FreeItemSpec,
    ItemBatchSettings, PricingRuleConstraint, QtyBounds, Result, RowBinding, SelectionMode,
    SelectionOutcome,
};

/// 記憶體內協作者實作（測試與展示用）
pub mod memory {
    pub use fefo_alloc::memory::{
        FixedPriceList, InMemoryBatchStore, InMemoryStockLedger, PricingRuleDef,
        TableDrivenPricing,
    };
}
