//! 批次目錄查詢

use chrono::NaiveDate;
use fefo_core::{
    AllocError, BatchCandidate, BatchMetadataReader, Result, StockLedgerReader,
};
use rust_decimal::Decimal;

/// 批次目錄：某物料/倉庫組合下依 FEFO 排序的候選批次清單
///
/// 目錄保留庫存為零或負數的批次（呼叫端使用前必須以 `eligible` 過濾，
/// 不可假設目錄已做預過濾）。
#[derive(Debug, Clone)]
pub struct BatchCatalog {
    candidates: Vec<BatchCandidate>,
}

impl BatchCatalog {
    /// 讀取批次目錄：排除停用與已過期批次，依帳面異動加總現有庫存，
    /// 依（效期升冪、無效期排最後、建立順序升冪）排序
    pub fn load(
        batches: &dyn BatchMetadataReader,
        ledger: &dyn StockLedgerReader,
        item_code: &str,
        warehouse: &str,
        today: NaiveDate,
    ) -> Self {
        let mut candidates: Vec<BatchCandidate> = batches
            .list_batches(item_code, warehouse)
            .into_iter()
            .filter(|meta| !meta.disabled)
            .filter(|meta| meta.expiry_date.map_or(true, |expiry| expiry >= today))
            .map(|meta| {
                let on_hand =
                    ledger.sum_signed_qty(item_code, warehouse, Some(&meta.batch_id));
                let mut candidate = BatchCandidate::new(
                    meta.batch_id,
                    item_code.to_string(),
                    warehouse.to_string(),
                    on_hand,
                )
                .with_creation_order(meta.creation_order);
                candidate.expiry_date = meta.expiry_date;
                candidate
            })
            .collect();

        candidates.sort_by_key(|c| (c.expiry_date.is_none(), c.expiry_date, c.creation_order));

        Self { candidates }
    }

    /// 讀取批次目錄並限制在序號對應的批次
    ///
    /// 序號到批次的解析由外部協作者完成；此處接收解析出的批次ID。
    /// 對應到多個不同批次時拒絕（`AmbiguousSerialBatchLink`）。
    pub fn load_for_serials(
        batches: &dyn BatchMetadataReader,
        ledger: &dyn StockLedgerReader,
        item_code: &str,
        warehouse: &str,
        today: NaiveDate,
        serial_batch_ids: &[String],
    ) -> Result<Self> {
        if serial_batch_ids.is_empty() {
            return Ok(Self::load(batches, ledger, item_code, warehouse, today));
        }

        let mut distinct: Vec<String> = Vec::new();
        for batch_id in serial_batch_ids {
            if !distinct.contains(batch_id) {
                distinct.push(batch_id.clone());
            }
        }

        if distinct.len() > 1 {
            return Err(AllocError::AmbiguousSerialBatchLink {
                serial_count: serial_batch_ids.len(),
                batch_ids: distinct,
            });
        }

        let mut catalog = Self::load(batches, ledger, item_code, warehouse, today);
        catalog
            .candidates
            .retain(|c| c.batch_id == distinct[0]);

        if catalog.candidates.is_empty() {
            return Err(AllocError::NoEligibleBatch(format!(
                "序號對應的批次 {} 不在物料 {} 的目錄中",
                distinct[0], item_code
            )));
        }

        Ok(catalog)
    }

    /// 全部候選批次（含零/負庫存）
    pub fn candidates(&self) -> &[BatchCandidate] {
        &self.candidates
    }

    /// 有正庫存的候選批次
    pub fn eligible(&self) -> impl Iterator<Item = &BatchCandidate> {
        self.candidates.iter().filter(|c| c.has_stock())
    }

    /// 候選批次數量
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// 檢查目錄是否為空
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// 單一批次的現有庫存點查詢
    pub fn on_hand(
        ledger: &dyn StockLedgerReader,
        item_code: &str,
        warehouse: &str,
        batch_id: &str,
    ) -> Decimal {
        ledger.sum_signed_qty(item_code, warehouse, Some(batch_id))
    }
}
