//! 批次分配主計算器

use std::collections::HashMap;

use chrono::NaiveDate;
use fefo_core::{
    AllocError, AllocationRequest, BatchMetadataReader, DocumentKind, DocumentRow, ExpiryStatus,
    ItemBatchSettings, PriceLookup, PricingContext, PricingRuleConstraint, PricingRuleEvaluator,
    Result, SelectionMode, SelectionOutcome, StockLedgerReader,
};
use rust_decimal::Decimal;

use crate::catalog::BatchCatalog;
use crate::free_item::FreeItemReconciler;
use crate::selector::FefoSelector;
use crate::splitter::{QuantitySplitter, SplitInput};
use crate::{AllocWarning, AllocationOutcome};

/// 整張單據的分配輸入
#[derive(Debug, Clone)]
pub struct AllocationInput {
    /// 物料ID
    pub item_code: String,

    /// 倉庫
    pub warehouse: String,

    /// 需求數量（涵蓋整張單據）
    pub requested_qty: Decimal,

    /// 批次篩選模式
    pub selection_mode: SelectionMode,

    /// 單據類型
    pub document_kind: DocumentKind,

    /// 單據中既有的同物料列
    pub rows: Vec<DocumentRow>,

    /// 價格規則約束（以規則ID索引）
    pub constraints: HashMap<String, PricingRuleConstraint>,

    /// 價目表
    pub price_list: Option<String>,

    /// 客戶
    pub customer: Option<String>,

    /// 客戶群組
    pub customer_group: Option<String>,

    /// 公司
    pub company: Option<String>,
}

impl AllocationInput {
    /// 創建新的分配輸入
    pub fn new(item_code: String, warehouse: String, requested_qty: Decimal) -> Self {
        Self {
            item_code,
            warehouse,
            requested_qty,
            selection_mode: SelectionMode::AnyDated,
            document_kind: DocumentKind::SalesInvoice,
            rows: Vec::new(),
            constraints: HashMap::new(),
            price_list: None,
            customer: None,
            customer_group: None,
            company: None,
        }
    }

    /// 建構器模式：設置篩選模式
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// 建構器模式：設置單據類型
    pub fn with_document_kind(mut self, kind: DocumentKind) -> Self {
        self.document_kind = kind;
        self
    }

    /// 建構器模式：設置既有單據列
    pub fn with_rows(mut self, rows: Vec<DocumentRow>) -> Self {
        self.rows = rows;
        self
    }

    /// 建構器模式：加入價格規則約束
    pub fn with_constraint(mut self, constraint: PricingRuleConstraint) -> Self {
        self.constraints
            .insert(constraint.rule_id.clone(), constraint);
        self
    }

    /// 建構器模式：設置價目表
    pub fn with_price_list(mut self, price_list: String) -> Self {
        self.price_list = Some(price_list);
        self
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, customer: String) -> Self {
        self.customer = Some(customer);
        self
    }
}

/// 批次自動指派的單據列（跨物料）
#[derive(Debug, Clone)]
pub struct AssignableLine {
    /// 列ID
    pub row_id: String,

    /// 物料ID
    pub item_code: String,

    /// 倉庫
    pub warehouse: String,

    /// 列數量
    pub qty: Decimal,

    /// 既有批次
    pub batch_id: Option<String>,
}

impl AssignableLine {
    /// 創建新的待指派列
    pub fn new(row_id: String, item_code: String, warehouse: String, qty: Decimal) -> Self {
        Self {
            row_id,
            item_code,
            warehouse,
            qty,
            batch_id: None,
        }
    }

    /// 建構器模式：設置既有批次
    pub fn with_batch_id(mut self, batch_id: String) -> Self {
        self.batch_id = Some(batch_id);
        self
    }
}

/// 批次自動指派的單列結果
#[derive(Debug, Clone)]
pub struct RowAssignment {
    /// 列ID
    pub row_id: String,

    /// 指派的批次（無可自動指派時為 None）
    pub batch_id: Option<String>,

    /// 效期分類（僅自動挑選時有值）
    pub status: Option<ExpiryStatus>,
}

/// 批次分配計算器
pub struct BatchAllocator<'a> {
    /// 庫存帳讀取器
    ledger: &'a dyn StockLedgerReader,

    /// 批次主檔讀取器
    batches: &'a dyn BatchMetadataReader,

    /// 價格規則評估器（免費品對帳用）
    pricing: Option<&'a dyn PricingRuleEvaluator>,

    /// 價目表查詢（折扣百分比顯示用）
    prices: Option<&'a dyn PriceLookup>,

    /// 物料批次參數
    settings: HashMap<String, ItemBatchSettings>,

    /// 過帳日（快照基準日）
    today: NaiveDate,
}

impl<'a> BatchAllocator<'a> {
    /// 創建新的分配計算器
    pub fn new(
        ledger: &'a dyn StockLedgerReader,
        batches: &'a dyn BatchMetadataReader,
        today: NaiveDate,
    ) -> Self {
        Self {
            ledger,
            batches,
            pricing: None,
            prices: None,
            settings: HashMap::new(),
            today,
        }
    }

    /// 建構器模式：設置價格規則評估器
    pub fn with_pricing(mut self, pricing: &'a dyn PricingRuleEvaluator) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// 建構器模式：設置價目表查詢
    pub fn with_price_lookup(mut self, prices: &'a dyn PriceLookup) -> Self {
        self.prices = Some(prices);
        self
    }

    /// 建構器模式：加入物料批次參數
    pub fn with_item_settings(mut self, settings: ItemBatchSettings) -> Self {
        self.settings.insert(settings.item_code.clone(), settings);
        self
    }

    /// 取得物料批次參數（未配置時使用預設值）
    fn settings_for(&self, item_code: &str) -> ItemBatchSettings {
        self.settings
            .get(item_code)
            .cloned()
            .unwrap_or_else(|| ItemBatchSettings::new(item_code.to_string()))
    }

    /// 讀取批次目錄
    pub fn catalog(&self, item_code: &str, warehouse: &str) -> BatchCatalog {
        BatchCatalog::load(self.batches, self.ledger, item_code, warehouse, self.today)
    }

    /// 讀取批次目錄並限制在序號對應的批次
    pub fn catalog_for_serials(
        &self,
        item_code: &str,
        warehouse: &str,
        serial_batch_ids: &[String],
    ) -> Result<BatchCatalog> {
        BatchCatalog::load_for_serials(
            self.batches,
            self.ledger,
            item_code,
            warehouse,
            self.today,
            serial_batch_ids,
        )
    }

    /// 單列批次挑選（FEFO 自動選批呼叫點）
    pub fn select_batch(&self, request: &AllocationRequest) -> Result<SelectionOutcome> {
        tracing::debug!(
            "挑選批次: 物料 {} 倉庫 {} 需求 {}",
            request.item_code,
            request.warehouse,
            request.requested_qty
        );

        let catalog = self.catalog(&request.item_code, &request.warehouse);
        FefoSelector::select(request, &catalog, self.today)
    }

    /// 整張單據的多列分配（切分 + 免費品對帳呼叫點）
    pub fn allocate(&self, input: &AllocationInput) -> Result<AllocationOutcome> {
        tracing::info!(
            "開始批次分配：物料 {} 倉庫 {} 需求 {}，既有列 {} 筆",
            input.item_code,
            input.warehouse,
            input.requested_qty,
            input.rows.len()
        );

        let start_time = std::time::Instant::now();

        let settings = self.settings_for(&input.item_code);
        let alert_date = settings.alert_date(self.today);

        // Step 1: 批次目錄
        tracing::debug!("Step 1: 批次目錄");
        let catalog = self.catalog(&input.item_code, &input.warehouse);
        tracing::debug!("候選批次數量: {}", catalog.len());

        // Step 2: 數量切分
        tracing::debug!("Step 2: 數量切分");
        let split_input = SplitInput {
            requested_qty: input.requested_qty,
            selection_mode: input.selection_mode,
            rows: &input.rows,
            constraints: &input.constraints,
            enforce_constraints: input.document_kind.carries_pricing_rules(),
        };
        let split = QuantitySplitter::split(&catalog, &split_input, self.today, alert_date)?;

        let mut result_rows = split.result_rows;
        let mut remaining_qty = split.remaining_qty;
        let mut pool = split.pool;
        let mut backorders = Vec::new();

        // Step 3: 免費品對帳（僅帶價格規則的單據類型）
        if input.document_kind.carries_pricing_rules() {
            if let Some(evaluator) = self.pricing {
                tracing::debug!("Step 3: 免費品對帳");
                let base_context = self.base_pricing_context(input);
                let free_rows: Vec<&DocumentRow> =
                    input.rows.iter().filter(|r| r.is_free_item).collect();

                let reconciled = FreeItemReconciler::reconcile(
                    &input.item_code,
                    &result_rows,
                    &free_rows,
                    &mut pool,
                    evaluator,
                    &base_context,
                );

                result_rows.extend(reconciled.free_rows);
                backorders = reconciled.backorders;
                remaining_qty += reconciled.unsatisfied_qty;
            }
        }

        let mut outcome = AllocationOutcome::new(result_rows, remaining_qty, backorders);

        if outcome.remaining_qty > Decimal::ZERO {
            outcome.add_warning(AllocWarning::warning(
                input.item_code.clone(),
                format!("可用批次容量不足，缺 {}", outcome.remaining_qty),
            ));
        }
        if outcome.result_rows.iter().any(|r| r.shortdated) {
            outcome.add_warning(AllocWarning::info(
                input.item_code.clone(),
                "分配使用了短效期批次".to_string(),
            ));
        }

        outcome.calculation_time_ms = Some(start_time.elapsed().as_millis());

        tracing::info!(
            "批次分配完成：結果 {} 列，未滿足 {}，欠交 {} 筆，耗時 {:?}",
            outcome.result_rows.len(),
            outcome.remaining_qty,
            outcome.backorders.len(),
            start_time.elapsed()
        );

        Ok(outcome)
    }

    /// 整張單據的批次自動指派（跨物料）
    ///
    /// 已有批次的列會以帳面數量重新驗證；未指定批次且啟用批次管理的列
    /// 走 FEFO 挑選，挑不出時保留空批次（`hard_fail` 時改為錯誤）。
    pub fn assign_batches(
        &self,
        lines: &[AssignableLine],
        hard_fail: bool,
    ) -> Result<Vec<RowAssignment>> {
        let mut assignments = Vec::with_capacity(lines.len());

        for line in lines {
            let settings = self.settings_for(&line.item_code);

            if !settings.batch_tracking_enabled || line.qty <= Decimal::ZERO {
                assignments.push(RowAssignment {
                    row_id: line.row_id.clone(),
                    batch_id: line.batch_id.clone(),
                    status: None,
                });
                continue;
            }

            match &line.batch_id {
                Some(batch_id) => {
                    let available = BatchCatalog::on_hand(
                        self.ledger,
                        &line.item_code,
                        &line.warehouse,
                        batch_id,
                    );
                    if available < line.qty {
                        return Err(AllocError::InsufficientBatchQty {
                            batch_id: batch_id.clone(),
                            available,
                            requested: line.qty,
                        });
                    }
                    assignments.push(RowAssignment {
                        row_id: line.row_id.clone(),
                        batch_id: Some(batch_id.clone()),
                        status: None,
                    });
                }
                None => {
                    let request = AllocationRequest::new(
                        line.item_code.clone(),
                        line.warehouse.clone(),
                        line.qty,
                    )
                    .with_shortdated_threshold_months(settings.shortdated_threshold_months)
                    .with_hard_fail(hard_fail);

                    let outcome = self.select_batch(&request)?;
                    assignments.push(RowAssignment {
                        row_id: line.row_id.clone(),
                        batch_id: outcome.selected_batch_id().map(str::to_string),
                        status: outcome.status(),
                    });
                }
            }
        }

        Ok(assignments)
    }

    /// 建立免費品對帳的基礎評估脈絡（價目表單價僅查一次）
    fn base_pricing_context(&self, input: &AllocationInput) -> PricingContext {
        let price_list_rate = match (&input.price_list, self.prices) {
            (Some(price_list), Some(prices)) => prices.price_list_rate(
                price_list,
                &input.item_code,
                input.customer.as_deref(),
            ),
            _ => None,
        };

        PricingContext {
            item_code: input.item_code.clone(),
            qty: Decimal::ZERO,
            rate: None,
            price_list_rate,
            price_list: input.price_list.clone(),
            customer: input.customer.clone(),
            customer_group: input.customer_group.clone(),
            company: input.company.clone(),
            transaction_date: self.today,
            document_kind: input.document_kind,
            pricing_rule_ids: Vec::new(),
            ignore_pricing_rules: false,
        }
    }

    /// 取得過帳日
    pub fn today(&self) -> NaiveDate {
        self.today
    }
}
