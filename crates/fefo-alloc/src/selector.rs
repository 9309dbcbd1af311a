//! FEFO 批次挑選器

use chrono::NaiveDate;
use fefo_core::{
    AllocError, AllocationRequest, BatchCandidate, BatchSummary, ExpiryStatus, Result,
    SelectionOutcome,
};

use crate::catalog::BatchCatalog;

/// FEFO 批次挑選器：為單列需求挑出一個批次
pub struct FefoSelector;

impl FefoSelector {
    /// 依 FEFO 策略挑選批次
    ///
    /// 已過期批次永不入選；掃描期間持續記錄是否存在短效期替代批次
    /// （與最終選定哪個批次無關）。設有既有選定批次時，掃描會繼續進行
    /// 以便在其仍有足量時沿用，而非停在第一個足量批次。
    pub fn select(
        request: &AllocationRequest,
        catalog: &BatchCatalog,
        today: NaiveDate,
    ) -> Result<SelectionOutcome> {
        request.validate_for_selection()?;

        let alert_date = request.alert_date(today);

        let mut shortdated_available = false;
        let mut first_fit: Option<&BatchCandidate> = None;
        let mut pinned_fit: Option<&BatchCandidate> = None;
        let mut found = false;

        for batch in catalog.eligible() {
            if batch.is_expired(today) {
                continue;
            }
            if batch.is_shortdated(alert_date) {
                shortdated_available = true;
            }
            if found {
                continue;
            }
            if batch.on_hand_qty >= request.requested_qty {
                if first_fit.is_none() {
                    first_fit = Some(batch);
                    if request.pinned_batch_id.is_none() {
                        found = true;
                    }
                }
                if let Some(pinned) = &request.pinned_batch_id {
                    if batch.batch_id == *pinned {
                        pinned_fit = Some(batch);
                        found = true;
                    }
                }
            }
        }

        let chosen = pinned_fit.or(first_fit);

        let Some(batch) = chosen else {
            return Self::no_fit_outcome(request, catalog, today, alert_date);
        };

        let status = if batch.is_shortdated(alert_date) {
            ExpiryStatus::Shortdated
        } else if shortdated_available {
            ExpiryStatus::LongdatedWithShortdatedAvailable
        } else {
            ExpiryStatus::Clean
        };

        Ok(SelectionOutcome::Selected {
            batch_id: batch.batch_id.clone(),
            on_hand_qty: batch.on_hand_qty,
            expiry_date: batch.expiry_date,
            status,
        })
    }

    /// 無單一足量批次時的結果：全無庫存則無可建議，否則回傳候選表
    fn no_fit_outcome(
        request: &AllocationRequest,
        catalog: &BatchCatalog,
        today: NaiveDate,
        alert_date: NaiveDate,
    ) -> Result<SelectionOutcome> {
        let candidates: Vec<BatchSummary> = catalog
            .candidates()
            .iter()
            .filter(|b| !b.is_expired(today) && b.has_stock())
            .map(|b| BatchSummary {
                batch_id: b.batch_id.clone(),
                on_hand_qty: b.on_hand_qty,
                expiry_date: b.expiry_date,
                shortdated: b.is_shortdated(alert_date),
            })
            .collect();

        if candidates.is_empty() {
            return Ok(SelectionOutcome::NothingToSuggest);
        }

        if request.hard_fail {
            return Err(AllocError::ManualSelectionRequired {
                item_code: request.item_code.clone(),
                requested_qty: request.requested_qty,
                candidates,
            });
        }

        Ok(SelectionOutcome::ManualSelectionRequired { candidates })
    }
}
