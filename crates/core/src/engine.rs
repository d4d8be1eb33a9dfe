//! Engine facade.
//!
//! Every public operation runs in its own unit of work: begin, operate,
//! commit. Any error drops the unit before commit, so a failed request leaves
//! documents, stock and ledgers exactly as they were.

use chrono::{DateTime, Utc};
use storeledger_shared::types::{
    CardEntryId, LedgerEntryId, ManualGroupId, PurchaseOrderId, TenantId,
};
use tracing::info;

use crate::calendar::ReferenceCalendar;
use crate::documents::{
    self, DocumentRef, DocumentSnapshot, EcommerceDraft, EcommerceOrder, PurchaseDraft,
    PurchaseOrder, ServiceOrder, ServiceOrderDraft, TransitionRequest, ecommerce, purchase,
    service_order,
};
use crate::error::EngineError;
use crate::ledger::invoice::{self, ReconcileOutcome};
use crate::ledger::manual::{self, CashEntryPatch, ManualCostInput, ManualPosting};
use crate::ledger::types::{InvoiceKey, LedgerEntry};
use crate::store::{LedgerStore, UnitOfWork};

/// Entry point of the financial engine.
pub struct FinancialEngine<U> {
    uow: U,
    calendar: ReferenceCalendar,
}

impl<U: UnitOfWork> FinancialEngine<U> {
    /// Creates an engine over a unit-of-work factory.
    pub fn new(uow: U, calendar: ReferenceCalendar) -> Self {
        Self { uow, calendar }
    }

    /// The reference calendar.
    pub fn calendar(&self) -> &ReferenceCalendar {
        &self.calendar
    }

    /// The unit-of-work factory.
    pub fn unit_of_work(&self) -> &U {
        &self.uow
    }

    // ========== Documents ==========

    /// Applies a status change atomically.
    ///
    /// Requesting the current status is a successful no-op.
    pub async fn apply_transition(
        &self,
        tenant: TenantId,
        request: TransitionRequest,
    ) -> Result<DocumentSnapshot, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let snapshot =
            documents::apply_transition(&mut store, &self.calendar, request, Utc::now()).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, document = ?request.document(), status = snapshot.status(), "Transition committed");
        Ok(snapshot)
    }

    /// Reverses a document's effects and deletes it atomically.
    pub async fn delete_document(
        &self,
        tenant: TenantId,
        document: DocumentRef,
    ) -> Result<(), EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        documents::delete_document(&mut store, &self.calendar, document).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, document = ?document, "Document deleted");
        Ok(())
    }

    /// Creates a pending purchase order.
    pub async fn create_purchase(
        &self,
        tenant: TenantId,
        draft: PurchaseDraft,
    ) -> Result<PurchaseOrder, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let order = purchase::create(&mut store, draft).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, purchase_id = %order.id, "Purchase order created");
        Ok(order)
    }

    /// Replaces a purchase order's content, re-deriving its effects.
    pub async fn update_purchase(
        &self,
        tenant: TenantId,
        id: PurchaseOrderId,
        draft: PurchaseDraft,
    ) -> Result<PurchaseOrder, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let order = purchase::update(&mut store, &self.calendar, id, draft).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, purchase_id = %id, "Purchase order updated");
        Ok(order)
    }

    /// Creates a pending service order.
    pub async fn create_service_order(
        &self,
        tenant: TenantId,
        draft: ServiceOrderDraft,
    ) -> Result<ServiceOrder, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let order = service_order::create(&mut store, draft, Utc::now()).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, service_order_id = %order.id, "Service order created");
        Ok(order)
    }

    /// Creates a pending e-commerce order.
    pub async fn create_ecommerce_order(
        &self,
        tenant: TenantId,
        draft: EcommerceDraft,
    ) -> Result<EcommerceOrder, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let order = ecommerce::create(&mut store, draft, Utc::now()).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, order_id = %order.id, "E-commerce order created");
        Ok(order)
    }

    // ========== Manual costs ==========

    /// Posts a manual cost.
    pub async fn post_manual_cost(
        &self,
        tenant: TenantId,
        input: ManualCostInput,
    ) -> Result<ManualPosting, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let posting = manual::post_manual_cost(&mut store, &self.calendar, input).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, group_id = %posting.group_id, "Manual cost posted");
        Ok(posting)
    }

    /// Replaces a manual card cost.
    pub async fn replace_manual_cost(
        &self,
        tenant: TenantId,
        group_id: ManualGroupId,
        input: ManualCostInput,
    ) -> Result<ManualPosting, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let posting = manual::replace_manual_cost(&mut store, &self.calendar, group_id, input).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, group_id = %group_id, "Manual cost replaced");
        Ok(posting)
    }

    /// Deletes a manual card cost.
    pub async fn delete_manual_cost(
        &self,
        tenant: TenantId,
        group_id: ManualGroupId,
    ) -> Result<(), EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        manual::delete_manual_cost(&mut store, &self.calendar, group_id).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, group_id = %group_id, "Manual cost deleted");
        Ok(())
    }

    /// Deletes a manual card entry together with its group.
    pub async fn delete_card_entry(
        &self,
        tenant: TenantId,
        id: CardEntryId,
    ) -> Result<(), EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        manual::delete_card_entry(&mut store, &self.calendar, id).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, card_entry_id = %id, "Card entry deleted");
        Ok(())
    }

    // ========== Cash entries ==========

    /// Edits a plain cash entry.
    pub async fn update_cash_entry(
        &self,
        tenant: TenantId,
        id: LedgerEntryId,
        patch: CashEntryPatch,
    ) -> Result<LedgerEntry, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let entry = manual::update_cash_entry(&mut store, id, patch).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, entry_id = %id, "Cash entry updated");
        Ok(entry)
    }

    /// Deletes a plain cash entry.
    pub async fn delete_cash_entry(
        &self,
        tenant: TenantId,
        id: LedgerEntryId,
    ) -> Result<(), EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        manual::delete_cash_entry(&mut store, id).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, entry_id = %id, "Cash entry deleted");
        Ok(())
    }

    /// Settles a cash entry.
    pub async fn mark_paid(
        &self,
        tenant: TenantId,
        id: LedgerEntryId,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<LedgerEntry, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let entry = manual::mark_paid(&mut store, id, paid_at.unwrap_or_else(Utc::now)).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, entry_id = %id, "Cash entry paid");
        Ok(entry)
    }

    /// Settles one parcel of a cash entry.
    pub async fn mark_installment_paid(
        &self,
        tenant: TenantId,
        id: LedgerEntryId,
        number: u32,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<LedgerEntry, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let entry = manual::mark_installment_paid(
            &mut store,
            id,
            number,
            paid_at.unwrap_or_else(Utc::now),
        )
        .await?;
        store.commit().await?;

        info!(tenant_id = %tenant, entry_id = %id, installment = number, "Installment paid");
        Ok(entry)
    }

    /// Re-derives one consolidated invoice from the card ledger.
    pub async fn reconcile_invoice(
        &self,
        tenant: TenantId,
        key: InvoiceKey,
    ) -> Result<ReconcileOutcome, EngineError> {
        let mut store = self.uow.begin(tenant).await?;
        let outcome = invoice::reconcile(&mut store, &self.calendar, &key).await?;
        store.commit().await?;

        info!(tenant_id = %tenant, invoice = %key, outcome = ?outcome, "Invoice reconciled");
        Ok(outcome)
    }
}
