//! Ownership checks for direct ledger edits.

use tracing::warn;

use super::types::{CardLedgerEntry, LedgerEntry};
use crate::error::EngineError;

/// Rejects direct edits of derived or document-owned cash entries.
pub fn ensure_cash_entry_editable(entry: &LedgerEntry) -> Result<(), EngineError> {
    if entry.is_consolidated_invoice {
        warn!(entry_id = %entry.id, "Rejected direct edit of consolidated invoice");
        return Err(EngineError::ConsolidatedInvoiceReadOnly(entry.id));
    }
    if let Some(origin) = entry.origin {
        warn!(entry_id = %entry.id, origin = %origin, "Rejected direct edit of document-owned entry");
        return Err(EngineError::DocumentOwnedEntry {
            entry: entry.id,
            origin,
        });
    }
    Ok(())
}

/// Rejects direct edits of card entries owned by an origin document.
pub fn ensure_card_entry_editable(entry: &CardLedgerEntry) -> Result<(), EngineError> {
    if entry.source.is_owned_by_document() {
        warn!(entry_id = %entry.id, source = %entry.source, "Rejected direct edit of document-owned card entry");
        return Err(EngineError::DocumentOwnedCardEntry {
            entry: entry.id,
            owner: entry.source,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use storeledger_shared::types::{
        CardEntryId, FinancialAccountId, InstrumentId, ManualGroupId, PurchaseOrderId,
    };

    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::types::CardSource;

    fn card_entry(source: CardSource) -> CardLedgerEntry {
        CardLedgerEntry {
            id: CardEntryId::new(),
            description: "Filters".to_string(),
            amount: dec!(50),
            category: "purchase".to_string(),
            competence_at: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
            account_id: FinancialAccountId::new(),
            instrument_id: InstrumentId::new(),
            installment: 1,
            installment_count: 1,
            source,
        }
    }

    #[test]
    fn test_purchase_card_entry_names_its_owner() {
        let source = CardSource::Purchase(PurchaseOrderId::new());
        let entry = card_entry(source);

        let err = ensure_card_entry_editable(&entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
        assert_eq!(err.error_code(), "DOCUMENT_OWNED_CARD_ENTRY");
        assert!(err.to_string().contains(&source.to_string()));
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_manual_card_entry_is_editable() {
        let entry = card_entry(CardSource::Manual(ManualGroupId::new()));
        assert!(ensure_card_entry_editable(&entry).is_ok());
    }
}
