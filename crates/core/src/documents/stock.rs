//! Stock movements caused by sales and service parts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use storeledger_shared::types::StockItemId;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::store::LedgerStore;

/// Units of an item a document line takes from stock.
#[derive(Debug, Clone)]
pub struct StockDemand<'a> {
    /// 1-based position of the line in its document.
    pub line: usize,
    /// The item.
    pub item_id: StockItemId,
    /// Line description, used in errors.
    pub description: &'a str,
    /// Requested quantity.
    pub quantity: Decimal,
}

/// Takes every demand from stock, or fails on the first line short of stock.
///
/// Service items have no stock and are left alone. A missing item fails the
/// whole movement.
pub async fn take_stock<S: LedgerStore>(
    store: &mut S,
    demands: &[StockDemand<'_>],
    sold_at: DateTime<Utc>,
) -> Result<(), EngineError> {
    for demand in demands {
        let mut item = store
            .stock_item_for_update(demand.item_id)
            .await?
            .ok_or(EngineError::StockItemNotFound(demand.item_id))?;
        if !item.is_stocked() {
            continue;
        }
        if item.quantity < demand.quantity {
            return Err(EngineError::InsufficientStock {
                line: demand.line,
                description: demand.description.to_string(),
                item_id: demand.item_id,
                requested: demand.quantity,
                available: item.quantity,
            });
        }

        item.quantity -= demand.quantity;
        item.last_sold_at = Some(sold_at);
        store.save_stock_item(&item).await?;
        debug!(item_id = %item.id, quantity = %demand.quantity, remaining = %item.quantity, "Stock taken");
    }
    Ok(())
}

/// Puts every demand back into stock. Missing items are skipped.
pub async fn restore_stock<S: LedgerStore>(
    store: &mut S,
    demands: &[StockDemand<'_>],
) -> Result<(), EngineError> {
    for demand in demands {
        let Some(mut item) = store.stock_item_for_update(demand.item_id).await? else {
            warn!(item_id = %demand.item_id, "Stock item missing, restore skipped");
            continue;
        };
        if !item.is_stocked() {
            continue;
        }

        item.quantity += demand.quantity;
        store.save_stock_item(&item).await?;
        debug!(item_id = %item.id, quantity = %demand.quantity, "Stock restored");
    }
    Ok(())
}
