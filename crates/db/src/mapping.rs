//! Conversions between `SeaORM` models and engine records.
//!
//! Status and kind enums are stored as text; nested document content
//! (lines, parts, payment selections, installment plans) as JSONB.

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::Json;
use serde::Serialize;
use serde::de::DeserializeOwned;
use storeledger_core::accounts::{
    FinancialAccount, InstrumentKind, PaymentInstrument, ReceivingRules,
};
use storeledger_core::billing::BillingCycle;
use storeledger_core::documents::{
    Customer, EcommerceDraft, EcommerceOrder, ItemKind, PurchaseDraft, PurchaseOrder, Sale,
    ServiceOrder, ServiceOrderDraft, StockItem,
};
use storeledger_core::ledger::types::{
    CardLedgerEntry, CardSource, EntryStatus, Flow, LedgerEntry, OriginRef,
};
use storeledger_core::store::StoreError;
use storeledger_shared::types::{
    CardEntryId, CustomerId, EcommerceOrderId, FinancialAccountId, InstrumentId, LedgerEntryId,
    ManualGroupId, PurchaseOrderId, SaleId, ServiceOrderId, StockItemId, TenantId,
};
use uuid::Uuid;

use crate::entities::{
    card_ledger_entries, customers, ecommerce_orders, financial_accounts, ledger_entries,
    payment_instruments, purchase_orders, sales, service_orders, stock_items,
};
use crate::public_id::public_id;

fn corrupt(column: &str, err: impl Display) -> StoreError {
    StoreError::Backend(format!("invalid value in column {column}: {err}"))
}

fn to_json<T: Serialize>(column: &str, value: &T) -> Result<Json, StoreError> {
    serde_json::to_value(value).map_err(|err| corrupt(column, err))
}

fn from_json<T: DeserializeOwned>(column: &str, value: Json) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|err| corrupt(column, err))
}

fn to_i32(column: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|err| corrupt(column, err))
}

fn to_u32(column: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|err| corrupt(column, err))
}

fn parse<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|err| corrupt(column, err))
}

fn flow_from_db(value: &str) -> Result<Flow, StoreError> {
    match value {
        "income" => Ok(Flow::Income),
        "expense" => Ok(Flow::Expense),
        other => Err(corrupt("flow", other)),
    }
}

fn entry_status_from_db(value: &str) -> Result<EntryStatus, StoreError> {
    match value {
        "pending" => Ok(EntryStatus::Pending),
        "paid" => Ok(EntryStatus::Paid),
        other => Err(corrupt("status", other)),
    }
}

fn item_kind_from_db(value: &str) -> Result<ItemKind, StoreError> {
    match value {
        "product" => Ok(ItemKind::Product),
        "service" => Ok(ItemKind::Service),
        other => Err(corrupt("kind", other)),
    }
}

/// Rebuilds an origin tag from its stored columns.
pub(crate) fn origin_from_db(kind: &str, id: Uuid) -> Result<OriginRef, StoreError> {
    match kind {
        "purchase" => Ok(OriginRef::Purchase(PurchaseOrderId::from_uuid(id))),
        "service_order" => Ok(OriginRef::ServiceOrder(ServiceOrderId::from_uuid(id))),
        "ecommerce_order" => Ok(OriginRef::EcommerceOrder(EcommerceOrderId::from_uuid(id))),
        "sale" => Ok(OriginRef::Sale(SaleId::from_uuid(id))),
        other => Err(corrupt("origin_type", other)),
    }
}

/// Rebuilds a card-entry source from its stored columns.
pub(crate) fn card_source_from_db(kind: &str, id: Uuid) -> Result<CardSource, StoreError> {
    match kind {
        "manual" => Ok(CardSource::Manual(ManualGroupId::from_uuid(id))),
        "purchase" => Ok(CardSource::Purchase(PurchaseOrderId::from_uuid(id))),
        "service_order" => Ok(CardSource::ServiceOrder(ServiceOrderId::from_uuid(id))),
        "ecommerce_order" => Ok(CardSource::EcommerceOrder(EcommerceOrderId::from_uuid(id))),
        other => Err(corrupt("source_type", other)),
    }
}

// ========== Directory ==========

/// Convert an account row and its instrument rows to the domain model.
pub(crate) fn account_to_domain(
    model: financial_accounts::Model,
    instruments: Vec<payment_instruments::Model>,
) -> Result<FinancialAccount, StoreError> {
    Ok(FinancialAccount {
        id: FinancialAccountId::from_uuid(model.id),
        name: model.name,
        instruments: instruments
            .into_iter()
            .map(instrument_to_domain)
            .collect::<Result<_, _>>()?,
    })
}

fn instrument_to_domain(model: payment_instruments::Model) -> Result<PaymentInstrument, StoreError> {
    let rules = || -> Result<ReceivingRules, StoreError> {
        Ok(ReceivingRules {
            tax_rate: model.tax_rate,
            days_to_receive: to_u32("days_to_receive", model.days_to_receive)?,
            min_installments: to_u32("min_installments", model.min_installments)?,
            max_installments: to_u32("max_installments", model.max_installments)?,
        })
    };

    let kind = match model.kind.as_str() {
        "pix" => InstrumentKind::Pix(rules()?),
        "debit" => InstrumentKind::Debit(rules()?),
        "boleto" => InstrumentKind::Boleto(rules()?),
        "credit" => {
            let (Some(closing), Some(due)) = (model.closing_day, model.due_day) else {
                return Err(corrupt("closing_day", "credit instrument without billing cycle"));
            };
            let cycle = BillingCycle::new(to_u32("closing_day", closing)?, to_u32("due_day", due)?)
                .map_err(|err| corrupt("closing_day", err))?;
            InstrumentKind::Credit(cycle)
        }
        other => return Err(corrupt("kind", other)),
    };

    Ok(PaymentInstrument {
        id: InstrumentId::from_uuid(model.id),
        name: model.name,
        kind,
    })
}

/// Convert an instrument to an insertable row.
pub fn instrument_to_active(
    tenant: TenantId,
    account: FinancialAccountId,
    instrument: &PaymentInstrument,
) -> Result<payment_instruments::ActiveModel, StoreError> {
    let (closing_day, due_day, rules) = match &instrument.kind {
        InstrumentKind::Credit(cycle) => (
            Some(to_i32("closing_day", cycle.closing_day())?),
            Some(to_i32("due_day", cycle.due_day())?),
            ReceivingRules::default(),
        ),
        InstrumentKind::Pix(rules) | InstrumentKind::Debit(rules) | InstrumentKind::Boleto(rules) => {
            (None, None, rules.clone())
        }
    };

    Ok(payment_instruments::ActiveModel {
        id: Set(instrument.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        account_id: Set(account.into_inner()),
        name: Set(instrument.name.clone()),
        kind: Set(instrument.kind.as_str().to_string()),
        closing_day: Set(closing_day),
        due_day: Set(due_day),
        tax_rate: Set(rules.tax_rate),
        days_to_receive: Set(to_i32("days_to_receive", rules.days_to_receive)?),
        min_installments: Set(to_i32("min_installments", rules.min_installments)?),
        max_installments: Set(to_i32("max_installments", rules.max_installments)?),
    })
}

// ========== Catalog ==========

/// Convert a stock item row to the domain model.
pub(crate) fn stock_item_to_domain(model: stock_items::Model) -> Result<StockItem, StoreError> {
    Ok(StockItem {
        id: StockItemId::from_uuid(model.id),
        name: model.name,
        kind: item_kind_from_db(&model.kind)?,
        quantity: model.quantity,
        average_cost: model.average_cost,
        sale_price: model.sale_price,
        last_sold_at: model.last_sold_at,
    })
}

/// Convert a stock item to a row.
pub fn stock_item_to_active(tenant: TenantId, item: &StockItem) -> stock_items::ActiveModel {
    stock_items::ActiveModel {
        id: Set(item.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        name: Set(item.name.clone()),
        kind: Set(item.kind.as_str().to_string()),
        quantity: Set(item.quantity),
        average_cost: Set(item.average_cost),
        sale_price: Set(item.sale_price),
        last_sold_at: Set(item.last_sold_at),
    }
}

pub(crate) fn customer_to_domain(model: customers::Model) -> Customer {
    Customer {
        id: CustomerId::from_uuid(model.id),
        name: model.name,
        phone_digits: model.phone_digits,
    }
}

// ========== Ledgers ==========

/// Convert a cash-ledger row to the domain model.
pub(crate) fn ledger_entry_to_domain(model: ledger_entries::Model) -> Result<LedgerEntry, StoreError> {
    let origin = match (model.origin_type.as_deref(), model.origin_id) {
        (Some(kind), Some(id)) => Some(origin_from_db(kind, id)?),
        (None, None) => None,
        _ => return Err(corrupt("origin_type", "origin type and id must be set together")),
    };

    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        description: model.description,
        amount: model.amount,
        flow: flow_from_db(&model.flow)?,
        category: model.category,
        status: entry_status_from_db(&model.status)?,
        competence_at: model.competence_at,
        due_date: model.due_date,
        paid_at: model.paid_at,
        origin,
        account_id: model.account_id.map(FinancialAccountId::from_uuid),
        instrument_id: model.instrument_id.map(InstrumentId::from_uuid),
        installment_plan: model
            .installment_plan
            .map(|plan| from_json("installment_plan", plan))
            .transpose()?,
        is_consolidated_invoice: model.is_consolidated_invoice,
    })
}

/// Convert a cash-ledger entry to a row.
pub(crate) fn ledger_entry_to_active(
    tenant: TenantId,
    entry: &LedgerEntry,
) -> Result<ledger_entries::ActiveModel, StoreError> {
    Ok(ledger_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        public_id: Set(public_id(entry.id)),
        description: Set(entry.description.clone()),
        amount: Set(entry.amount),
        flow: Set(entry.flow.as_str().to_string()),
        category: Set(entry.category.clone()),
        status: Set(entry.status.as_str().to_string()),
        competence_at: Set(entry.competence_at),
        due_date: Set(entry.due_date),
        paid_at: Set(entry.paid_at),
        origin_type: Set(entry.origin.map(|origin| origin.kind().to_string())),
        origin_id: Set(entry.origin.map(|origin| origin.id())),
        account_id: Set(entry.account_id.map(FinancialAccountId::into_inner)),
        instrument_id: Set(entry.instrument_id.map(InstrumentId::into_inner)),
        installment_plan: Set(entry
            .installment_plan
            .as_ref()
            .map(|plan| to_json("installment_plan", plan))
            .transpose()?),
        is_consolidated_invoice: Set(entry.is_consolidated_invoice),
    })
}

/// Convert a card-ledger row to the domain model.
pub(crate) fn card_entry_to_domain(
    model: card_ledger_entries::Model,
) -> Result<CardLedgerEntry, StoreError> {
    Ok(CardLedgerEntry {
        id: CardEntryId::from_uuid(model.id),
        description: model.description,
        amount: model.amount,
        category: model.category,
        competence_at: model.competence_at,
        due_date: model.due_date,
        account_id: FinancialAccountId::from_uuid(model.account_id),
        instrument_id: InstrumentId::from_uuid(model.instrument_id),
        installment: to_u32("installment", model.installment)?,
        installment_count: to_u32("installment_count", model.installment_count)?,
        source: card_source_from_db(&model.source_type, model.source_id)?,
    })
}

/// Convert a card-ledger entry to a row.
pub(crate) fn card_entry_to_active(
    tenant: TenantId,
    entry: &CardLedgerEntry,
) -> Result<card_ledger_entries::ActiveModel, StoreError> {
    Ok(card_ledger_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        description: Set(entry.description.clone()),
        amount: Set(entry.amount),
        category: Set(entry.category.clone()),
        competence_at: Set(entry.competence_at),
        due_date: Set(entry.due_date),
        account_id: Set(entry.account_id.into_inner()),
        instrument_id: Set(entry.instrument_id.into_inner()),
        installment: Set(to_i32("installment", entry.installment)?),
        installment_count: Set(to_i32("installment_count", entry.installment_count)?),
        source_type: Set(entry.source.kind().to_string()),
        source_id: Set(entry.source.id()),
    })
}

// ========== Documents ==========

pub(crate) fn purchase_to_domain(model: purchase_orders::Model) -> Result<PurchaseOrder, StoreError> {
    Ok(PurchaseOrder {
        id: PurchaseOrderId::from_uuid(model.id),
        status: parse("status", &model.status)?,
        draft: PurchaseDraft {
            supplier: model.supplier,
            lines: from_json("lines", model.lines)?,
            freight: model.freight,
            other_costs: model.other_costs,
            payment: from_json("payment", model.payment)?,
            purchased_at: model.purchased_at,
        },
        completed_at: model.completed_at,
    })
}

pub(crate) fn purchase_to_active(
    tenant: TenantId,
    order: &PurchaseOrder,
) -> Result<purchase_orders::ActiveModel, StoreError> {
    Ok(purchase_orders::ActiveModel {
        id: Set(order.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        status: Set(order.status.as_str().to_string()),
        supplier: Set(order.draft.supplier.clone()),
        lines: Set(to_json("lines", &order.draft.lines)?),
        freight: Set(order.draft.freight),
        other_costs: Set(order.draft.other_costs),
        payment: Set(to_json("payment", &order.draft.payment)?),
        purchased_at: Set(order.draft.purchased_at),
        completed_at: Set(order.completed_at),
    })
}

pub(crate) fn service_order_to_domain(
    model: service_orders::Model,
) -> Result<ServiceOrder, StoreError> {
    Ok(ServiceOrder {
        id: ServiceOrderId::from_uuid(model.id),
        status: parse("status", &model.status)?,
        draft: ServiceOrderDraft {
            description: model.description,
            customer_name: model.customer_name,
            customer_id: model.customer_id.map(CustomerId::from_uuid),
            parts: from_json("parts", model.parts)?,
            price: model.price,
            cost: model.cost,
            receipt: model
                .receipt
                .map(|value| from_json("receipt", value))
                .transpose()?,
            cost_payment: model
                .cost_payment
                .map(|value| from_json("cost_payment", value))
                .transpose()?,
        },
        origin_order_id: model.origin_order_id.map(EcommerceOrderId::from_uuid),
        opened_at: model.opened_at,
        completed_at: model.completed_at,
    })
}

pub(crate) fn service_order_to_active(
    tenant: TenantId,
    order: &ServiceOrder,
) -> Result<service_orders::ActiveModel, StoreError> {
    let draft = &order.draft;
    Ok(service_orders::ActiveModel {
        id: Set(order.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        status: Set(order.status.as_str().to_string()),
        description: Set(draft.description.clone()),
        customer_name: Set(draft.customer_name.clone()),
        customer_id: Set(draft.customer_id.map(CustomerId::into_inner)),
        parts: Set(to_json("parts", &draft.parts)?),
        price: Set(draft.price),
        cost: Set(draft.cost),
        receipt: Set(draft
            .receipt
            .as_ref()
            .map(|receipt| to_json("receipt", receipt))
            .transpose()?),
        cost_payment: Set(draft
            .cost_payment
            .as_ref()
            .map(|payment| to_json("cost_payment", payment))
            .transpose()?),
        origin_order_id: Set(order.origin_order_id.map(EcommerceOrderId::into_inner)),
        opened_at: Set(order.opened_at),
        completed_at: Set(order.completed_at),
    })
}

pub(crate) fn ecommerce_to_domain(
    model: ecommerce_orders::Model,
) -> Result<EcommerceOrder, StoreError> {
    Ok(EcommerceOrder {
        id: EcommerceOrderId::from_uuid(model.id),
        status: parse("status", &model.status)?,
        draft: EcommerceDraft {
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            lines: from_json("lines", model.lines)?,
            account_id: model.account_id.map(FinancialAccountId::from_uuid),
        },
        placed_at: model.placed_at,
        sent_at: model.sent_at,
        delivered_at: model.delivered_at,
    })
}

pub(crate) fn ecommerce_to_active(
    tenant: TenantId,
    order: &EcommerceOrder,
) -> Result<ecommerce_orders::ActiveModel, StoreError> {
    Ok(ecommerce_orders::ActiveModel {
        id: Set(order.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        status: Set(order.status.as_str().to_string()),
        customer_name: Set(order.draft.customer_name.clone()),
        customer_phone: Set(order.draft.customer_phone.clone()),
        lines: Set(to_json("lines", &order.draft.lines)?),
        account_id: Set(order.draft.account_id.map(FinancialAccountId::into_inner)),
        placed_at: Set(order.placed_at),
        sent_at: Set(order.sent_at),
        delivered_at: Set(order.delivered_at),
    })
}

pub(crate) fn sale_to_domain(model: sales::Model) -> Result<Sale, StoreError> {
    Ok(Sale {
        id: SaleId::from_uuid(model.id),
        order_id: EcommerceOrderId::from_uuid(model.order_id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        lines: from_json("lines", model.lines)?,
        total: model.total,
        sold_at: model.sold_at,
    })
}

pub(crate) fn sale_to_active(tenant: TenantId, sale: &Sale) -> Result<sales::ActiveModel, StoreError> {
    Ok(sales::ActiveModel {
        id: Set(sale.id.into_inner()),
        tenant_id: Set(tenant.into_inner()),
        order_id: Set(sale.order_id.into_inner()),
        customer_id: Set(sale.customer_id.into_inner()),
        lines: Set(to_json("lines", &sale.lines)?),
        total: Set(sale.total),
        sold_at: Set(sale.sold_at),
    })
}

/// Zero when the aggregate found no rows.
pub(crate) fn sum_or_zero(total: Option<Option<Decimal>>) -> Decimal {
    total.flatten().unwrap_or(Decimal::ZERO)
}
