//! Initial database migration.
//!
//! Creates the directory, catalog, ledger and document tables together with
//! their indexes and row-level security policies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: DIRECTORY
        // ============================================================
        db.execute_unprepared(FINANCIAL_ACCOUNTS_SQL).await?;
        db.execute_unprepared(PAYMENT_INSTRUMENTS_SQL).await?;

        // ============================================================
        // PART 2: CATALOG & CUSTOMERS
        // ============================================================
        db.execute_unprepared(STOCK_ITEMS_SQL).await?;
        db.execute_unprepared(CUSTOMERS_SQL).await?;

        // ============================================================
        // PART 3: LEDGERS
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(CARD_LEDGER_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: ORIGIN DOCUMENTS
        // ============================================================
        db.execute_unprepared(PURCHASE_ORDERS_SQL).await?;
        db.execute_unprepared(SERVICE_ORDERS_SQL).await?;
        db.execute_unprepared(ECOMMERCE_ORDERS_SQL).await?;
        db.execute_unprepared(SALES_SQL).await?;

        // ============================================================
        // PART 5: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const FINANCIAL_ACCOUNTS_SQL: &str = r"
CREATE TABLE financial_accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_financial_accounts_tenant ON financial_accounts(tenant_id);
";

const PAYMENT_INSTRUMENTS_SQL: &str = r"
CREATE TABLE payment_instruments (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES financial_accounts(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(16) NOT NULL CHECK (kind IN ('pix', 'debit', 'boleto', 'credit')),
    closing_day INTEGER CHECK (closing_day BETWEEN 1 AND 31),
    due_day INTEGER CHECK (due_day BETWEEN 1 AND 31),
    tax_rate NUMERIC NOT NULL DEFAULT 0 CHECK (tax_rate BETWEEN 0 AND 100),
    days_to_receive INTEGER NOT NULL DEFAULT 0 CHECK (days_to_receive >= 0),
    min_installments INTEGER NOT NULL DEFAULT 1 CHECK (min_installments >= 1),
    max_installments INTEGER NOT NULL DEFAULT 1,

    CONSTRAINT chk_credit_cycle CHECK (
        (kind = 'credit') = (closing_day IS NOT NULL AND due_day IS NOT NULL)
    ),
    CONSTRAINT chk_installment_range CHECK (max_installments >= min_installments)
);

CREATE INDEX idx_payment_instruments_account ON payment_instruments(account_id);
";

const STOCK_ITEMS_SQL: &str = r"
CREATE TABLE stock_items (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(16) NOT NULL CHECK (kind IN ('product', 'service')),
    quantity NUMERIC NOT NULL DEFAULT 0,
    average_cost NUMERIC NOT NULL DEFAULT 0 CHECK (average_cost >= 0),
    sale_price NUMERIC NOT NULL DEFAULT 0,
    last_sold_at TIMESTAMPTZ
);

CREATE INDEX idx_stock_items_tenant ON stock_items(tenant_id);
";

const CUSTOMERS_SQL: &str = r"
CREATE TABLE customers (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    phone_digits VARCHAR(32) NOT NULL CHECK (phone_digits ~ '^[0-9]+$'),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_customers_phone UNIQUE (tenant_id, phone_digits)
);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    public_id VARCHAR(16) NOT NULL,
    description TEXT NOT NULL,
    amount NUMERIC NOT NULL CHECK (amount >= 0),
    flow VARCHAR(16) NOT NULL CHECK (flow IN ('income', 'expense')),
    category VARCHAR(64) NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('pending', 'paid')),
    competence_at TIMESTAMPTZ NOT NULL,
    due_date DATE NOT NULL,
    paid_at TIMESTAMPTZ,
    origin_type VARCHAR(32),
    origin_id UUID,
    account_id UUID,
    instrument_id UUID,
    installment_plan JSONB,
    is_consolidated_invoice BOOLEAN NOT NULL DEFAULT FALSE,

    CONSTRAINT chk_origin_pair CHECK ((origin_type IS NULL) = (origin_id IS NULL)),
    CONSTRAINT chk_invoice_has_card CHECK (
        NOT is_consolidated_invoice
        OR (account_id IS NOT NULL AND instrument_id IS NOT NULL AND origin_type IS NULL)
    ),
    CONSTRAINT chk_paid_at CHECK ((status = 'paid') = (paid_at IS NOT NULL))
);

CREATE UNIQUE INDEX uq_ledger_entries_public_id ON ledger_entries(tenant_id, public_id);
CREATE INDEX idx_ledger_entries_origin ON ledger_entries(tenant_id, origin_type, origin_id)
    WHERE origin_type IS NOT NULL;
CREATE INDEX idx_ledger_entries_due ON ledger_entries(tenant_id, due_date);

-- At most one consolidated invoice per (card, due day)
CREATE UNIQUE INDEX uq_ledger_entries_invoice
    ON ledger_entries(tenant_id, account_id, instrument_id, due_date)
    WHERE is_consolidated_invoice;
";

const CARD_LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE card_ledger_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    description TEXT NOT NULL,
    amount NUMERIC NOT NULL CHECK (amount >= 0),
    category VARCHAR(64) NOT NULL,
    competence_at TIMESTAMPTZ NOT NULL,
    due_date DATE NOT NULL,
    account_id UUID NOT NULL REFERENCES financial_accounts(id),
    instrument_id UUID NOT NULL REFERENCES payment_instruments(id),
    installment INTEGER NOT NULL CHECK (installment >= 1),
    installment_count INTEGER NOT NULL CHECK (installment_count >= installment),
    source_type VARCHAR(32) NOT NULL,
    source_id UUID NOT NULL
);

CREATE INDEX idx_card_ledger_entries_invoice
    ON card_ledger_entries(tenant_id, account_id, instrument_id, due_date);
CREATE INDEX idx_card_ledger_entries_source
    ON card_ledger_entries(tenant_id, source_type, source_id);
";

const PURCHASE_ORDERS_SQL: &str = r"
CREATE TABLE purchase_orders (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('pending', 'completed', 'cancelled')),
    supplier VARCHAR(255) NOT NULL,
    lines JSONB NOT NULL,
    freight NUMERIC NOT NULL DEFAULT 0,
    other_costs NUMERIC NOT NULL DEFAULT 0,
    payment JSONB NOT NULL,
    purchased_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ
);

CREATE INDEX idx_purchase_orders_tenant ON purchase_orders(tenant_id, status);
";

const SERVICE_ORDERS_SQL: &str = r"
CREATE TABLE service_orders (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL
        CHECK (status IN ('pending', 'in_progress', 'completed', 'cancelled')),
    description TEXT NOT NULL,
    customer_name VARCHAR(255) NOT NULL DEFAULT '',
    customer_id UUID,
    parts JSONB NOT NULL DEFAULT '[]',
    price NUMERIC NOT NULL DEFAULT 0,
    cost NUMERIC NOT NULL DEFAULT 0,
    receipt JSONB,
    cost_payment JSONB,
    origin_order_id UUID,
    opened_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ
);

CREATE INDEX idx_service_orders_tenant ON service_orders(tenant_id, status);
CREATE INDEX idx_service_orders_origin ON service_orders(tenant_id, origin_order_id)
    WHERE origin_order_id IS NOT NULL;
";

const ECOMMERCE_ORDERS_SQL: &str = r"
CREATE TABLE ecommerce_orders (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('PENDING', 'SENT', 'DELIVERED')),
    customer_name VARCHAR(255) NOT NULL,
    customer_phone VARCHAR(64) NOT NULL,
    lines JSONB NOT NULL,
    account_id UUID,
    placed_at TIMESTAMPTZ NOT NULL,
    sent_at TIMESTAMPTZ,
    delivered_at TIMESTAMPTZ
);

CREATE INDEX idx_ecommerce_orders_tenant ON ecommerce_orders(tenant_id, status);
";

const SALES_SQL: &str = r"
CREATE TABLE sales (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    order_id UUID NOT NULL REFERENCES ecommerce_orders(id) ON DELETE CASCADE,
    customer_id UUID NOT NULL REFERENCES customers(id),
    lines JSONB NOT NULL,
    total NUMERIC NOT NULL,
    sold_at TIMESTAMPTZ NOT NULL,

    CONSTRAINT uq_sales_order UNIQUE (tenant_id, order_id)
);
";

const RLS_SQL: &str = r"
-- ============================================================
-- ROW-LEVEL SECURITY POLICIES
-- The ledger store sets app.current_tenant_id for each transaction
-- ============================================================

ALTER TABLE financial_accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE payment_instruments ENABLE ROW LEVEL SECURITY;
ALTER TABLE stock_items ENABLE ROW LEVEL SECURITY;
ALTER TABLE customers ENABLE ROW LEVEL SECURITY;
ALTER TABLE ledger_entries ENABLE ROW LEVEL SECURITY;
ALTER TABLE card_ledger_entries ENABLE ROW LEVEL SECURITY;
ALTER TABLE purchase_orders ENABLE ROW LEVEL SECURITY;
ALTER TABLE service_orders ENABLE ROW LEVEL SECURITY;
ALTER TABLE ecommerce_orders ENABLE ROW LEVEL SECURITY;
ALTER TABLE sales ENABLE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation ON financial_accounts
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON payment_instruments
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON stock_items
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON customers
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON ledger_entries
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON card_ledger_entries
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON purchase_orders
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON service_orders
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON ecommerce_orders
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

CREATE POLICY tenant_isolation ON sales
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS ecommerce_orders CASCADE;
DROP TABLE IF EXISTS service_orders CASCADE;
DROP TABLE IF EXISTS purchase_orders CASCADE;
DROP TABLE IF EXISTS card_ledger_entries CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS customers CASCADE;
DROP TABLE IF EXISTS stock_items CASCADE;
DROP TABLE IF EXISTS payment_instruments CASCADE;
DROP TABLE IF EXISTS financial_accounts CASCADE;
";
