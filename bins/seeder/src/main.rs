//! Database seeder for Storeledger development and testing.
//!
//! Provisions a demo tenant with one financial account (credit card, pix,
//! boleto and debit instruments) and a small product and service catalog,
//! then prints a bearer token scoped to that tenant.
//!
//! Usage: cargo run --bin seeder

use std::str::FromStr;

use rust_decimal::Decimal;
use storeledger_core::accounts::{
    FinancialAccount, InstrumentKind, PaymentInstrument, ReceivingRules,
};
use storeledger_core::billing::BillingCycle;
use storeledger_core::documents::{ItemKind, StockItem};
use storeledger_core::{LedgerStore, UnitOfWork};
use storeledger_db::{PgStore, PgUnitOfWork};
use storeledger_shared::types::{FinancialAccountId, InstrumentId, StockItemId, TenantId};
use storeledger_shared::{JwtConfig, JwtService};
use uuid::Uuid;

/// Demo tenant ID (consistent for all seeds)
const DEMO_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Demo account ID (consistent for all seeds)
const DEMO_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000010";
/// Demo user ID carried by the printed token
const DEMO_USER_ID: &str = "00000000-0000-0000-0000-000000000002";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = storeledger_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let uow = PgUnitOfWork::new(db);
    let tenant = TenantId::from_uuid(uuid(DEMO_TENANT_ID));

    let mut store = uow.begin(tenant).await.expect("Failed to open transaction");

    println!("Seeding demo account...");
    if seed_demo_account(&mut store).await {
        println!("Seeding catalog...");
        seed_catalog(&mut store).await;
    }

    store.commit().await.expect("Failed to commit seed data");

    let secret = std::env::var("STORELEDGER__JWT__SECRET")
        .unwrap_or_else(|_| JwtConfig::default().secret);
    let jwt = JwtService::new(JwtConfig {
        secret,
        access_token_expires_minutes: 60 * 24,
    });
    match jwt.generate_access_token(uuid(DEMO_USER_ID), tenant, "admin") {
        Ok(token) => println!("Demo token (24h):\n{token}"),
        Err(e) => eprintln!("Failed to generate demo token: {e}"),
    }

    println!("Seeding complete!");
}

fn uuid(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap()
}

/// Seeds the demo account with one instrument of each kind.
///
/// Returns false when the tenant was already provisioned.
async fn seed_demo_account(store: &mut PgStore) -> bool {
    let account_id = FinancialAccountId::from_uuid(uuid(DEMO_ACCOUNT_ID));

    if store
        .financial_account(account_id)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Demo tenant already provisioned, skipping...");
        return false;
    }

    let account = FinancialAccount {
        id: account_id,
        name: "Store account".to_string(),
        instruments: vec![
            PaymentInstrument {
                id: InstrumentId::new(),
                name: "Visa".to_string(),
                kind: InstrumentKind::Credit(BillingCycle::new(10, 20).unwrap()),
            },
            PaymentInstrument {
                id: InstrumentId::new(),
                name: "Pix".to_string(),
                kind: InstrumentKind::Pix(ReceivingRules::default()),
            },
            PaymentInstrument {
                id: InstrumentId::new(),
                name: "Boleto".to_string(),
                kind: InstrumentKind::Boleto(ReceivingRules {
                    max_installments: 12,
                    ..ReceivingRules::default()
                }),
            },
            PaymentInstrument {
                id: InstrumentId::new(),
                name: "Debit".to_string(),
                kind: InstrumentKind::Debit(ReceivingRules {
                    tax_rate: Decimal::from_str("1.99").unwrap(),
                    days_to_receive: 1,
                    ..ReceivingRules::default()
                }),
            },
        ],
    };

    if let Err(e) = store.insert_financial_account(&account).await {
        eprintln!("Failed to insert demo account: {e}");
        return false;
    }
    println!("  Created demo account with {} instruments", account.instruments.len());
    true
}

/// Seeds products with opening stock and a few services.
async fn seed_catalog(store: &mut PgStore) {
    let items = [
        ("USB-C cable", ItemKind::Product, "40", "12.50", "29.90"),
        ("Phone case", ItemKind::Product, "25", "8.00", "24.90"),
        ("Screen protector", ItemKind::Product, "60", "2.10", "14.90"),
        ("Screen replacement", ItemKind::Service, "0", "85.00", "249.00"),
        ("Battery swap", ItemKind::Service, "0", "40.00", "129.00"),
    ];

    let mut inserted = 0;
    for (name, kind, quantity, average_cost, sale_price) in items {
        let item = StockItem {
            id: StockItemId::new(),
            name: name.to_string(),
            kind,
            quantity: Decimal::from_str(quantity).unwrap(),
            average_cost: Decimal::from_str(average_cost).unwrap(),
            sale_price: Decimal::from_str(sale_price).unwrap(),
            last_sold_at: None,
        };

        if let Err(e) = store.insert_stock_item(&item).await {
            eprintln!("Failed to insert catalog item {name}: {e}");
        } else {
            inserted += 1;
        }
    }

    println!("  Created {inserted} catalog items");
}
