//! # Seed Data Generator
//!
//! Populates a database with a demo catalog, sales and expenses.
//!
//! ## Usage
//! ```bash
//! # 60 products, 120 sales over the last 30 days
//! cargo run -p salesbook-db --bin seed
//!
//! cargo run -p salesbook-db --bin seed -- --count 200 --sales 500
//! cargo run -p salesbook-db --bin seed -- --db ./data/dev.db --owner demo
//! ```
//!
//! Defaults for `--db` and `--owner` come from `AppConfig`.
//!
//! ## Generated Data
//! - The four default statuses
//! - Products: SKU `{CAT}-{NAME}-{NNN}`, prices 20.00 - 419.00, stock 0 - 40
//! - Sales: 1 - 3 lines each, spread over the last 30 days
//! - Expenses: monthly rent plus transport and supplies

use std::env;
use std::sync::Arc;

use chrono::{Duration, Utc};
use salesbook_core::{
    ExpenseCategory, ExpenseInput, Money, Product, ProductInput, SaleInput, SaleItemInput,
};
use salesbook_db::{init_tracing, AppConfig, Database, DbConfig, StaticIdentity};

/// Catalog for realistic demo data: (category code, category label, items).
const CATALOG: &[(&str, &str, &[&str])] = &[
    (
        "VET",
        "Vêtements",
        &["T-shirt", "Chemise", "Jean", "Djellaba", "Caftan", "Veste", "Pull", "Short"],
    ),
    (
        "CHS",
        "Chaussures",
        &["Babouches", "Baskets", "Sandales", "Bottines", "Mocassins"],
    ),
    (
        "ACC",
        "Accessoires",
        &["Sac", "Ceinture", "Foulard", "Casquette", "Portefeuille", "Lunettes"],
    ),
    (
        "BEA",
        "Beauté",
        &["Huile d'argan", "Savon noir", "Ghassoul", "Eau de rose", "Parfum"],
    ),
];

const PAYMENT_METHODS: &[&str] = &["cash", "card", "transfer", "mobile-money"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(None)?;
    init_tracing(&config.logging);

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut sales: usize = 120;
    let mut db_path = config.database_path();
    let mut owner = config
        .identity
        .owner_id
        .clone()
        .unwrap_or_else(|| "demo-owner".to_string());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salesbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of products to generate (default: 60)");
                println!("  -s, --sales <N>     Number of sales to generate (default: 120)");
                println!("  -d, --db <PATH>     Database file path (default: from config)");
                println!("  -o, --owner <ID>    Owner id to seed for (default: from config)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Salesbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path.display());
    println!("Owner:    {}", owner);
    println!();

    let db_config = DbConfig::new(&db_path).max_connections(config.database.max_connections);
    let db = Database::new(db_config).await?;
    let provider = db.provider(Arc::new(StaticIdentity::new(owner)));

    println!("✓ Connected to database, migrations applied");

    let existing = provider.products().stock_summary().await?.total_products;
    if existing > 0 {
        println!("⚠ Owner already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let statuses = provider.statuses().ensure_defaults().await?;
    println!("✓ {} statuses ready", statuses.len());

    let start = std::time::Instant::now();
    let mut products: Vec<Product> = Vec::with_capacity(count);

    'catalog: for round in 0..=count {
        for (category_idx, (code, category, names)) in CATALOG.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                if products.len() >= count {
                    break 'catalog;
                }
                let seed = round * 100 + category_idx * 20 + name_idx;
                let status = &statuses[seed % statuses.len()];
                let input = product_input(code, category, name, &status.id, seed);

                match provider.products().create(input).await {
                    Ok(product) => products.push(product),
                    Err(e) => eprintln!("Failed to create product: {}", e),
                }
            }
        }
    }

    println!("✓ Generated {} products", products.len());

    let now = Utc::now();
    let mut recorded = 0;
    for n in 0..sales {
        if products.is_empty() {
            break;
        }
        let lines = 1 + n % 3;
        let items: Vec<SaleItemInput> = (0..lines)
            .map(|line| {
                let product = &products[(n * 7 + line * 13) % products.len()];
                SaleItemInput {
                    product_id: product.id.clone(),
                    qty: 1 + ((n + line) % 3) as i64,
                    unit_sale_price: product.sale_price,
                    unit_cost_price: product.purchase_price,
                }
            })
            .collect();

        let input = SaleInput {
            date: Some(now - Duration::hours(((n * 37) % (30 * 24)) as i64)),
            payment_method: Some(PAYMENT_METHODS[n % PAYMENT_METHODS.len()].to_string()),
            note: (n % 5 == 0).then(|| format!("Client fidèle #{}", n)),
            items,
            ..Default::default()
        };

        match provider.sales().create(input).await {
            Ok(_) => recorded += 1,
            Err(e) => eprintln!("Failed to record sale: {}", e),
        }
    }

    println!("✓ Recorded {} sales", recorded);

    let today = now.date_naive();
    let expenses = [
        ("Loyer boutique", ExpenseCategory::Rent, 450_000, 0),
        ("Livraison fournisseur", ExpenseCategory::Transport, 12_000, 3),
        ("Sacs et emballages", ExpenseCategory::Supplies, 8_500, 9),
        ("Publicité Instagram", ExpenseCategory::Marketing, 20_000, 15),
    ];
    for (label, category, cents, days_ago) in expenses {
        provider
            .expenses()
            .create(ExpenseInput {
                label: label.to_string(),
                category,
                amount: Money::from_cents(cents),
                date: today - Duration::days(days_ago),
                note: None,
            })
            .await?;
    }
    println!("✓ Recorded {} expenses", expenses.len());

    let summary = provider.products().stock_summary().await?;
    println!();
    println!("Stock value:   {}", summary.total_cost);
    println!("Potential:     {}", summary.total_potential);
    println!("Low stock:     {}", summary.low_stock_count);
    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

/// Builds one product input from a catalog entry.
fn product_input(code: &str, category: &str, name: &str, status_id: &str, seed: usize) -> ProductInput {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    // 20.00 - 419.00, cost 55-75% of price
    let sale_cents = 2_000 + ((seed * 1_733) % 40_000) as i64;
    let cost_cents = sale_cents * (55 + (seed % 21) as i64) / 100;
    let quantity = (seed % 41) as i64;

    ProductInput {
        sku: format!("{}-{}-{:03}", code, letters, seed),
        name: name.to_string(),
        category: Some(category.to_string()),
        brand: None,
        purchase_price: Money::from_cents(cost_cents),
        sale_price: Money::from_cents(sale_cents),
        quantity: Some(quantity),
        status_id: status_id.to_string(),
        reorder_threshold: None,
        initial_stock: Some(quantity),
    }
}
