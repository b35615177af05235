//! # Seed Data Generator
//!
//! Populates a database with a demo store for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default) plus demo parties and sales
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - One category per aisle, with products in several sizes
//! - A handful of customers (one with an opening balance) and suppliers
//! - A purchase on account, then cash, card, credit and partly paid sales,
//!   all posted through the ledger engine so balances and the cashbox agree

use chrono::Utc;
use std::env;
use tally_core::checkout::Checkout;
use tally_core::{
    new_id, Category, Customer, Money, PaymentMethod, Product, Purchase, PurchaseItem, Settings,
    Supplier, TransactionType,
};
use tally_db::{init_tracing, Database, DbConfig};

/// Aisles and the products stocked in each.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &["Cola", "Lemon Soda", "Mineral Water", "Orange Juice", "Iced Tea", "Coffee Beans"],
    ),
    (
        "Snacks",
        &["Salted Chips", "Chocolate Bar", "Peanuts", "Cookies", "Popcorn"],
    ),
    (
        "Dairy",
        &["Milk", "Yogurt", "Cheddar", "Butter", "Labneh"],
    ),
    (
        "Pantry",
        &["Rice", "Pasta", "Olive Oil", "Lentils", "Flour", "Sugar", "Tea"],
    ),
    (
        "Household",
        &["Dish Soap", "Paper Towels", "Trash Bags", "Sponges"],
    ),
];

/// Size variants with their price addon in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 450),
];

const CUSTOMERS: &[(&str, i64)] = &[
    ("Walk-in Regular", 0),
    ("Amal Haddad", 2_500),
    ("Youssef Karam", 0),
    ("Corner Cafe", 0),
];

const SUPPLIERS: &[&str] = &["Metro Wholesale", "Valley Dairy Co"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let settings = db
        .settings()
        .save(&Settings {
            store_name: "Tally Demo Market".to_string(),
            tax_rate_bps: 500,
            ..Settings::default()
        })
        .await?;
    println!("✓ Settings saved ({}% tax)", settings.tax_rate().percentage());

    // Catalog
    println!();
    println!("Generating catalog...");

    let start = std::time::Instant::now();
    let mut products: Vec<Product> = Vec::with_capacity(count);

    'catalog: for (category_idx, (category_name, names)) in CATEGORIES.iter().enumerate() {
        let category = Category {
            id: new_id(),
            name: category_name.to_string(),
            description: None,
            created_at: Utc::now(),
        };
        db.categories().add(&category).await?;

        for (product_idx, name) in names.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if products.len() >= count {
                    break 'catalog;
                }

                let product = generate_product(
                    &category.id,
                    name,
                    size_name,
                    *price_addon,
                    category_idx * 1000 + product_idx * 20 + size_idx,
                );

                if let Err(e) = db.products().add(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }
                products.push(product);
            }
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Generated {} products in {:?}", products.len(), elapsed);

    // Parties
    let mut customers = Vec::new();
    for (name, opening_cents) in CUSTOMERS {
        let customer = Customer::new(new_id(), *name, Money::from_cents(*opening_cents), Utc::now());
        db.customers().add(&customer).await?;
        customers.push(customer);
    }

    let mut suppliers = Vec::new();
    for name in SUPPLIERS {
        let supplier = Supplier::new(new_id(), *name, Money::zero(), Utc::now());
        db.suppliers().add(&supplier).await?;
        suppliers.push(supplier);
    }
    println!("✓ {} customers, {} suppliers", customers.len(), suppliers.len());

    if products.is_empty() {
        println!();
        println!("✓ Seed complete (no products, no activity)");
        return Ok(());
    }

    // Activity, through the ledger so every balance agrees
    println!();
    println!("Posting demo activity...");

    let ledger = db.ledger();
    ledger
        .post_manual_transaction(TransactionType::Add, Money::from_cents(20_000), "Opening float", true)
        .await?;

    let restock: Vec<PurchaseItem> = products
        .iter()
        .take(5)
        .map(|p| PurchaseItem {
            product_id: p.id.clone(),
            quantity: 24,
            unit_cost_cents: p.cost_cents,
        })
        .collect();
    let restock_total: i64 = restock.iter().map(|item| item.quantity * item.unit_cost_cents).sum();
    ledger
        .record_purchase(Purchase {
            id: new_id(),
            supplier_id: suppliers.first().map(|s| s.id.clone()),
            items: restock,
            total_cents: restock_total,
            paid_amount_cents: restock_total / 2,
            notes: Some("Weekly restock".to_string()),
            created_at: Utc::now(),
        })
        .await?;
    println!("  Purchase recorded: {}", settings.format_amount(Money::from_cents(restock_total)));

    let methods = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Credit,
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
    ];
    let mut recorded = Vec::new();

    for (n, method) in methods.iter().enumerate() {
        let first = &products[n % products.len()];
        let second = &products[(n * 7 + 3) % products.len()];

        let mut checkout = Checkout::new(*method)
            .product(first, 1 + (n as i64 % 3))
            .product(second, 1);

        // Credit, and one partly paid cash sale, go on a customer's account
        if *method == PaymentMethod::Credit || n == 3 {
            checkout = checkout.customer(customers[1 + n % (customers.len() - 1)].id.clone());
        }
        if n == 3 {
            checkout = checkout.tendered(first.price());
        }

        let sale = checkout.build(&settings, Utc::now())?;
        let outcome = ledger.record_sale(sale).await?;
        if let Some(sale) = outcome.sale {
            println!(
                "  {} {:?}: {} (owing {})",
                sale.invoice_number,
                sale.payment_method,
                settings.format_amount(sale.total()),
                settings.format_amount(sale.remaining())
            );
            recorded.push(sale);
        }
    }

    if let Some(sale) = recorded.first() {
        ledger.return_sale(&sale.id).await?;
        println!("  Returned {}", sale.invoice_number);
    }

    let balance = ledger.compute_cashbox_balance().await?;

    println!();
    println!("✓ Cashbox balance: {}", settings.format_amount(balance));
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(category_id: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Product {
    let now = Utc::now();

    // Barcode (EAN-13 shaped, checksum not valid)
    let barcode = Some(format!("590{:010}", seed));

    // Price: base $1.99-$9.99 + size addon
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let price_cents = base_price + price_addon;

    // Cost (60-80% of price)
    let cost_pct = 60 + (seed % 20) as i64;
    let cost_cents = price_cents * cost_pct / 100;

    Product {
        id: new_id(),
        name: format!("{} {}", name, size),
        barcode,
        category_id: Some(category_id.to_string()),
        price_cents,
        cost_cents,
        stock: (seed % 61) as i64 + 10,
        min_stock: 5,
        tax_rate_bps: 0,
        created_at: now,
        updated_at: now,
    }
}
