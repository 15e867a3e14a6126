//! # Seed Data Generator
//!
//! Creates the first administrator account and, optionally, a small demo
//! catalog for development.
//!
//! ## Usage
//! ```bash
//! # Admin "admin" / "admin123" in ./kardex.db
//! cargo run -p kardex-db --bin seed
//!
//! # Custom account and database, plus demo data
//! cargo run -p kardex-db --bin seed -- --db ./data/kardex.db --admin root --password s3creto --demo
//!
//! # Just print an argon2 hash
//! cargo run -p kardex-db --bin seed -- --hash s3creto
//! ```

use std::env;

use anyhow::{bail, Context};
use chrono::{Days, Utc};
use kardex_core::{NewBatch, NewCategory, NewProduct, NewUser, Role};
use kardex_db::password::hash_password;
use kardex_db::{Database, DbConfig};

/// Demo categories and their products: (name, stock_min, stock_max, serialized).
const DEMO_CATALOG: &[(&str, &[(&str, i64, i64, bool)])] = &[
    (
        "Medicamentos",
        &[
            ("Paracetamol 500mg", 20, 200, false),
            ("Ibuprofeno 400mg", 20, 150, false),
            ("Amoxicilina 500mg", 10, 100, false),
        ],
    ),
    (
        "Material de curación",
        &[
            ("Gasas estériles", 50, 500, false),
            ("Guantes de nitrilo", 100, 1000, false),
        ],
    ),
    (
        "Equipo médico",
        &[
            ("Tensiómetro digital", 2, 10, true),
            ("Oxímetro de pulso", 2, 10, true),
        ],
    ),
];

struct Args {
    db_path: String,
    admin: String,
    password: String,
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        db_path: String::from("./kardex.db"),
        admin: String::from("admin"),
        password: String::from("admin123"),
        demo: false,
    };

    let mut i = 1;
    while i < args.len() {
        let value = || args.get(i + 1).cloned();
        match args[i].as_str() {
            "--db" | "-d" => {
                parsed.db_path = value().context("--db needs a path")?;
                i += 1;
            }
            "--admin" | "-a" => {
                parsed.admin = value().context("--admin needs a login")?;
                i += 1;
            }
            "--password" | "-p" => {
                parsed.password = value().context("--password needs a value")?;
                i += 1;
            }
            "--demo" => parsed.demo = true,
            "--hash" => {
                let plain = value().context("--hash needs a password")?;
                println!("{}", hash_password(&plain)?);
                return Ok(());
            }
            "--help" | "-h" => {
                println!("Kardex Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./kardex.db)");
                println!("  -a, --admin <LOGIN>     Administrator login (default: admin)");
                println!("  -p, --password <PASS>   Administrator password (default: admin123)");
                println!("      --demo              Also create demo categories, products and batches");
                println!("      --hash <PASS>       Print an argon2 hash and exit");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Kardex Seed Data Generator");
    println!("============================");
    println!("Database: {}", parsed.db_path);
    println!();

    let db = Database::new(DbConfig::new(&parsed.db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let admin_id = match db
        .users()
        .insert(&NewUser {
            login: parsed.admin.clone(),
            name: "Administrador".to_string(),
            surname: "Sistema".to_string(),
            password: parsed.password.clone(),
            role: Role::Administrator,
        })
        .await
    {
        Ok(id) => {
            println!("✓ Created administrator '{}' (id {})", parsed.admin, id);
            id
        }
        Err(e) if e.is_unique_violation() => {
            println!("⚠ User '{}' already exists, leaving it untouched", parsed.admin);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if parsed.demo {
        seed_demo(&db, admin_id).await?;
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

async fn seed_demo(db: &Database, admin_id: i64) -> anyhow::Result<()> {
    println!();
    println!("Generating demo catalog...");

    let today = Utc::now().date_naive();
    let mut serial = 0;

    for (category_idx, (category, products)) in DEMO_CATALOG.iter().enumerate() {
        let category_id = db
            .categories()
            .insert(&NewCategory {
                name: category.to_string(),
                description: None,
            })
            .await?;

        for (product_idx, (name, stock_min, stock_max, serialized)) in products.iter().enumerate() {
            let product_id = db
                .products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    description: None,
                    category_id,
                    stock_min: *stock_min,
                    stock_max: *stock_max,
                    tracks_serials: *serialized,
                })
                .await?;

            let quantity = if *serialized { 3 } else { stock_min + 10 * product_idx as i64 };
            let serial_codes = if *serialized {
                (0..quantity)
                    .map(|_| {
                        serial += 1;
                        format!("SN-{serial:06}")
                    })
                    .collect()
            } else {
                Vec::new()
            };

            // Spread expiry dates so the "expiring soon" view has content.
            let expiry_days = 10 + 25 * (category_idx * 3 + product_idx) as u64;

            db.ledger()
                .register_batch(
                    &NewBatch {
                        product_id,
                        quantity,
                        entry_date: None,
                        expiry_date: today.checked_add_days(Days::new(expiry_days)),
                        notes: Some("Inventario inicial".to_string()),
                        serial_codes,
                    },
                    admin_id,
                )
                .await?;

            println!("  ✓ {name} ({quantity} units)");
        }
    }

    Ok(())
}
