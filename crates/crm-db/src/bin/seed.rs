//! # Demo Data Seeder
//!
//! Populates a database with a small dealership dataset for development:
//! customers, users of every profile, a dealer network, a truck catalog with
//! prices, leads with proposals waiting for approval and the menu tree.
//!
//! ## Usage
//! ```bash
//! # Seed ./crm_dev.db
//! cargo run -p crm-db --bin seed
//!
//! # Specify database path
//! cargo run -p crm-db --bin seed -- --db ./data/crm.db
//! ```
//!
//! Runs once per database: if any customer exists the seeder stops.

use std::env;

use chrono::{NaiveDate, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crm_core::*;
use crm_db::{Database, DbConfig};

/// (brand, [(model name, model code, list price in cents)])
const CATALOG: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Volvo",
        &[
            ("FH 540 6x4", "FH540", 85_000_000),
            ("FM 460 6x4", "FM460", 72_000_000),
            ("VM 270 4x2", "VM270", 48_500_000),
        ],
    ),
    (
        "Scania",
        &[
            ("R 540 A6x4", "R540", 87_900_000),
            ("P 360 B8x2", "P360", 61_000_000),
        ],
    ),
    (
        "Mercedes-Benz",
        &[
            ("Actros 2651", "ACT2651", 83_400_000),
            ("Atego 2430", "ATG2430", 52_300_000),
            ("Accelo 1017", "ACC1017", 33_900_000),
        ],
    ),
];

/// (name, CNPJ/CPF, city, state)
const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("Transportes Silva", "22333444000181", "Campinas", "SP"),
    ("Logística Horizonte", "33444555000181", "Curitiba", "PR"),
    ("Agro Norte", "52998224725", "Sinop", "MT"),
];

/// (label, route, children, profiles)
const MENUS: &[(&str, &[(&str, &str)], &[Profile])] = &[
    (
        "Cadastros",
        &[("Clientes", "/clientes"), ("Veículos", "/veiculos")],
        &[Profile::Admin, Profile::Manager],
    ),
    (
        "Comercial",
        &[
            ("Leads", "/leads"),
            ("Propostas", "/propostas"),
            ("Aprovações", "/aprovacoes"),
            ("Vendas", "/vendas"),
        ],
        &[Profile::Admin, Profile::Manager, Profile::Approver, Profile::Seller],
    ),
    (
        "Sistema",
        &[("Usuários", "/usuarios"), ("Menus", "/menus")],
        &[Profile::Admin],
    ),
];

/// Initializes tracing with an `RUST_LOG` override.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crm=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./crm_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("CRM Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./crm_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 CRM Demo Data Seeder");
    println!("=======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db
        .customers()
        .find(&CustomerFilter::default(), &Pageable::of(0, 1))
        .await?
        .total_elements;
    if existing > 0 {
        println!("⚠ Database already has {} customers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let users = seed_users(&db).await?;
    let customers = seed_customers(&db, users.approver).await?;
    let network = seed_network(&db, users.seller).await?;
    let prices = seed_catalog(&db, network.partner_id).await?;
    seed_proposals(&db, &users, &customers, &network, &prices).await?;
    seed_menus(&db).await?;

    info!(elapsed = ?start.elapsed(), "Demo data seeded");

    println!();
    println!("Seeded in {:?}:", start.elapsed());
    print_counts(&db, users.admin).await?;

    println!();
    println!("✓ Seed complete!");
    println!("  Log in as 'aprovador' to see the approval work list.");

    Ok(())
}

struct Users {
    admin: i64,
    approver: i64,
    seller: i64,
}

struct Network {
    partner_id: i64,
    seller_id: i64,
}

/// (model id, price_product id, list price)
type Prices = Vec<(i64, i64, i64)>;

async fn seed_users(db: &Database) -> Result<Users, Box<dyn std::error::Error>> {
    let mut ids = Vec::new();
    for (username, profile) in [
        ("admin", Profile::Admin),
        ("gerente", Profile::Manager),
        ("aprovador", Profile::Approver),
        ("vendedor", Profile::Seller),
    ] {
        let id = db
            .users()
            .save(&User {
                id: 0,
                person_id: None,
                username: username.to_string(),
                email: format!("{}@crm.local", username),
                profile,
                active: true,
                created_at: Utc::now(),
            })
            .await?;
        ids.push(id);
    }

    println!("✓ {} users", ids.len());
    Ok(Users {
        admin: ids[0],
        approver: ids[2],
        seller: ids[3],
    })
}

async fn seed_customers(
    db: &Database,
    approver: i64,
) -> Result<Vec<i64>, Box<dyn std::error::Error>> {
    let holding_id = db
        .holdings()
        .save(&Holding {
            id: 0,
            name: "Grupo Silva".to_string(),
            document: "11222333000181".to_string(),
            active: true,
            created_at: Utc::now(),
        })
        .await?;

    let mut ids = Vec::new();
    for (n, (name, document, city, state)) in CUSTOMERS.iter().enumerate() {
        let id = db
            .customers()
            .save(&Customer {
                id: 0,
                holding_id: (n == 0).then_some(holding_id),
                name: name.to_string(),
                document: document.to_string(),
                email: None,
                phone: None,
                city: Some(city.to_string()),
                state: Some(state.to_string()),
                active: true,
                created_at: Utc::now(),
            })
            .await?;
        ids.push(id);
    }

    // the approver's portfolio: first two customers
    for customer_id in &ids[..2] {
        db.users().link_customer(approver, *customer_id).await?;
    }

    println!("✓ {} customers", ids.len());
    Ok(ids)
}

async fn seed_network(db: &Database, seller_user: i64) -> Result<Network, Box<dyn std::error::Error>> {
    let dealer_person = db
        .people()
        .save(&Person {
            id: 0,
            name: "Concessionária Rota".to_string(),
            document: Some("44555666000181".to_string()),
            person_type: PersonType::Company,
            email: None,
            phone: None,
            birth_date: None,
            created_at: Utc::now(),
        })
        .await?;
    let seller_person = db
        .people()
        .save(&Person {
            id: 0,
            name: "Carlos Souza".to_string(),
            document: Some("12345678909".to_string()),
            person_type: PersonType::Individual,
            email: None,
            phone: None,
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 14),
            created_at: Utc::now(),
        })
        .await?;

    let partner_id = db
        .partners()
        .save(&Partner {
            id: 0,
            person_id: dealer_person,
            code: "DLR-01".to_string(),
            partner_type: PartnerType::Dealer,
            active: true,
            created_at: Utc::now(),
        })
        .await?;
    let seller_id = db
        .sellers()
        .save(&Seller {
            id: 0,
            person_id: seller_person,
            partner_id: Some(partner_id),
            user_id: Some(seller_user),
            code: "SLR-01".to_string(),
            active: true,
            created_at: Utc::now(),
        })
        .await?;

    println!("✓ dealer network");
    Ok(Network {
        partner_id,
        seller_id,
    })
}

async fn seed_catalog(db: &Database, partner_id: i64) -> Result<Prices, Box<dyn std::error::Error>> {
    let price_list_id = db
        .price_lists()
        .save(&PriceList {
            id: 0,
            partner_id: Some(partner_id),
            name: "Tabela Rota 2024".to_string(),
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid date")?,
            valid_until: None,
            active: true,
        })
        .await?;

    let mut prices = Vec::new();
    let mut serial = 0;
    for (brand, models) in CATALOG {
        let brand_id = db
            .brands()
            .save(&Brand {
                id: 0,
                name: brand.to_string(),
            })
            .await?;

        for (name, code, price_cents) in models.iter() {
            let model_id = db
                .models()
                .save(&Model {
                    id: 0,
                    brand_id,
                    name: name.to_string(),
                    code: code.to_string(),
                    active: true,
                })
                .await?;

            for _ in 0..2 {
                serial += 1;
                db.vehicles()
                    .save(&Vehicle {
                        id: 0,
                        model_id,
                        chassis: format!("9BWZZZ377VT{:06}", serial),
                        plate: None,
                        color: Some("Branco".to_string()),
                        model_year: 2024,
                        manufacture_year: 2024,
                        status: VehicleStatus::Available,
                        created_at: Utc::now(),
                    })
                    .await?;
            }

            let product_id = db
                .products()
                .save(&Product {
                    id: 0,
                    name: name.to_string(),
                    code: format!("P-{}", code),
                    description: None,
                    active: true,
                })
                .await?;
            db.products().add_model(product_id, model_id).await?;

            let price_product_id = db
                .price_products()
                .save(&PriceProduct {
                    id: 0,
                    price_list_id,
                    product_id,
                    price_cents: *price_cents,
                })
                .await?;
            prices.push((model_id, price_product_id, *price_cents));
        }
    }

    println!("✓ {} models, {} vehicles", prices.len(), serial);
    Ok(prices)
}

async fn seed_proposals(
    db: &Database,
    users: &Users,
    customers: &[i64],
    network: &Network,
    prices: &Prices,
) -> Result<(), Box<dyn std::error::Error>> {
    for (n, customer_id) in customers.iter().enumerate() {
        let lead_id = db
            .leads()
            .save(&Lead {
                id: 0,
                customer_id: Some(*customer_id),
                seller_id: Some(network.seller_id),
                name: format!("Renovação de frota {}", n + 1),
                email: None,
                phone: None,
                source: LeadSource::ALL[n % LeadSource::ALL.len()],
                status: LeadStatus::Qualified,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await?;

        let status = if n == customers.len() - 1 {
            ProposalStatus::Draft
        } else {
            ProposalStatus::PendingApproval
        };
        let proposal_id = db
            .proposals()
            .save(&Proposal {
                id: 0,
                lead_id,
                code: String::new(),
                status,
                created_by: if status == ProposalStatus::Draft {
                    users.admin
                } else {
                    users.seller
                },
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await?;

        let detail_id = db
            .proposal_details()
            .save(&ProposalDetail {
                id: 0,
                proposal_id,
                seller_id: network.seller_id,
                partner_id: Some(network.partner_id),
                channel: SaleChannel::Dealer,
                notes: None,
            })
            .await?;

        for (model_id, price_product_id, price_cents) in prices.iter().skip(n).step_by(3) {
            db.proposal_vehicles()
                .save(&ProposalDetailVehicle {
                    id: 0,
                    proposal_detail_id: detail_id,
                    model_id: *model_id,
                    vehicle_id: None,
                    price_product_id: *price_product_id,
                    quantity: (n + 1) as i64,
                    price_cents: *price_cents,
                    discount_cents: price_cents / 50,
                })
                .await?;
        }

        let total = db.proposal_vehicles().total_for_proposal(proposal_id).await?;
        info!(proposal_id, %status, %total, "Seeded proposal");
    }

    println!("✓ {} leads with proposals", customers.len());
    Ok(())
}

async fn seed_menus(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let mut count = 0;
    for (position, (label, children, profiles)) in MENUS.iter().enumerate() {
        let parent_id = db
            .menus()
            .save(&Menu {
                id: 0,
                parent_id: None,
                label: label.to_string(),
                route: None,
                icon: None,
                position: position as i32,
            })
            .await?;
        for profile in profiles.iter() {
            db.menus().grant(parent_id, *profile).await?;
        }
        count += 1;

        for (child_position, (child_label, route)) in children.iter().enumerate() {
            let child_id = db
                .menus()
                .save(&Menu {
                    id: 0,
                    parent_id: Some(parent_id),
                    label: child_label.to_string(),
                    route: Some(route.to_string()),
                    icon: None,
                    position: child_position as i32,
                })
                .await?;
            for profile in profiles.iter().filter(|p| child_visible(child_label, **p)) {
                db.menus().grant(child_id, *profile).await?;
            }
            count += 1;
        }
    }

    println!("✓ {} menu entries", count);
    Ok(())
}

/// Approvals are hidden from sellers; sellers see the rest of their group.
fn child_visible(label: &str, profile: Profile) -> bool {
    label != "Aprovações" || profile.can_decide()
}

async fn print_counts(db: &Database, admin: i64) -> Result<(), Box<dyn std::error::Error>> {
    let one = Pageable::of(0, 1);

    let counts = [
        ("customers", db.customers().find(&CustomerFilter::default(), &one).await?.total_elements),
        ("users", db.users().find(&UserFilter::default(), &one).await?.total_elements),
        ("models", db.models().find(&ModelFilter::default(), &one).await?.total_elements),
        ("vehicles", db.vehicles().find(&VehicleFilter::default(), &one).await?.total_elements),
        ("leads", db.leads().find(&LeadFilter::default(), &one).await?.total_elements),
        ("proposals", db.proposals().find(&ProposalFilter::default(), &one).await?.total_elements),
        ("menus", db.menus().find(&MenuFilter::default(), &one).await?.total_elements),
    ];

    for (entity, total) in counts {
        println!("  {:<10} {}", entity, total);
    }

    let pending = db
        .approvals()
        .find_for_approval(admin, &ApprovalFilter::default(), &one)
        .await?
        .total_elements;
    println!("  {:<10} {}", "pending", pending);

    Ok(())
}
