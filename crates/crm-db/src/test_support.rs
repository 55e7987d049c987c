//! Shared fixtures for repository tests.
//!
//! `Graph::seed` inserts one small, fully linked dataset through the
//! repositories themselves:
//!
//! ```text
//! holding ── customer "Transportes Silva" (SP) ── lead ── proposal P1 (pending)
//!                                               │              └─ detail (dealer) ── line ×2
//!                                               └──────────── proposal P3 (draft)
//! customer "Agro Norte" (MT) ── lead ── proposal P2 (pending)
//!                                         └─ detail (direct) ── line ×1 (vehicle)
//!
//! users: admin · approver (linked to Transportes Silva) · seller (owns both details)
//! ```

use chrono::{NaiveDate, Utc};

use crm_core::*;

use crate::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

// =============================================================================
// Document and identifier generators
// =============================================================================

fn mod11(digits: &[u32], weight_of: impl Fn(usize) -> u32) -> u32 {
    let n = digits.len();
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * weight_of(n - 1 - i))
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

fn to_string(digits: &[u32]) -> String {
    digits
        .iter()
        .map(|d| char::from_digit(*d, 10).expect("decimal digit"))
        .collect()
}

/// Valid CPF whose first nine digits are `base`.
pub(crate) fn cpf(base: u32) -> String {
    let mut d: Vec<u32> = format!("{:09}", base)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    for _ in 0..2 {
        let dv = mod11(&d, |from_right| from_right as u32 + 2);
        d.push(dv);
    }
    to_string(&d)
}

/// Valid CNPJ whose first twelve digits are `base`.
pub(crate) fn cnpj(base: u64) -> String {
    let mut d: Vec<u32> = format!("{:012}", base)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    for _ in 0..2 {
        let dv = mod11(&d, |from_right| (from_right % 8) as u32 + 2);
        d.push(dv);
    }
    to_string(&d)
}

pub(crate) fn chassis(n: u32) -> String {
    format!("9BWZZZ377VT{:06}", n)
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

// =============================================================================
// Unsaved models
// =============================================================================

pub(crate) fn holding(name: &str, document: &str) -> Holding {
    Holding {
        id: 0,
        name: name.to_string(),
        document: document.to_string(),
        active: true,
        created_at: Utc::now(),
    }
}

pub(crate) fn customer(name: &str, document: &str) -> Customer {
    Customer {
        id: 0,
        holding_id: None,
        name: name.to_string(),
        document: document.to_string(),
        email: None,
        phone: None,
        city: None,
        state: None,
        active: true,
        created_at: Utc::now(),
    }
}

pub(crate) fn person(name: &str) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        document: None,
        person_type: PersonType::Individual,
        email: None,
        phone: None,
        birth_date: None,
        created_at: Utc::now(),
    }
}

pub(crate) fn user(username: &str, profile: Profile) -> User {
    User {
        id: 0,
        person_id: None,
        username: username.to_string(),
        email: format!("{}@crm.test", username),
        profile,
        active: true,
        created_at: Utc::now(),
    }
}

pub(crate) fn partner(person_id: i64, code: &str) -> Partner {
    Partner {
        id: 0,
        person_id,
        code: code.to_string(),
        partner_type: PartnerType::Dealer,
        active: true,
        created_at: Utc::now(),
    }
}

pub(crate) fn seller(person_id: i64, code: &str) -> Seller {
    Seller {
        id: 0,
        person_id,
        partner_id: None,
        user_id: None,
        code: code.to_string(),
        active: true,
        created_at: Utc::now(),
    }
}

pub(crate) fn model(brand_id: i64, name: &str, code: &str) -> Model {
    Model {
        id: 0,
        brand_id,
        name: name.to_string(),
        code: code.to_string(),
        active: true,
    }
}

pub(crate) fn vehicle(model_id: i64, n: u32) -> Vehicle {
    Vehicle {
        id: 0,
        model_id,
        chassis: chassis(n),
        plate: None,
        color: None,
        model_year: 2024,
        manufacture_year: 2024,
        status: VehicleStatus::Available,
        created_at: Utc::now(),
    }
}

pub(crate) fn product(name: &str, code: &str) -> Product {
    Product {
        id: 0,
        name: name.to_string(),
        code: code.to_string(),
        description: None,
        active: true,
    }
}

pub(crate) fn price_list(name: &str, partner_id: Option<i64>, valid_from: NaiveDate) -> PriceList {
    PriceList {
        id: 0,
        partner_id,
        name: name.to_string(),
        valid_from,
        valid_until: None,
        active: true,
    }
}

pub(crate) fn lead(name: &str, customer_id: Option<i64>, seller_id: Option<i64>) -> Lead {
    Lead {
        id: 0,
        customer_id,
        seller_id,
        name: name.to_string(),
        email: None,
        phone: None,
        source: LeadSource::Website,
        status: LeadStatus::New,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn proposal(lead_id: i64, created_by: i64, status: ProposalStatus) -> Proposal {
    Proposal {
        id: 0,
        lead_id,
        code: String::new(),
        status,
        created_by,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn detail(
    proposal_id: i64,
    seller_id: i64,
    partner_id: Option<i64>,
    channel: SaleChannel,
) -> ProposalDetail {
    ProposalDetail {
        id: 0,
        proposal_id,
        seller_id,
        partner_id,
        channel,
        notes: None,
    }
}

pub(crate) fn line(
    detail_id: i64,
    model_id: i64,
    price_product_id: i64,
    quantity: i64,
    price_cents: i64,
) -> ProposalDetailVehicle {
    ProposalDetailVehicle {
        id: 0,
        proposal_detail_id: detail_id,
        model_id,
        vehicle_id: None,
        price_product_id,
        quantity,
        price_cents,
        discount_cents: 0,
    }
}

// =============================================================================
// Seeded graph
// =============================================================================

pub(crate) const FH_PRICE: i64 = 85_000_000;

pub(crate) struct Graph {
    pub holding_id: i64,
    pub silva_id: i64,
    pub agro_id: i64,
    pub admin_id: i64,
    pub approver_id: i64,
    pub seller_user_id: i64,
    pub partner_person_id: i64,
    pub seller_person_id: i64,
    pub partner_id: i64,
    pub seller_id: i64,
    pub brand_id: i64,
    pub model_id: i64,
    pub vehicle_id: i64,
    pub product_id: i64,
    pub price_list_id: i64,
    pub price_product_id: i64,
    pub silva_lead_id: i64,
    pub agro_lead_id: i64,
    pub p1_id: i64,
    pub p2_id: i64,
    pub p3_id: i64,
    pub p1_detail_id: i64,
    pub p2_detail_id: i64,
    pub p1_line_id: i64,
    pub p2_line_id: i64,
}

impl Graph {
    pub(crate) async fn seed(db: &Database) -> Graph {
        let holding_id = db
            .holdings()
            .save(&holding("Grupo Silva", &cnpj(112223330001)))
            .await
            .unwrap();

        let silva_id = db
            .customers()
            .save(&Customer {
                holding_id: Some(holding_id),
                city: Some("Campinas".to_string()),
                state: Some("SP".to_string()),
                email: Some("compras@silva.com.br".to_string()),
                ..customer("Transportes Silva", &cnpj(223334440001))
            })
            .await
            .unwrap();
        let agro_id = db
            .customers()
            .save(&Customer {
                city: Some("Sinop".to_string()),
                state: Some("MT".to_string()),
                ..customer("Agro Norte", &cpf(529982247))
            })
            .await
            .unwrap();

        let admin_id = db.users().save(&user("admin", Profile::Admin)).await.unwrap();
        let approver_id = db
            .users()
            .save(&user("aprovador", Profile::Approver))
            .await
            .unwrap();
        db.users().link_customer(approver_id, silva_id).await.unwrap();
        let seller_user_id = db
            .users()
            .save(&user("vendedor", Profile::Seller))
            .await
            .unwrap();

        let partner_person_id = db
            .people()
            .save(&Person {
                person_type: PersonType::Company,
                document: Some(cnpj(334445550001)),
                ..person("Concessionária Rota")
            })
            .await
            .unwrap();
        let seller_person_id = db
            .people()
            .save(&Person {
                document: Some(cpf(123456789)),
                ..person("Carlos Souza")
            })
            .await
            .unwrap();

        let partner_id = db
            .partners()
            .save(&partner(partner_person_id, "DLR-01"))
            .await
            .unwrap();
        let seller_id = db
            .sellers()
            .save(&Seller {
                partner_id: Some(partner_id),
                user_id: Some(seller_user_id),
                ..seller(seller_person_id, "SLR-01")
            })
            .await
            .unwrap();

        let brand_id = db
            .brands()
            .save(&Brand {
                id: 0,
                name: "Volvo".to_string(),
            })
            .await
            .unwrap();
        let model_id = db
            .models()
            .save(&model(brand_id, "FH 540", "FH540"))
            .await
            .unwrap();
        let vehicle_id = db.vehicles().save(&vehicle(model_id, 1)).await.unwrap();

        let product_id = db
            .products()
            .save(&product("FH 540 6x4", "P-FH540"))
            .await
            .unwrap();
        db.products().add_model(product_id, model_id).await.unwrap();

        let price_list_id = db
            .price_lists()
            .save(&price_list("Tabela 2024", Some(partner_id), date(2024, 1, 1)))
            .await
            .unwrap();
        let price_product_id = db
            .price_products()
            .save(&PriceProduct {
                id: 0,
                price_list_id,
                product_id,
                price_cents: FH_PRICE,
            })
            .await
            .unwrap();

        let silva_lead_id = db
            .leads()
            .save(&lead("Renovação de frota", Some(silva_id), Some(seller_id)))
            .await
            .unwrap();
        let agro_lead_id = db
            .leads()
            .save(&Lead {
                source: LeadSource::Event,
                ..lead("Feira Agrishow", Some(agro_id), Some(seller_id))
            })
            .await
            .unwrap();

        let p1_id = db
            .proposals()
            .save(&proposal(silva_lead_id, seller_user_id, ProposalStatus::PendingApproval))
            .await
            .unwrap();
        let p1_detail_id = db
            .proposal_details()
            .save(&detail(p1_id, seller_id, Some(partner_id), SaleChannel::Dealer))
            .await
            .unwrap();
        let p1_line_id = db
            .proposal_vehicles()
            .save(&ProposalDetailVehicle {
                discount_cents: 1_000_000,
                ..line(p1_detail_id, model_id, price_product_id, 2, FH_PRICE)
            })
            .await
            .unwrap();

        let p2_id = db
            .proposals()
            .save(&proposal(agro_lead_id, seller_user_id, ProposalStatus::PendingApproval))
            .await
            .unwrap();
        let p2_detail_id = db
            .proposal_details()
            .save(&detail(p2_id, seller_id, None, SaleChannel::Direct))
            .await
            .unwrap();
        let p2_line_id = db
            .proposal_vehicles()
            .save(&ProposalDetailVehicle {
                vehicle_id: Some(vehicle_id),
                ..line(p2_detail_id, model_id, price_product_id, 1, FH_PRICE)
            })
            .await
            .unwrap();

        let p3_id = db
            .proposals()
            .save(&proposal(silva_lead_id, admin_id, ProposalStatus::Draft))
            .await
            .unwrap();

        Graph {
            holding_id,
            silva_id,
            agro_id,
            admin_id,
            approver_id,
            seller_user_id,
            partner_person_id,
            seller_person_id,
            partner_id,
            seller_id,
            brand_id,
            model_id,
            vehicle_id,
            product_id,
            price_list_id,
            price_product_id,
            silva_lead_id,
            agro_lead_id,
            p1_id,
            p2_id,
            p3_id,
            p1_detail_id,
            p2_detail_id,
            p1_line_id,
            p2_line_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::validation::validate_document;

    #[test]
    fn test_generated_documents_are_valid() {
        assert_eq!(cpf(529982247), "52998224725");
        assert_eq!(cnpj(112223330001), "11222333000181");
        for n in [123456789, 987654321, 100200300] {
            assert!(validate_document(&cpf(n)).is_ok());
        }
        for n in [223334440001, 334445550001, 998877660001] {
            assert!(validate_document(&cnpj(n)).is_ok());
        }
    }
}
