//! Parties: holdings, customers, people, users, partners and sellers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{PartnerType, PersonType, Profile};
use crate::validation::{
    normalize_document, validate_document, validate_email, validate_optional, validate_reference,
    validate_required, ValidationResult,
};

// =============================================================================
// Holding
// =============================================================================

/// Economic group owning one or more customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Holding {
    pub id: i64,
    pub name: String,
    /// CNPJ, digits only once saved.
    pub document: String,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        validate_document(&self.document)
    }

    /// Copy with the document reduced to digits, as stored.
    pub fn normalized(&self) -> Self {
        Holding {
            document: normalize_document(&self.document),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HoldingFilter {
    pub name: Option<String>,
    pub document: Option<String>,
    pub active: Option<bool>,
}

// =============================================================================
// Customer
// =============================================================================

/// A company or person buying vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub holding_id: Option<i64>,
    pub name: String,
    /// CPF or CNPJ, digits only once saved.
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    /// Two-letter UF.
    pub state: Option<String>,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        validate_document(&self.document)?;
        validate_email(self.email.as_deref())?;
        validate_optional("phone", self.phone.as_deref(), 20)?;
        validate_optional("city", self.city.as_deref(), 80)?;
        validate_optional("state", self.state.as_deref(), 2)?;
        if let Some(holding_id) = self.holding_id {
            validate_reference("holding_id", holding_id)?;
        }
        Ok(())
    }

    pub fn normalized(&self) -> Self {
        Customer {
            document: normalize_document(&self.document),
            state: self.state.as_ref().map(|s| s.trim().to_uppercase()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerFilter {
    pub name: Option<String>,
    pub document: Option<String>,
    pub holding_id: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub active: Option<bool>,
}

// =============================================================================
// Person
// =============================================================================

/// Registry of natural and legal persons behind users, partners and sellers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub document: Option<String>,
    pub person_type: PersonType,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Person {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        if let Some(document) = self.document.as_deref() {
            validate_document(document)?;
        }
        validate_email(self.email.as_deref())?;
        validate_optional("phone", self.phone.as_deref(), 20)
    }

    pub fn normalized(&self) -> Self {
        Person {
            document: self.document.as_deref().map(normalize_document),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PersonFilter {
    pub name: Option<String>,
    pub document: Option<String>,
    pub person_type: Option<PersonType>,
    pub email: Option<String>,
}

// =============================================================================
// User
// =============================================================================

/// Application user. Credentials live with the authentication service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub person_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub profile: Profile,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("username", &self.username, 60)?;
        validate_required("email", &self.email, 120)?;
        validate_email(Some(&self.email))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile: Option<Profile>,
    pub active: Option<bool>,
}

// =============================================================================
// Partner
// =============================================================================

/// Dealer, implementer or distributor that sells on behalf of the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Partner {
    pub id: i64,
    pub person_id: i64,
    pub code: String,
    pub partner_type: PartnerType,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Partner {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("person_id", self.person_id)?;
        validate_required("code", &self.code, 20)
    }
}

/// `name` matches the partner's person name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartnerFilter {
    pub code: Option<String>,
    pub name: Option<String>,
    pub partner_type: Option<PartnerType>,
    pub active: Option<bool>,
}

// =============================================================================
// Seller
// =============================================================================

/// Sales representative, optionally attached to a partner and a login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Seller {
    pub id: i64,
    pub person_id: i64,
    pub partner_id: Option<i64>,
    pub user_id: Option<i64>,
    pub code: String,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Seller {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("person_id", self.person_id)?;
        validate_required("code", &self.code, 20)
    }
}

/// `name` matches the seller's person name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SellerFilter {
    pub code: Option<String>,
    pub name: Option<String>,
    pub partner_id: Option<i64>,
    pub active: Option<bool>,
}

// =============================================================================
// Unit Tests
// =============================================================================
