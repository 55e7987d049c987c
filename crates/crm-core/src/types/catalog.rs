//! Catalog: brands, models, vehicles, items, products and pricing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ItemType, VehicleStatus};
use crate::money::Money;
use crate::validation::{
    validate_cents, validate_chassis, validate_optional, validate_plate, validate_reference,
    validate_required, validate_window, validate_year, ValidationResult,
};

// =============================================================================
// Brand / Model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

impl Brand {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 60)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BrandFilter {
    pub name: Option<String>,
}

/// A vehicle model of a brand (e.g. "Actros 2651").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Model {
    pub id: i64,
    pub brand_id: i64,
    pub name: String,
    pub code: String,
    pub active: bool,
}

impl Model {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("brand_id", self.brand_id)?;
        validate_required("name", &self.name, 80)?;
        validate_required("code", &self.code, 30)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ModelFilter {
    pub name: Option<String>,
    pub code: Option<String>,
    pub brand_id: Option<i64>,
    pub active: Option<bool>,
}

// =============================================================================
// Vehicle
// =============================================================================

/// A physical unit in stock, identified by its chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vehicle {
    pub id: i64,
    pub model_id: i64,
    pub chassis: String,
    pub plate: Option<String>,
    pub color: Option<String>,
    pub model_year: i32,
    pub manufacture_year: i32,
    pub status: VehicleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("model_id", self.model_id)?;
        validate_chassis(&self.chassis)?;
        if let Some(plate) = self.plate.as_deref() {
            validate_plate(plate)?;
        }
        validate_optional("color", self.color.as_deref(), 30)?;
        validate_year("model_year", self.model_year)?;
        validate_year("manufacture_year", self.manufacture_year)?;
        // model year may run one ahead of manufacture year, never behind
        if self.model_year < self.manufacture_year || self.model_year > self.manufacture_year + 1 {
            return Err(crate::ValidationError::InvalidRange {
                first: "manufacture_year".to_string(),
                second: "model_year".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VehicleFilter {
    pub chassis: Option<String>,
    pub plate: Option<String>,
    pub model_id: Option<i64>,
    pub status: Option<VehicleStatus>,
    pub model_year: Option<i32>,
}

// =============================================================================
// Item / ItemModel
// =============================================================================

/// Accessory, service or implement that can be fitted to some models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub item_type: ItemType,
    pub active: bool,
}

impl Item {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        validate_required("code", &self.code, 30)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemFilter {
    pub name: Option<String>,
    pub code: Option<String>,
    pub item_type: Option<ItemType>,
    /// Only items compatible with this model.
    pub model_id: Option<i64>,
    pub active: Option<bool>,
}

/// Compatibility link between an item and a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemModel {
    pub item_id: i64,
    pub model_id: i64,
}

// =============================================================================
// Product / ProductModel
// =============================================================================

/// A sellable offer (vehicle package) priced in price lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub active: bool,
}

impl Product {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        validate_required("code", &self.code, 30)?;
        validate_optional("description", self.description.as_deref(), 500)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub code: Option<String>,
    /// Only products offered for this model.
    pub model_id: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductModel {
    pub product_id: i64,
    pub model_id: i64,
}

// =============================================================================
// Price List / Price Product
// =============================================================================

/// A dated price table, global (`partner_id = None`) or partner-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceList {
    pub id: i64,
    pub partner_id: Option<i64>,
    pub name: String,
    #[ts(as = "String")]
    pub valid_from: NaiveDate,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
    pub active: bool,
}

impl PriceList {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 80)?;
        validate_window(self.valid_from, self.valid_until)
    }

    /// Whether the list is in force on `date` (inclusive bounds).
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.active && self.valid_from <= date && self.valid_until.map_or(true, |u| date <= u)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceListFilter {
    pub name: Option<String>,
    pub partner_id: Option<i64>,
    pub active: Option<bool>,
    /// Lists whose validity window contains this date.
    #[ts(as = "Option<String>")]
    pub valid_on: Option<NaiveDate>,
}

/// Price of one product inside one price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceProduct {
    pub id: i64,
    pub price_list_id: i64,
    pub product_id: i64,
    pub price_cents: i64,
}

impl PriceProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("price_list_id", self.price_list_id)?;
        validate_reference("product_id", self.product_id)?;
        validate_cents("price", self.price_cents)
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceProductFilter {
    pub price_list_id: Option<i64>,
    pub product_id: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
