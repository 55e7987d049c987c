//! Commercial flow: leads, proposals (and their details and vehicle lines),
//! approvals and sales.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ApprovalDecision, LeadSource, LeadStatus, ProposalStatus, SaleChannel};
use crate::money::Money;
use crate::validation::{
    validate_cents, validate_email, validate_optional, validate_quantity, validate_reference,
    validate_required, ValidationResult,
};
use crate::ValidationError;

// =============================================================================
// Lead
// =============================================================================

/// A sales opportunity before (and while) proposals are made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Lead {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 120)?;
        validate_email(self.email.as_deref())?;
        validate_optional("phone", self.phone.as_deref(), 20)?;
        validate_optional("notes", self.notes.as_deref(), 2000)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeadFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub customer_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    #[ts(as = "Option<String>")]
    pub created_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub created_until: Option<NaiveDate>,
}

// =============================================================================
// Proposal
// =============================================================================

/// Commercial proposal made against a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Proposal {
    pub id: i64,
    pub lead_id: i64,
    /// Human-facing code, generated on save when blank (`PRP-XXXXXXXX`).
    pub code: String,
    pub status: ProposalStatus,
    /// User that created the proposal.
    pub created_by: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("lead_id", self.lead_id)?;
        validate_reference("created_by", self.created_by)?;
        validate_optional("code", Some(self.code.as_str()), 20)?;
        validate_optional("notes", self.notes.as_deref(), 2000)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProposalFilter {
    pub code: Option<String>,
    pub lead_id: Option<i64>,
    pub status: Option<ProposalStatus>,
    pub created_by: Option<i64>,
    #[ts(as = "Option<String>")]
    pub created_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub created_until: Option<NaiveDate>,
}

// =============================================================================
// Proposal Detail
// =============================================================================

/// Commercial conditions of a proposal: who sells, through which channel and
/// (optionally) which partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProposalDetail {
    pub id: i64,
    pub proposal_id: i64,
    pub seller_id: i64,
    pub partner_id: Option<i64>,
    pub channel: SaleChannel,
    pub notes: Option<String>,
}

impl ProposalDetail {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("proposal_id", self.proposal_id)?;
        validate_reference("seller_id", self.seller_id)?;
        if self.channel == SaleChannel::Dealer && self.partner_id.is_none() {
            return Err(ValidationError::required("partner_id"));
        }
        validate_optional("notes", self.notes.as_deref(), 2000)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProposalDetailFilter {
    pub proposal_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub channel: Option<SaleChannel>,
}

// =============================================================================
// Proposal Detail Vehicle
// =============================================================================

/// A priced vehicle line of a proposal detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProposalDetailVehicle {
    pub id: i64,
    pub proposal_detail_id: i64,
    pub model_id: i64,
    /// Specific stock unit, when one is already reserved.
    pub vehicle_id: Option<i64>,
    pub price_product_id: i64,
    pub quantity: i64,
    /// Unit price copied from the price product at quoting time.
    pub price_cents: i64,
    /// Discount over the whole line.
    pub discount_cents: i64,
}

impl ProposalDetailVehicle {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("proposal_detail_id", self.proposal_detail_id)?;
        validate_reference("model_id", self.model_id)?;
        validate_reference("price_product_id", self.price_product_id)?;
        validate_quantity(self.quantity)?;
        validate_cents("price", self.price_cents)?;
        validate_cents("discount", self.discount_cents)?;
        if self.vehicle_id.is_some() && self.quantity != 1 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: 1,
            });
        }
        let gross = Money::from_cents(self.price_cents)
            .checked_mul(self.quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "price".to_string(),
                min: 0,
                max: i64::MAX / self.quantity,
            })?;
        if self.discount_cents > gross.cents() {
            return Err(ValidationError::InvalidRange {
                first: "discount".to_string(),
                second: "line total".to_string(),
            });
        }
        Ok(())
    }

    /// `price × quantity − discount`, never below zero. Saturates on lines
    /// that fail [`validate`](Self::validate).
    pub fn total(&self) -> Money {
        Money::from_cents(self.price_cents)
            .checked_mul(self.quantity)
            .and_then(|gross| gross.checked_sub(Money::from_cents(self.discount_cents)))
            .unwrap_or_else(|| {
                Money::from_cents(self.price_cents) * self.quantity
                    - Money::from_cents(self.discount_cents)
            })
            .non_negative()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProposalDetailVehicleFilter {
    pub proposal_detail_id: Option<i64>,
    pub model_id: Option<i64>,
    pub vehicle_id: Option<i64>,
}

// =============================================================================
// Approval
// =============================================================================

/// One approve/reject decision taken on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProposalApproval {
    pub id: i64,
    pub proposal_id: i64,
    pub user_id: i64,
    pub decision: ApprovalDecision,
    pub comment: Option<String>,
    #[ts(as = "String")]
    pub decided_at: DateTime<Utc>,
}

/// Row of the approval work list: one proposal with the names and totals
/// gathered across its detail, vehicle lines, price list and partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ApprovalRow {
    pub proposal_id: i64,
    pub code: String,
    pub status: ProposalStatus,
    pub lead_name: String,
    pub customer_name: Option<String>,
    pub partner_name: Option<String>,
    pub seller_name: Option<String>,
    pub price_list_name: Option<String>,
    pub vehicle_count: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ApprovalRow {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Filter for the approval work list. `status` defaults to pending approval.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApprovalFilter {
    pub status: Option<ProposalStatus>,
    pub partner_id: Option<i64>,
    pub customer_name: Option<String>,
    pub code: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A closed sale, usually born from a won proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub proposal_id: Option<i64>,
    pub customer_id: i64,
    pub seller_id: Option<i64>,
    pub invoice_number: Option<String>,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("customer_id", self.customer_id)?;
        validate_cents("total", self.total_cents)?;
        validate_optional("invoice_number", self.invoice_number.as_deref(), 30)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    pub proposal_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub invoice_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub sold_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub sold_until: Option<NaiveDate>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> ProposalDetailVehicle {
        ProposalDetailVehicle {
            id: 0,
            proposal_detail_id: 1,
            model_id: 1,
            vehicle_id: None,
            price_product_id: 1,
            quantity: 3,
            price_cents: 50_000_000,
            discount_cents: 1_500_000,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line().total().cents(), 148_500_000);
    }

    #[test]
    fn test_line_validation() {
        assert!(line().validate().is_ok());

        let reserved = ProposalDetailVehicle {
            vehicle_id: Some(9),
            ..line()
        };
        assert!(reserved.validate().is_err());

        let over_discount = ProposalDetailVehicle {
            discount_cents: 150_000_001,
            ..line()
        };
        assert!(over_discount.validate().is_err());

        let zero_qty = ProposalDetailVehicle {
            quantity: 0,
            ..line()
        };
        assert!(zero_qty.validate().is_err());
    }

    #[test]
    fn test_line_overflow_is_rejected() {
        let huge = ProposalDetailVehicle {
            price_cents: i64::MAX / 2,
            quantity: 3,
            discount_cents: 0,
            ..line()
        };
        assert!(matches!(
            huge.validate(),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "price"
        ));
        assert_eq!(huge.total().cents(), i64::MAX);

        let fits = ProposalDetailVehicle {
            quantity: 2,
            ..huge
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn test_dealer_channel_needs_partner() {
        let detail = ProposalDetail {
            id: 0,
            proposal_id: 1,
            seller_id: 1,
            partner_id: None,
            channel: SaleChannel::Dealer,
            notes: None,
        };
        assert_eq!(detail.validate(), Err(ValidationError::required("partner_id")));

        let direct = ProposalDetail {
            channel: SaleChannel::Direct,
            ..detail
        };
        assert!(direct.validate().is_ok());
    }
}
