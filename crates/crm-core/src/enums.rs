//! # Classifier Enums
//!
//! Status and type columns across the schema used to point at the generic
//! `classifier` table (`type`, `value`, `label`). Here every classifier type
//! is a closed sum type. The stored text is the variant's `value`; the
//! classifier table still holds one row per variant so display labels can be
//! resolved, and `crm-db` tests check both sides stay in step.
//!
//! ```text
//! classifier                                   Rust
//! ┌──────────────────┬──────────────────┐     ┌─────────────────────────────┐
//! │ type             │ value            │     │ ProposalStatus::            │
//! ├──────────────────┼──────────────────┤     │   PendingApproval           │
//! │ proposal_status  │ pending_approval │ ◄──►│   .as_str()                 │
//! └──────────────────┴──────────────────┘     └─────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;

/// Declares a classifier-backed enum.
///
/// Generates the enum with serde/sqlx/ts renames bound to the stored value,
/// plus `CLASSIFIER_TYPE`, `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! classifier_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $classifier:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[ts(export)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $value))]
                $variant,
            )+
        }

        impl $name {
            /// `classifier.type` holding the labels for this enum.
            pub const CLASSIFIER_TYPE: &'static str = $classifier;

            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored value (`classifier.value`).
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(CoreError::UnknownClassifier {
                        classifier: $classifier.to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

classifier_enum! {
    /// Natural person (CPF) or company (CNPJ).
    PersonType: "person_type" {
        Individual => "individual",
        Company => "company",
    }
}

classifier_enum! {
    /// Access profile of an application user. Drives proposal visibility and
    /// the menu tree.
    Profile: "profile" {
        Admin => "admin",
        Manager => "manager",
        Approver => "approver",
        Seller => "seller",
    }
}

impl Profile {
    /// Whether users with this profile may approve or reject proposals.
    pub const fn can_decide(&self) -> bool {
        !matches!(self, Profile::Seller)
    }
}

classifier_enum! {
    PartnerType: "partner_type" {
        Dealer => "dealer",
        Implementer => "implementer",
        Distributor => "distributor",
    }
}

classifier_enum! {
    /// Stock state of a physical vehicle.
    VehicleStatus: "vehicle_status" {
        Available => "available",
        Reserved => "reserved",
        Sold => "sold",
    }
}

classifier_enum! {
    ItemType: "item_type" {
        Accessory => "accessory",
        Service => "service",
        Implement => "implement",
    }
}

classifier_enum! {
    /// Where a lead came from.
    LeadSource: "lead_source" {
        Website => "website",
        Referral => "referral",
        Event => "event",
        Phone => "phone",
        WalkIn => "walk_in",
    }
}

classifier_enum! {
    LeadStatus: "lead_status" {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Converted => "converted",
        Lost => "lost",
    }
}

classifier_enum! {
    /// Proposal lifecycle.
    ///
    /// ```text
    /// Draft ──► PendingApproval ──┬──► Approved ──┬──► Won
    ///   │             │           │               └──► Lost
    ///   │             │           └──► Rejected ──► Draft (rework)
    ///   └─────────────┴──► Cancelled
    /// ```
    ProposalStatus: "proposal_status" {
        Draft => "draft",
        PendingApproval => "pending_approval",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
        Won => "won",
        Lost => "lost",
    }
}

impl ProposalStatus {
    /// Allowed status moves. Anything else is refused by the repository.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Draft, PendingApproval)
                | (Draft, Cancelled)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (PendingApproval, Cancelled)
                | (Rejected, Draft)
                | (Approved, Won)
                | (Approved, Lost)
                | (Approved, Cancelled)
        )
    }

    /// Terminal states never change again.
    pub const fn is_closed(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Cancelled | ProposalStatus::Won | ProposalStatus::Lost
        )
    }
}

classifier_enum! {
    /// Commercial channel of a proposal detail.
    SaleChannel: "sale_channel" {
        Direct => "direct",
        Dealer => "dealer",
        Fleet => "fleet",
        Online => "online",
    }
}

classifier_enum! {
    /// Entity a stored document is attached to.
    DocumentOwner: "document_owner" {
        Customer => "customer",
        Lead => "lead",
        Proposal => "proposal",
        Sale => "sale",
    }
}

classifier_enum! {
    AuditAction: "audit_action" {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Approve => "approve",
        Reject => "reject",
    }
}

classifier_enum! {
    ApprovalDecision: "approval_decision" {
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl ApprovalDecision {
    /// Proposal status reached by this decision.
    pub const fn target_status(&self) -> ProposalStatus {
        match self {
            ApprovalDecision::Approved => ProposalStatus::Approved,
            ApprovalDecision::Rejected => ProposalStatus::Rejected,
        }
    }

    pub const fn audit_action(&self) -> AuditAction {
        match self {
            ApprovalDecision::Approved => AuditAction::Approve,
            ApprovalDecision::Rejected => AuditAction::Reject,
        }
    }
}

/// Every classifier type with its stored values, for seeding and checks.
pub fn classifier_catalog() -> Vec<(&'static str, Vec<&'static str>)> {
    fn values<T: Copy>(all: &[T], f: fn(&T) -> &'static str) -> Vec<&'static str> {
        all.iter().map(f).collect()
    }

    vec![
        (PersonType::CLASSIFIER_TYPE, values(PersonType::ALL, PersonType::as_str)),
        (Profile::CLASSIFIER_TYPE, values(Profile::ALL, Profile::as_str)),
        (PartnerType::CLASSIFIER_TYPE, values(PartnerType::ALL, PartnerType::as_str)),
        (VehicleStatus::CLASSIFIER_TYPE, values(VehicleStatus::ALL, VehicleStatus::as_str)),
        (ItemType::CLASSIFIER_TYPE, values(ItemType::ALL, ItemType::as_str)),
        (LeadSource::CLASSIFIER_TYPE, values(LeadSource::ALL, LeadSource::as_str)),
        (LeadStatus::CLASSIFIER_TYPE, values(LeadStatus::ALL, LeadStatus::as_str)),
        (ProposalStatus::CLASSIFIER_TYPE, values(ProposalStatus::ALL, ProposalStatus::as_str)),
        (SaleChannel::CLASSIFIER_TYPE, values(SaleChannel::ALL, SaleChannel::as_str)),
        (DocumentOwner::CLASSIFIER_TYPE, values(DocumentOwner::ALL, DocumentOwner::as_str)),
        (AuditAction::CLASSIFIER_TYPE, values(AuditAction::ALL, AuditAction::as_str)),
        (ApprovalDecision::CLASSIFIER_TYPE, values(ApprovalDecision::ALL, ApprovalDecision::as_str)),
    ]
}

// =============================================================================
// Unit Tests
// =============================================================================
