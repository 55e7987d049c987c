//! # Proposal Approval Repository
//!
//! The approval queue and the decisions taken on it.
//!
//! ## Query Graph
//! ```text
//! ┌──────────┐   ┌──────┐   ┌──────────┐
//! │ proposal │──►│ lead │──►│ customer │◄── user_customer (approver portfolio)
//! └────┬─────┘   └──────┘   └──────────┘
//!      │
//!      ▼
//! ┌─────────────────┐   ┌────────┐   ┌────────┐
//! │ proposal_detail │──►│ seller │──►│ person │   seller_name; seller.user_id
//! └────┬────────────┘   └────────┘   └────────┘   gates the Seller profile
//!      │
//!      ▼
//! ┌─────────────────────────┐   ┌───────────────┐   ┌────────────┐
//! │ proposal_detail_vehicle │──►│ price_product │──►│ price_list │
//! └─────────────────────────┘   └───────────────┘   └─────┬──────┘
//!                                                         ▼
//!                              ┌─────────┐   ┌────────┐
//!                              │ partner │──►│ person │   partner_name
//!                              └─────────┘   └────────┘
//! ```
//!
//! One [`ApprovalRow`] per proposal: line totals and quantities are summed,
//! the partner is the detail's own partner or else the price list's.
//!
//! ## Visibility
//! | Profile            | Sees                                                 |
//! |--------------------|------------------------------------------------------|
//! | Admin              | every proposal                                       |
//! | Approver / Manager | proposals whose lead customer is in their portfolio  |
//! | Seller             | proposals with a detail sold by the user's seller    |
//! | inactive / unknown | nothing                                              |

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crm_core::{
    ApprovalDecision, ApprovalFilter, ApprovalRow, Audit, Direction, Page, Pageable, Profile,
    ProposalApproval, ProposalStatus,
};

use super::audit::{self, payload_of};
use super::{InOperation, RepositoryBase};
use crate::error::{DbError, DbResult};
use crate::query::{fetch_page, Conditions, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    r#"
    SELECT
        p.id AS proposal_id,
        p.code,
        p.status,
        l.name AS lead_name,
        c.name AS customer_name,
        MIN(pa_pe.name) AS partner_name,
        MIN(s_pe.name) AS seller_name,
        MIN(pl.name) AS price_list_name,
        COALESCE(SUM(v.quantity), 0) AS vehicle_count,
        COALESCE(SUM(MAX(v.price_cents * v.quantity - v.discount_cents, 0)), 0) AS total_cents,
        p.created_at
    FROM proposal p
    INNER JOIN lead l ON l.id = p.lead_id
    LEFT JOIN customer c ON c.id = l.customer_id
    LEFT JOIN proposal_detail d ON d.proposal_id = p.id
    LEFT JOIN seller s ON s.id = d.seller_id
    LEFT JOIN person s_pe ON s_pe.id = s.person_id
    LEFT JOIN proposal_detail_vehicle v ON v.proposal_detail_id = d.id
    LEFT JOIN price_product pp ON pp.id = v.price_product_id
    LEFT JOIN price_list pl ON pl.id = pp.price_list_id
    LEFT JOIN partner pa ON pa.id = COALESCE(d.partner_id, pl.partner_id)
    LEFT JOIN person pa_pe ON pa_pe.id = pa.person_id
    "#,
    r#"
    SELECT COUNT(*)
    FROM proposal p
    INNER JOIN lead l ON l.id = p.lead_id
    LEFT JOIN customer c ON c.id = l.customer_id
    "#,
)
.grouped("GROUP BY p.id");

const SORT: SortSpec = SortSpec {
    columns: &[
        ("code", "p.code"),
        ("customerName", "c.name"),
        ("leadName", "l.name"),
        ("total", "total_cents"),
        ("createdAt", "p.created_at"),
    ],
    default: ("p.created_at", Direction::Asc),
    tie_breaker: "p.id",
};

/// Proposals reached through the partner of a detail or of a priced line.
const PARTNER_PREDICATE: &str = r#"p.id IN (
        SELECT d2.proposal_id FROM proposal_detail d2
        LEFT JOIN proposal_detail_vehicle v2 ON v2.proposal_detail_id = d2.id
        LEFT JOIN price_product pp2 ON pp2.id = v2.price_product_id
        LEFT JOIN price_list pl2 ON pl2.id = pp2.price_list_id
        WHERE COALESCE(d2.partner_id, pl2.partner_id) = "#;

const PORTFOLIO_PREDICATE: &str =
    "l.customer_id IN (SELECT customer_id FROM user_customer WHERE user_id = ";

const SELLER_PREDICATE: &str = r#"EXISTS (
        SELECT 1 FROM proposal_detail d3
        INNER JOIN seller s3 ON s3.id = d3.seller_id
        WHERE d3.proposal_id = p.id AND s3.user_id = "#;

/// What a user may see of the approval queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    All,
    Portfolio(i64),
    OwnSales(i64),
    Nothing,
}

impl Visibility {
    fn of(user_id: i64, actor: Option<(Profile, bool)>) -> Self {
        match actor {
            Some((_, false)) | None => Visibility::Nothing,
            Some((Profile::Admin, true)) => Visibility::All,
            Some((Profile::Approver | Profile::Manager, true)) => Visibility::Portfolio(user_id),
            Some((Profile::Seller, true)) => Visibility::OwnSales(user_id),
        }
    }

    fn apply(self, c: &mut Conditions<'_, '_>) {
        match self {
            Visibility::All => {}
            Visibility::Portfolio(user_id) => {
                c.bound(PORTFOLIO_PREDICATE, Some(user_id), ")");
            }
            Visibility::OwnSales(user_id) => {
                c.bound(SELLER_PREDICATE, Some(user_id), ")");
            }
            Visibility::Nothing => {
                c.raw("0 = 1");
            }
        }
    }
}

async fn load_actor(conn: &mut SqliteConnection, user_id: i64) -> DbResult<Option<(Profile, bool)>> {
    let actor = sqlx::query_as::<_, (Profile, bool)>("SELECT profile, active FROM user WHERE id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(actor)
}

async fn is_visible(
    conn: &mut SqliteConnection,
    visibility: Visibility,
    proposal_id: i64,
) -> DbResult<bool> {
    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "SELECT EXISTS(SELECT 1 FROM proposal p INNER JOIN lead l ON l.id = p.lead_id",
    );
    {
        let mut c = Conditions::new(&mut qb);
        c.eq("p.id", Some(proposal_id));
        visibility.apply(&mut c);
    }
    qb.push(")");

    let found: i64 = qb.build_query_scalar().fetch_one(conn).await?;
    Ok(found != 0)
}

#[derive(Debug, Serialize)]
struct DecisionPayload<'a> {
    decision: ApprovalDecision,
    from: ProposalStatus,
    to: ProposalStatus,
    comment: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ProposalApprovalRepository {
    base: RepositoryBase,
}

impl ProposalApprovalRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ProposalApprovalRepository { base }
    }

    /// The approval queue as seen by `user_id`.
    ///
    /// Without a status filter only proposals pending approval are listed.
    pub async fn find_for_approval(
        &self,
        user_id: i64,
        filter: &ApprovalFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ApprovalRow>> {
        let mut conn = self
            .base
            .pool()
            .acquire()
            .await
            .in_operation(&self.base, "approval.visibility")?;
        let actor = load_actor(&mut conn, user_id)
            .await
            .in_operation(&self.base, "approval.visibility")?;
        drop(conn);

        let visibility = Visibility::of(user_id, actor);
        if visibility == Visibility::Nothing {
            debug!(user_id, "User sees no proposals");
            return Ok(Page::new(Vec::new(), pageable, 0));
        }

        let status = filter.status.unwrap_or(ProposalStatus::PendingApproval);
        debug!(user_id, ?visibility, ?filter, %status, "Querying approval queue");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("p.status", Some(status))
                .bound(PARTNER_PREDICATE, filter.partner_id, ")")
                .like("c.name", filter.customer_name.as_deref())
                .like("p.code", filter.code.as_deref());
            visibility.apply(c);
        })
        .await
        .in_operation(&self.base, "approval.find")
    }

    /// Whether `user_id` may decide on `proposal_id`: an active non-seller
    /// user who can see the proposal.
    pub async fn can_approve(&self, user_id: i64, proposal_id: i64) -> DbResult<bool> {
        let mut conn = self
            .base
            .pool()
            .acquire()
            .await
            .in_operation(&self.base, "approval.visibility")?;

        let actor = load_actor(&mut conn, user_id)
            .await
            .in_operation(&self.base, "approval.visibility")?;
        if !matches!(actor, Some((profile, true)) if profile.can_decide()) {
            return Ok(false);
        }

        is_visible(&mut conn, Visibility::of(user_id, actor), proposal_id)
            .await
            .in_operation(&self.base, "approval.visibility")
    }

    /// Approves or rejects a pending proposal.
    ///
    /// In one transaction: checks the actor, moves the proposal out of
    /// `PendingApproval`, then writes the `proposal_approval` row and an
    /// audit entry. Fails with `Forbidden` for sellers, inactive users and
    /// proposals outside the user's portfolio, `NotFound` for unknown ids
    /// and `InvalidState` when the proposal is not pending.
    pub async fn decide(
        &self,
        proposal_id: i64,
        user_id: i64,
        decision: ApprovalDecision,
        comment: Option<&str>,
    ) -> DbResult<ProposalApproval> {
        const OP: &str = "approval.decide";

        let mut tx = self.base.pool().begin().await.in_operation(&self.base, OP)?;

        let actor = load_actor(&mut tx, user_id).await.in_operation(&self.base, OP)?;
        let (profile, active) = actor
            .ok_or_else(|| DbError::not_found("user", user_id))
            .in_operation(&self.base, OP)?;

        if !active || !profile.can_decide() {
            warn!(user_id, %profile, active, proposal_id, "Decision refused");
            return Err(DbError::Forbidden {
                user_id,
                action: format!("decide on proposal {}", proposal_id),
            })
            .in_operation(&self.base, OP);
        }

        let current: Option<ProposalStatus> =
            sqlx::query_scalar("SELECT status FROM proposal WHERE id = ?")
                .bind(proposal_id)
                .fetch_optional(&mut *tx)
                .await
                .in_operation(&self.base, OP)?;
        let current = current
            .ok_or_else(|| DbError::not_found("proposal", proposal_id))
            .in_operation(&self.base, OP)?;

        let visible = is_visible(&mut tx, Visibility::of(user_id, actor), proposal_id)
            .await
            .in_operation(&self.base, OP)?;
        if !visible {
            warn!(user_id, proposal_id, "Proposal outside the user's portfolio");
            return Err(DbError::Forbidden {
                user_id,
                action: format!("decide on proposal {}", proposal_id),
            })
            .in_operation(&self.base, OP);
        }

        let target = decision.target_status();
        if current != ProposalStatus::PendingApproval {
            return Err(DbError::invalid_state(
                "proposal",
                proposal_id,
                format!("cannot move from {} to {}", current, target),
            ))
            .in_operation(&self.base, OP);
        }

        let now = Utc::now();
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());

        let moved = sqlx::query(
            "UPDATE proposal SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(target)
        .bind(now)
        .bind(proposal_id)
        .bind(current)
        .execute(&mut *tx)
        .await
        .in_operation(&self.base, OP)?;

        // Dropping `tx` rolls back; nothing has been written yet.
        if moved.rows_affected() == 0 {
            warn!(proposal_id, user_id, "Proposal status changed during decision");
            return Err(DbError::invalid_state(
                "proposal",
                proposal_id,
                "status changed concurrently",
            ))
            .in_operation(&self.base, OP);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO proposal_approval (proposal_id, user_id, decision, comment, decided_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(proposal_id)
        .bind(user_id)
        .bind(decision)
        .bind(comment)
        .bind(now)
        .execute(&mut *tx)
        .await
        .in_operation(&self.base, OP)?;
        let approval_id = result.last_insert_rowid();

        let payload = payload_of(&DecisionPayload {
            decision,
            from: current,
            to: target,
            comment,
        })
        .in_operation(&self.base, OP)?;

        audit::insert(
            &mut tx,
            &Audit {
                id: 0,
                entity: "proposal".to_string(),
                entity_id: proposal_id,
                action: decision.audit_action(),
                user_id: Some(user_id),
                payload: Some(payload),
                created_at: now,
            },
        )
        .await
        .in_operation(&self.base, OP)?;

        tx.commit().await.in_operation(&self.base, OP)?;

        info!(proposal_id, user_id, %decision, "Proposal decided");

        Ok(ProposalApproval {
            id: approval_id,
            proposal_id,
            user_id,
            decision,
            comment: comment.map(str::to_string),
            decided_at: now,
        })
    }

    /// Decisions taken on a proposal, oldest first.
    pub async fn history(&self, proposal_id: i64) -> DbResult<Vec<ProposalApproval>> {
        sqlx::query_as::<_, ProposalApproval>(
            "SELECT * FROM proposal_approval WHERE proposal_id = ? ORDER BY decided_at, id",
        )
        .bind(proposal_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "approval.history")
    }
}
