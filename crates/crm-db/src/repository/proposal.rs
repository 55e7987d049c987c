//! # Proposal Repository
//!
//! Commercial proposals for a lead. Status moves go through
//! [`ProposalRepository::update_status`], which enforces the lifecycle in
//! [`ProposalStatus::can_transition_to`]; approvals and rejections are
//! recorded by the approval repository instead.
//!
//! A proposal saved with a blank code gets a generated `PRP-XXXXXXXX` one.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crm_core::{Direction, Page, Pageable, Proposal, ProposalDetail, ProposalFilter, ProposalStatus};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::{DbError, DbResult};
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT p.* FROM proposal p",
    "SELECT COUNT(*) FROM proposal p",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("code", "p.code"),
        ("status", "p.status"),
        ("createdAt", "p.created_at"),
        ("updatedAt", "p.updated_at"),
    ],
    default: ("p.created_at", Direction::Desc),
    tie_breaker: "p.id",
};

pub(crate) fn generate_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("PRP-{}", id[..8].to_uppercase())
}

#[derive(Debug, Clone)]
pub struct ProposalRepository {
    base: RepositoryBase,
}

impl ProposalRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ProposalRepository { base }
    }

    pub async fn find(
        &self,
        filter: &ProposalFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Proposal>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "proposal.find")
    }

    pub async fn search(
        &self,
        filter: &ProposalFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Proposal>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "proposal.search")
    }

    async fn query(
        &self,
        filter: &ProposalFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Proposal>> {
        debug!(?filter, ?mode, "Querying proposals");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("p.code", filter.code.as_deref(), mode)
                .eq("p.lead_id", filter.lead_id)
                .eq("p.status", filter.status)
                .eq("p.created_by", filter.created_by)
                .on_or_after("p.created_at", filter.created_from)
                .on_or_before("p.created_at", filter.created_until);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Proposal>> {
        sqlx::query_as::<_, Proposal>("SELECT * FROM proposal WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "proposal.get")
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Proposal>> {
        sqlx::query_as::<_, Proposal>("SELECT * FROM proposal WHERE code = ?")
            .bind(code.trim())
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "proposal.get")
    }

    /// Inserts a proposal; a blank code is replaced by a generated one.
    pub async fn save(&self, proposal: &Proposal) -> DbResult<i64> {
        proposal.validate().in_operation(&self.base, "proposal.save")?;

        let code = match proposal.code.trim() {
            "" => generate_code(),
            given => given.to_string(),
        };

        debug!(%code, lead_id = proposal.lead_id, "Saving proposal");

        let result = sqlx::query(
            r#"
            INSERT INTO proposal (lead_id, code, status, created_by, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(proposal.lead_id)
        .bind(&code)
        .bind(proposal.status)
        .bind(proposal.created_by)
        .bind(&proposal.notes)
        .bind(proposal.created_at)
        .bind(proposal.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal.save")?;

        Ok(result.last_insert_rowid())
    }

    /// Updates lead, code and notes. The status is left alone; a blank code
    /// keeps the stored one.
    pub async fn update(&self, proposal: &Proposal) -> DbResult<()> {
        proposal.validate().in_operation(&self.base, "proposal.update")?;

        debug!(id = proposal.id, "Updating proposal");

        let result = sqlx::query(
            r#"
            UPDATE proposal SET
                lead_id = ?, code = COALESCE(NULLIF(?, ''), code), notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(proposal.lead_id)
        .bind(proposal.code.trim())
        .bind(&proposal.notes)
        .bind(Utc::now())
        .bind(proposal.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal.update")?;

        expect_row(result.rows_affected(), "proposal", proposal.id)
            .in_operation(&self.base, "proposal.update")
    }

    /// Moves the proposal to `next` when the lifecycle allows it.
    ///
    /// `Approved` and `Rejected` are refused here: those moves are recorded
    /// by [`ProposalApprovalRepository::decide`](super::ProposalApprovalRepository::decide)
    /// together with the approval row and audit entry.
    ///
    /// The update is conditional on the status read, so a concurrent move
    /// makes this call fail with `InvalidState` instead of overwriting it.
    pub async fn update_status(&self, id: i64, next: ProposalStatus) -> DbResult<()> {
        if matches!(next, ProposalStatus::Approved | ProposalStatus::Rejected) {
            warn!(id, %next, "Refused status change outside the approval flow");
            return Err(DbError::invalid_state(
                "proposal",
                id,
                format!("{} is only reachable through an approval decision", next),
            ))
            .in_operation(&self.base, "proposal.status");
        }

        let current: Option<ProposalStatus> =
            sqlx::query_scalar("SELECT status FROM proposal WHERE id = ?")
                .bind(id)
                .fetch_optional(self.base.pool())
                .await
                .in_operation(&self.base, "proposal.status")?;

        let current = current
            .ok_or_else(|| DbError::not_found("proposal", id))
            .in_operation(&self.base, "proposal.status")?;

        if !current.can_transition_to(next) {
            warn!(id, %current, %next, "Refused proposal status change");
            return Err(DbError::invalid_state(
                "proposal",
                id,
                format!("cannot move from {} to {}", current, next),
            ))
            .in_operation(&self.base, "proposal.status");
        }

        info!(id, %current, %next, "Updating proposal status");

        let result = sqlx::query(
            "UPDATE proposal SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(next)
        .bind(Utc::now())
        .bind(id)
        .bind(current)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal.status")?;

        if result.rows_affected() == 0 {
            return Err(DbError::invalid_state(
                "proposal",
                id,
                "status changed concurrently",
            ))
            .in_operation(&self.base, "proposal.status");
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting proposal");

        let result = sqlx::query("DELETE FROM proposal WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "proposal.delete")?;

        expect_row(result.rows_affected(), "proposal", id)
            .in_operation(&self.base, "proposal.delete")
    }

    /// Details of a proposal in insertion order.
    pub async fn details(&self, proposal_id: i64) -> DbResult<Vec<ProposalDetail>> {
        sqlx::query_as::<_, ProposalDetail>(
            "SELECT * FROM proposal_detail WHERE proposal_id = ? ORDER BY id",
        )
        .bind(proposal_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_detail.list")
    }

    pub async fn has_detail_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM proposal_detail WHERE proposal_id = ?)", id)
            .await
            .in_operation(&self.base, "proposal.relationship")
    }

    pub async fn has_sale_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM sale WHERE proposal_id = ?)", id)
            .await
            .in_operation(&self.base, "proposal.relationship")
    }
}
