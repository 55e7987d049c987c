//! Proposal details: one seller/channel section of a proposal.

use tracing::debug;

use crm_core::{Direction, Page, Pageable, ProposalDetail, ProposalDetailFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT d.* FROM proposal_detail d",
    "SELECT COUNT(*) FROM proposal_detail d",
);

const SORT: SortSpec = SortSpec {
    columns: &[("channel", "d.channel"), ("proposalId", "d.proposal_id")],
    default: ("d.id", Direction::Asc),
    tie_breaker: "d.id",
};

#[derive(Debug, Clone)]
pub struct ProposalDetailRepository {
    base: RepositoryBase,
}

impl ProposalDetailRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ProposalDetailRepository { base }
    }

    pub async fn find(
        &self,
        filter: &ProposalDetailFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetail>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "proposal_detail.find")
    }

    pub async fn search(
        &self,
        filter: &ProposalDetailFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetail>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "proposal_detail.search")
    }

    async fn query(
        &self,
        filter: &ProposalDetailFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetail>> {
        debug!(?filter, "Querying proposal details");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("d.proposal_id", filter.proposal_id)
                .eq("d.seller_id", filter.seller_id)
                .eq("d.partner_id", filter.partner_id)
                .eq("d.channel", filter.channel);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ProposalDetail>> {
        sqlx::query_as::<_, ProposalDetail>("SELECT * FROM proposal_detail WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "proposal_detail.get")
    }

    pub async fn find_by_proposal(&self, proposal_id: i64) -> DbResult<Vec<ProposalDetail>> {
        sqlx::query_as::<_, ProposalDetail>(
            "SELECT * FROM proposal_detail WHERE proposal_id = ? ORDER BY id",
        )
        .bind(proposal_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_detail.list")
    }

    pub async fn save(&self, detail: &ProposalDetail) -> DbResult<i64> {
        detail.validate().in_operation(&self.base, "proposal_detail.save")?;

        debug!(
            proposal_id = detail.proposal_id,
            channel = %detail.channel,
            "Saving proposal detail"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO proposal_detail (proposal_id, seller_id, partner_id, channel, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(detail.proposal_id)
        .bind(detail.seller_id)
        .bind(detail.partner_id)
        .bind(detail.channel)
        .bind(&detail.notes)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_detail.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, detail: &ProposalDetail) -> DbResult<()> {
        detail.validate().in_operation(&self.base, "proposal_detail.update")?;

        let result = sqlx::query(
            r#"
            UPDATE proposal_detail SET proposal_id = ?, seller_id = ?, partner_id = ?, channel = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(detail.proposal_id)
        .bind(detail.seller_id)
        .bind(detail.partner_id)
        .bind(detail.channel)
        .bind(&detail.notes)
        .bind(detail.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_detail.update")?;

        expect_row(result.rows_affected(), "proposal_detail", detail.id)
            .in_operation(&self.base, "proposal_detail.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting proposal detail");

        let result = sqlx::query("DELETE FROM proposal_detail WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "proposal_detail.delete")?;

        expect_row(result.rows_affected(), "proposal_detail", id)
            .in_operation(&self.base, "proposal_detail.delete")
    }

    /// Whether the detail has vehicle lines.
    pub async fn has_vehicle_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists(
                "SELECT EXISTS(SELECT 1 FROM proposal_detail_vehicle WHERE proposal_detail_id = ?)",
                id,
            )
            .await
            .in_operation(&self.base, "proposal_detail.relationship")
    }
}
