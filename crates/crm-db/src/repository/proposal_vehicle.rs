//! # Proposal Vehicle Repository
//!
//! Vehicle lines of a proposal detail. A line quotes a model at the price of
//! a `price_product` entry and may pin one physical vehicle.
//!
//! Line total: `max(price × quantity − discount, 0)`, the same rule as
//! [`ProposalDetailVehicle::total`].

use tracing::debug;

use crm_core::{
    Direction, Money, Page, Pageable, ProposalDetailVehicle, ProposalDetailVehicleFilter,
};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT v.* FROM proposal_detail_vehicle v",
    "SELECT COUNT(*) FROM proposal_detail_vehicle v",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("quantity", "v.quantity"),
        ("price", "v.price_cents"),
        ("discount", "v.discount_cents"),
    ],
    default: ("v.id", Direction::Asc),
    tie_breaker: "v.id",
};

#[derive(Debug, Clone)]
pub struct ProposalDetailVehicleRepository {
    base: RepositoryBase,
}

impl ProposalDetailVehicleRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ProposalDetailVehicleRepository { base }
    }

    pub async fn find(
        &self,
        filter: &ProposalDetailVehicleFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetailVehicle>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "proposal_vehicle.find")
    }

    pub async fn search(
        &self,
        filter: &ProposalDetailVehicleFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetailVehicle>> {
        self.query(filter, pageable)
            .await
            .in_operation(&self.base, "proposal_vehicle.search")
    }

    async fn query(
        &self,
        filter: &ProposalDetailVehicleFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<ProposalDetailVehicle>> {
        debug!(?filter, "Querying proposal vehicles");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("v.proposal_detail_id", filter.proposal_detail_id)
                .eq("v.model_id", filter.model_id)
                .eq("v.vehicle_id", filter.vehicle_id);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ProposalDetailVehicle>> {
        sqlx::query_as::<_, ProposalDetailVehicle>(
            "SELECT * FROM proposal_detail_vehicle WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_vehicle.get")
    }

    pub async fn find_by_detail(&self, detail_id: i64) -> DbResult<Vec<ProposalDetailVehicle>> {
        sqlx::query_as::<_, ProposalDetailVehicle>(
            "SELECT * FROM proposal_detail_vehicle WHERE proposal_detail_id = ? ORDER BY id",
        )
        .bind(detail_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_vehicle.list")
    }

    /// Sum of line totals over every detail of the proposal. Zero when the
    /// proposal has no lines.
    pub async fn total_for_proposal(&self, proposal_id: i64) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(MAX(v.price_cents * v.quantity - v.discount_cents, 0)), 0)
            FROM proposal_detail_vehicle v
            INNER JOIN proposal_detail d ON d.id = v.proposal_detail_id
            WHERE d.proposal_id = ?
            "#,
        )
        .bind(proposal_id)
        .fetch_one(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_vehicle.total")?;

        Ok(Money::from_cents(cents))
    }

    pub async fn save(&self, line: &ProposalDetailVehicle) -> DbResult<i64> {
        line.validate().in_operation(&self.base, "proposal_vehicle.save")?;

        debug!(
            detail_id = line.proposal_detail_id,
            model_id = line.model_id,
            quantity = line.quantity,
            "Saving proposal vehicle"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO proposal_detail_vehicle (
                proposal_detail_id, model_id, vehicle_id, price_product_id,
                quantity, price_cents, discount_cents
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(line.proposal_detail_id)
        .bind(line.model_id)
        .bind(line.vehicle_id)
        .bind(line.price_product_id)
        .bind(line.quantity)
        .bind(line.price_cents)
        .bind(line.discount_cents)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_vehicle.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, line: &ProposalDetailVehicle) -> DbResult<()> {
        line.validate().in_operation(&self.base, "proposal_vehicle.update")?;

        let result = sqlx::query(
            r#"
            UPDATE proposal_detail_vehicle SET
                proposal_detail_id = ?, model_id = ?, vehicle_id = ?, price_product_id = ?,
                quantity = ?, price_cents = ?, discount_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(line.proposal_detail_id)
        .bind(line.model_id)
        .bind(line.vehicle_id)
        .bind(line.price_product_id)
        .bind(line.quantity)
        .bind(line.price_cents)
        .bind(line.discount_cents)
        .bind(line.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "proposal_vehicle.update")?;

        expect_row(result.rows_affected(), "proposal_vehicle", line.id)
            .in_operation(&self.base, "proposal_vehicle.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM proposal_detail_vehicle WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "proposal_vehicle.delete")?;

        expect_row(result.rows_affected(), "proposal_vehicle", id)
            .in_operation(&self.base, "proposal_vehicle.delete")
    }
}
