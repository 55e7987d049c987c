//! # Sale Repository
//!
//! Closed sales. A sale usually comes from a won proposal but may be
//! recorded directly against a customer.

use tracing::{debug, info};

use crm_core::{Direction, Page, Pageable, Sale, SaleFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT s.* FROM sale s", "SELECT COUNT(*) FROM sale s");

const SORT: SortSpec = SortSpec {
    columns: &[
        ("soldAt", "s.sold_at"),
        ("total", "s.total_cents"),
        ("invoiceNumber", "s.invoice_number"),
    ],
    default: ("s.sold_at", Direction::Desc),
    tie_breaker: "s.id",
};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    base: RepositoryBase,
}

impl SaleRepository {
    pub fn new(base: RepositoryBase) -> Self {
        SaleRepository { base }
    }

    pub async fn find(&self, filter: &SaleFilter, pageable: &Pageable) -> DbResult<Page<Sale>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "sale.find")
    }

    pub async fn search(&self, filter: &SaleFilter, pageable: &Pageable) -> DbResult<Page<Sale>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "sale.search")
    }

    async fn query(
        &self,
        filter: &SaleFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Sale>> {
        debug!(?filter, ?mode, "Querying sales");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("s.proposal_id", filter.proposal_id)
                .eq("s.customer_id", filter.customer_id)
                .eq("s.seller_id", filter.seller_id)
                .text("s.invoice_number", filter.invoice_number.as_deref(), mode)
                .on_or_after("s.sold_at", filter.sold_from)
                .on_or_before("s.sold_at", filter.sold_until);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        sqlx::query_as::<_, Sale>("SELECT * FROM sale WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "sale.get")
    }

    pub async fn save(&self, sale: &Sale) -> DbResult<i64> {
        sale.validate().in_operation(&self.base, "sale.save")?;

        info!(
            customer_id = sale.customer_id,
            proposal_id = ?sale.proposal_id,
            total = %sale.total(),
            "Recording sale"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO sale (proposal_id, customer_id, seller_id, invoice_number, total_cents, sold_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.proposal_id)
        .bind(sale.customer_id)
        .bind(sale.seller_id)
        .bind(sale.invoice_number.as_deref().map(str::trim))
        .bind(sale.total_cents)
        .bind(sale.sold_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "sale.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, sale: &Sale) -> DbResult<()> {
        sale.validate().in_operation(&self.base, "sale.update")?;

        let result = sqlx::query(
            r#"
            UPDATE sale SET
                proposal_id = ?, customer_id = ?, seller_id = ?, invoice_number = ?,
                total_cents = ?, sold_at = ?
            WHERE id = ?
            "#,
        )
        .bind(sale.proposal_id)
        .bind(sale.customer_id)
        .bind(sale.seller_id)
        .bind(sale.invoice_number.as_deref().map(str::trim))
        .bind(sale.total_cents)
        .bind(sale.sold_at)
        .bind(sale.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "sale.update")?;

        expect_row(result.rows_affected(), "sale", sale.id).in_operation(&self.base, "sale.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sale WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "sale.delete")?;

        expect_row(result.rows_affected(), "sale", id).in_operation(&self.base, "sale.delete")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::test_support::{date, test_db, Graph, FH_PRICE};

    fn sale(customer_id: i64, invoice: Option<&str>, total_cents: i64) -> Sale {
        Sale {
            id: 0,
            proposal_id: None,
            customer_id,
            seller_id: None,
            invoice_number: invoice.map(str::to_string),
            total_cents,
            sold_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_filters_and_sold_range() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.sales();

        let from_proposal = repo
            .save(&Sale {
                proposal_id: Some(g.p2_id),
                seller_id: Some(g.seller_id),
                ..sale(g.agro_id, Some("NF-000123"), FH_PRICE)
            })
            .await
            .unwrap();
        let last_year = repo
            .save(&Sale {
                sold_at: Utc.with_ymd_and_hms(2023, 11, 20, 14, 0, 0).unwrap(),
                ..sale(g.silva_id, Some("NF-000045"), 42_000_000)
            })
            .await
            .unwrap();

        let all = Pageable::default();

        let by_proposal = SaleFilter {
            proposal_id: Some(g.p2_id),
            ..Default::default()
        };
        assert_eq!(repo.find(&by_proposal, &all).await.unwrap().content[0].id, from_proposal);

        let november = SaleFilter {
            sold_from: Some(date(2023, 11, 1)),
            sold_until: Some(date(2023, 11, 30)),
            ..Default::default()
        };
        let page = repo.find(&november, &all).await.unwrap();
        assert_eq!(page.content.iter().map(|s| s.id).collect::<Vec<_>>(), [last_year]);

        let invoices = SaleFilter {
            invoice_number: Some("NF-000".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&invoices, &all).await.unwrap().total_elements, 2);
        assert_eq!(repo.find(&invoices, &all).await.unwrap().total_elements, 0);

        let by_seller = SaleFilter {
            seller_id: Some(g.seller_id),
            customer_id: Some(g.agro_id),
            ..Default::default()
        };
        assert_eq!(repo.find(&by_seller, &all).await.unwrap().total_elements, 1);

        // newest first
        let everything = repo.find(&SaleFilter::default(), &all).await.unwrap();
        assert_eq!(
            everything.content.iter().map(|s| s.id).collect::<Vec<_>>(),
            [from_proposal, last_year]
        );
    }

    #[tokio::test]
    async fn test_round_trip_and_duplicate_invoice() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.sales();

        let new = sale(g.silva_id, Some("NF-9"), 1_000);
        let id = repo.save(&new).await.unwrap();
        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved, Sale { id, ..new });

        let err = repo
            .save(&sale(g.agro_id, Some("NF-9"), 2_000))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.to_string(), "Erro ao salvar venda");

        repo.update(&Sale {
            total_cents: 1_500,
            ..saved
        })
        .await
        .unwrap();
        assert_eq!(repo.get_by_id(id).await.unwrap().unwrap().total_cents, 1_500);

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }
}
