//! # Lead Repository
//!
//! Sales opportunities before a proposal exists. `updated_at` is stamped by
//! the repository on every write.

use chrono::Utc;
use tracing::{debug, info};

use crm_core::{Direction, Lead, LeadFilter, LeadStatus, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT l.* FROM lead l", "SELECT COUNT(*) FROM lead l");

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "l.name"),
        ("status", "l.status"),
        ("source", "l.source"),
        ("createdAt", "l.created_at"),
        ("updatedAt", "l.updated_at"),
    ],
    default: ("l.created_at", Direction::Desc),
    tie_breaker: "l.id",
};

#[derive(Debug, Clone)]
pub struct LeadRepository {
    base: RepositoryBase,
}

impl LeadRepository {
    pub fn new(base: RepositoryBase) -> Self {
        LeadRepository { base }
    }

    pub async fn find(&self, filter: &LeadFilter, pageable: &Pageable) -> DbResult<Page<Lead>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "lead.find")
    }

    pub async fn search(&self, filter: &LeadFilter, pageable: &Pageable) -> DbResult<Page<Lead>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "lead.search")
    }

    async fn query(
        &self,
        filter: &LeadFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Lead>> {
        debug!(?filter, ?mode, "Querying leads");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("l.name", filter.name.as_deref(), mode)
                .text("l.email", filter.email.as_deref(), mode)
                .eq("l.customer_id", filter.customer_id)
                .eq("l.seller_id", filter.seller_id)
                .eq("l.source", filter.source)
                .eq("l.status", filter.status)
                .on_or_after("l.created_at", filter.created_from)
                .on_or_before("l.created_at", filter.created_until);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Lead>> {
        sqlx::query_as::<_, Lead>("SELECT * FROM lead WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "lead.get")
    }

    pub async fn save(&self, lead: &Lead) -> DbResult<i64> {
        lead.validate().in_operation(&self.base, "lead.save")?;

        debug!(name = %lead.name, source = %lead.source, "Saving lead");

        let result = sqlx::query(
            r#"
            INSERT INTO lead (
                customer_id, seller_id, name, email, phone, source, status, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lead.customer_id)
        .bind(lead.seller_id)
        .bind(lead.name.trim())
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.source)
        .bind(lead.status)
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "lead.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, lead: &Lead) -> DbResult<()> {
        lead.validate().in_operation(&self.base, "lead.update")?;

        debug!(id = lead.id, "Updating lead");

        let result = sqlx::query(
            r#"
            UPDATE lead SET
                customer_id = ?, seller_id = ?, name = ?, email = ?, phone = ?,
                source = ?, status = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(lead.customer_id)
        .bind(lead.seller_id)
        .bind(lead.name.trim())
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.source)
        .bind(lead.status)
        .bind(&lead.notes)
        .bind(Utc::now())
        .bind(lead.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "lead.update")?;

        expect_row(result.rows_affected(), "lead", lead.id).in_operation(&self.base, "lead.update")
    }

    pub async fn update_status(&self, id: i64, status: LeadStatus) -> DbResult<()> {
        info!(id, %status, "Updating lead status");

        let result = sqlx::query("UPDATE lead SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "lead.status")?;

        expect_row(result.rows_affected(), "lead", id).in_operation(&self.base, "lead.status")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting lead");

        let result = sqlx::query("DELETE FROM lead WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "lead.delete")?;

        expect_row(result.rows_affected(), "lead", id).in_operation(&self.base, "lead.delete")
    }

    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM proposal WHERE lead_id = ?)", id)
            .await
            .in_operation(&self.base, "lead.relationship")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use crm_core::LeadSource;

    use super::*;
    use crate::test_support::{date, lead, test_db, Graph};

    #[tokio::test]
    async fn test_filters_and_created_range() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.leads();

        let old = repo
            .save(&Lead {
                email: Some("frota@norte.com.br".to_string()),
                source: LeadSource::Referral,
                created_at: Utc.with_ymd_and_hms(2023, 3, 15, 22, 30, 0).unwrap(),
                ..lead("Indicação Norte", Some(g.agro_id), None)
            })
            .await
            .unwrap();

        let all = Pageable::default();

        let march = LeadFilter {
            created_from: Some(date(2023, 3, 15)),
            created_until: Some(date(2023, 3, 15)),
            ..Default::default()
        };
        let page = repo.find(&march, &all).await.unwrap();
        assert_eq!(page.content.iter().map(|l| l.id).collect::<Vec<_>>(), [old]);

        let since_2024 = LeadFilter {
            created_from: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        assert_eq!(repo.find(&since_2024, &all).await.unwrap().total_elements, 2);

        let agro = LeadFilter {
            customer_id: Some(g.agro_id),
            ..Default::default()
        };
        assert_eq!(repo.find(&agro, &all).await.unwrap().total_elements, 2);

        let events_of_seller = LeadFilter {
            seller_id: Some(g.seller_id),
            source: Some(LeadSource::Event),
            ..Default::default()
        };
        assert_eq!(
            repo.find(&events_of_seller, &all).await.unwrap().content[0].id,
            g.agro_lead_id
        );

        let by_email = LeadFilter {
            email: Some("norte.com".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&by_email, &all).await.unwrap().content[0].id, old);

        // newest first by default
        let everything = repo.find(&LeadFilter::default(), &all).await.unwrap();
        assert_eq!(everything.content.last().map(|l| l.id), Some(old));
    }

    #[tokio::test]
    async fn test_status_moves_and_stamps_update() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.leads();

        let before = repo.get_by_id(g.silva_lead_id).await.unwrap().unwrap();
        repo.update_status(g.silva_lead_id, LeadStatus::Qualified)
            .await
            .unwrap();
        let after = repo.get_by_id(g.silva_lead_id).await.unwrap().unwrap();
        assert_eq!(after.status, LeadStatus::Qualified);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);

        let qualified = LeadFilter {
            status: Some(LeadStatus::Qualified),
            ..Default::default()
        };
        assert_eq!(
            repo.find(&qualified, &Pageable::default()).await.unwrap().total_elements,
            1
        );

        let err = repo.update_status(999, LeadStatus::Lost).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Erro ao alterar situação do lead");
    }

    #[tokio::test]
    async fn test_round_trip_and_guard() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.leads();

        assert!(repo.has_proposal_relationship(g.silva_lead_id).await.unwrap());

        let id = repo
            .save(&Lead {
                phone: Some("(11) 98888-7777".to_string()),
                notes: Some("Visitou o estande".to_string()),
                ..lead("Contato avulso", None, None)
            })
            .await
            .unwrap();
        assert!(!repo.has_proposal_relationship(id).await.unwrap());

        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved.phone.as_deref(), Some("(11) 98888-7777"));

        repo.update(&Lead {
            customer_id: Some(g.silva_id),
            ..saved
        })
        .await
        .unwrap();
        assert_eq!(
            repo.get_by_id(id).await.unwrap().unwrap().customer_id,
            Some(g.silva_id)
        );

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());

        let err = repo.delete(g.silva_lead_id).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
