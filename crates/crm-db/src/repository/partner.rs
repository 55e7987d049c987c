//! # Partner Repository
//!
//! Dealers, implementers and distributors. The partner's display name lives
//! on its `person` row, so name filters join through it.

use tracing::debug;

use crm_core::{Direction, Page, Pageable, Partner, PartnerFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT pa.* FROM partner pa INNER JOIN person pe ON pe.id = pa.person_id",
    "SELECT COUNT(*) FROM partner pa INNER JOIN person pe ON pe.id = pa.person_id",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("code", "pa.code"),
        ("name", "pe.name"),
        ("partnerType", "pa.partner_type"),
        ("createdAt", "pa.created_at"),
    ],
    default: ("pa.code", Direction::Asc),
    tie_breaker: "pa.id",
};

#[derive(Debug, Clone)]
pub struct PartnerRepository {
    base: RepositoryBase,
}

impl PartnerRepository {
    pub fn new(base: RepositoryBase) -> Self {
        PartnerRepository { base }
    }

    pub async fn find(
        &self,
        filter: &PartnerFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Partner>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "partner.find")
    }

    pub async fn search(
        &self,
        filter: &PartnerFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Partner>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "partner.search")
    }

    async fn query(
        &self,
        filter: &PartnerFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Partner>> {
        debug!(?filter, ?mode, "Querying partners");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("pa.code", filter.code.as_deref(), mode)
                .text("pe.name", filter.name.as_deref(), mode)
                .eq("pa.partner_type", filter.partner_type)
                .eq("pa.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Partner>> {
        sqlx::query_as::<_, Partner>("SELECT * FROM partner WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "partner.get")
    }

    pub async fn save(&self, partner: &Partner) -> DbResult<i64> {
        partner.validate().in_operation(&self.base, "partner.save")?;

        debug!(code = %partner.code, "Saving partner");

        let result = sqlx::query(
            r#"
            INSERT INTO partner (person_id, code, partner_type, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(partner.person_id)
        .bind(partner.code.trim())
        .bind(partner.partner_type)
        .bind(partner.active)
        .bind(partner.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "partner.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, partner: &Partner) -> DbResult<()> {
        partner.validate().in_operation(&self.base, "partner.update")?;

        debug!(id = partner.id, "Updating partner");

        let result = sqlx::query(
            "UPDATE partner SET person_id = ?, code = ?, partner_type = ?, active = ? WHERE id = ?",
        )
        .bind(partner.person_id)
        .bind(partner.code.trim())
        .bind(partner.partner_type)
        .bind(partner.active)
        .bind(partner.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "partner.update")?;

        expect_row(result.rows_affected(), "partner", partner.id)
            .in_operation(&self.base, "partner.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting partner");

        let result = sqlx::query("DELETE FROM partner WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "partner.delete")?;

        expect_row(result.rows_affected(), "partner", id).in_operation(&self.base, "partner.delete")
    }

    pub async fn has_price_list_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM price_list WHERE partner_id = ?)", id)
            .await
            .in_operation(&self.base, "partner.relationship")
    }

    /// Whether any proposal detail is channelled through the partner.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM proposal_detail WHERE partner_id = ?)", id)
            .await
            .in_operation(&self.base, "partner.relationship")
    }

    pub async fn has_seller_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM seller WHERE partner_id = ?)", id)
            .await
            .in_operation(&self.base, "partner.relationship")
    }
}

#[cfg(test)]
mod tests {
    use crm_core::{PartnerType, Person, PersonType};

    use super::*;
    use crate::test_support::{partner, person, test_db, Graph};

    #[tokio::test]
    async fn test_filters_join_person_name() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;

        let implementer_person = db
            .people()
            .save(&Person {
                person_type: PersonType::Company,
                ..person("Implementos Sul")
            })
            .await
            .unwrap();
        db.partners()
            .save(&Partner {
                partner_type: PartnerType::Implementer,
                ..partner(implementer_person, "IMP-01")
            })
            .await
            .unwrap();

        let repo = db.partners();
        let all = Pageable::default();

        let rota = PartnerFilter {
            name: Some("rota".to_string()),
            ..Default::default()
        };
        let page = repo.search(&rota, &all).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, g.partner_id);

        let dealers = PartnerFilter {
            partner_type: Some(PartnerType::Dealer),
            ..Default::default()
        };
        assert_eq!(repo.find(&dealers, &all).await.unwrap().total_elements, 1);

        let by_code = PartnerFilter {
            code: Some("IMP-01".to_string()),
            ..Default::default()
        };
        let page = repo.find(&by_code, &all).await.unwrap();
        assert_eq!(page.content[0].partner_type, PartnerType::Implementer);

        let sorted = repo
            .find(
                &PartnerFilter::default(),
                &Pageable::default().sorted(crm_core::Sort::asc("name")),
            )
            .await
            .unwrap();
        assert_eq!(sorted.content[0].id, g.partner_id);
    }

    #[tokio::test]
    async fn test_round_trip_and_guards() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.partners();

        assert!(repo.has_price_list_relationship(g.partner_id).await.unwrap());
        assert!(repo.has_proposal_relationship(g.partner_id).await.unwrap());
        assert!(repo.has_seller_relationship(g.partner_id).await.unwrap());

        let new = partner(g.partner_person_id, "DLR-02");
        let id = repo.save(&new).await.unwrap();
        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved, Partner { id, ..new });

        assert!(!repo.has_price_list_relationship(id).await.unwrap());
        assert!(!repo.has_proposal_relationship(id).await.unwrap());
        assert!(!repo.has_seller_relationship(id).await.unwrap());

        repo.update(&Partner {
            partner_type: PartnerType::Distributor,
            ..saved
        })
        .await
        .unwrap();
        assert_eq!(
            repo.get_by_id(id).await.unwrap().unwrap().partner_type,
            PartnerType::Distributor
        );

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_with_dependents_fails() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;

        let err = db.partners().delete(g.partner_id).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.to_string(), "Erro ao excluir parceiro");
    }
}
