//! # Classifier Repository
//!
//! Display labels for the values stored in status and type columns. Rows
//! are seeded by migration; the enums in `crm_core::enums` own the values.

use tracing::debug;

use crm_core::{Classifier, ClassifierFilter, Direction, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT cl.* FROM classifier cl",
    "SELECT COUNT(*) FROM classifier cl",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("type", "cl.type"),
        ("value", "cl.value"),
        ("label", "cl.label"),
        ("position", "cl.position"),
    ],
    default: ("cl.type", Direction::Asc),
    tie_breaker: "cl.position, cl.id",
};

#[derive(Debug, Clone)]
pub struct ClassifierRepository {
    base: RepositoryBase,
}

impl ClassifierRepository {
    pub fn new(base: RepositoryBase) -> Self {
        ClassifierRepository { base }
    }

    pub async fn find(
        &self,
        filter: &ClassifierFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Classifier>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "classifier.find")
    }

    pub async fn search(
        &self,
        filter: &ClassifierFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Classifier>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "classifier.search")
    }

    async fn query(
        &self,
        filter: &ClassifierFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Classifier>> {
        debug!(?filter, ?mode, "Querying classifiers");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("cl.type", filter.classifier_type.as_deref(), mode)
                .text("cl.value", filter.value.as_deref(), mode)
                .text("cl.label", filter.label.as_deref(), mode)
                .eq("cl.active", filter.active);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Classifier>> {
        sqlx::query_as::<_, Classifier>("SELECT * FROM classifier WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "classifier.get")
    }

    /// Active rows of one type, in display order.
    pub async fn find_by_type(&self, classifier_type: &str) -> DbResult<Vec<Classifier>> {
        sqlx::query_as::<_, Classifier>(
            "SELECT * FROM classifier WHERE type = ? AND active = 1 ORDER BY position, id",
        )
        .bind(classifier_type.trim())
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "classifier.list")
    }

    /// Label of a stored value, e.g. `label_of("proposal_status", "approved")`.
    /// Inactive rows still resolve so historical values keep their label.
    pub async fn label_of(&self, classifier_type: &str, value: &str) -> DbResult<Option<String>> {
        sqlx::query_scalar("SELECT label FROM classifier WHERE type = ? AND value = ?")
            .bind(classifier_type.trim())
            .bind(value.trim())
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "classifier.get")
    }

    pub async fn save(&self, classifier: &Classifier) -> DbResult<i64> {
        classifier.validate().in_operation(&self.base, "classifier.save")?;

        debug!(
            classifier_type = %classifier.classifier_type,
            value = %classifier.value,
            "Saving classifier"
        );

        let result = sqlx::query(
            "INSERT INTO classifier (type, value, label, position, active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(classifier.classifier_type.trim())
        .bind(classifier.value.trim())
        .bind(classifier.label.trim())
        .bind(classifier.position)
        .bind(classifier.active)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "classifier.save")?;

        Ok(result.last_insert_rowid())
    }

    /// Updates label, position and active flag. Type and value identify the
    /// stored data and are left as they are.
    pub async fn update(&self, classifier: &Classifier) -> DbResult<()> {
        classifier.validate().in_operation(&self.base, "classifier.update")?;

        let result = sqlx::query(
            "UPDATE classifier SET label = ?, position = ?, active = ? WHERE id = ?",
        )
        .bind(classifier.label.trim())
        .bind(classifier.position)
        .bind(classifier.active)
        .bind(classifier.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "classifier.update")?;

        expect_row(result.rows_affected(), "classifier", classifier.id)
            .in_operation(&self.base, "classifier.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting classifier");

        let result = sqlx::query("DELETE FROM classifier WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "classifier.delete")?;

        expect_row(result.rows_affected(), "classifier", id)
            .in_operation(&self.base, "classifier.delete")
    }
}

#[cfg(test)]
mod tests {
    use crm_core::{classifier_catalog, ProposalStatus};

    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_seed_matches_enums() {
        let db = test_db().await;
        let repo = db.classifiers();

        for (classifier_type, values) in classifier_catalog() {
            let rows = repo.find_by_type(classifier_type).await.unwrap();
            let stored: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
            assert_eq!(stored, values, "classifier type {classifier_type}");
        }
    }

    #[tokio::test]
    async fn test_labels() {
        let db = test_db().await;
        let repo = db.classifiers();

        let label = repo
            .label_of(ProposalStatus::CLASSIFIER_TYPE, ProposalStatus::Approved.as_str())
            .await
            .unwrap();
        assert_eq!(label.as_deref(), Some("Aprovada"));
        assert!(repo.label_of("proposal_status", "archived").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filters_and_deactivation() {
        let db = test_db().await;
        let repo = db.classifiers();
        let all = Pageable::default();

        let id = repo
            .save(&Classifier {
                id: 0,
                classifier_type: "fuel".to_string(),
                value: "diesel_s10".to_string(),
                label: "Diesel S10".to_string(),
                position: 1,
                active: true,
            })
            .await
            .unwrap();

        let fuel = ClassifierFilter {
            classifier_type: Some("fuel".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.find(&fuel, &all).await.unwrap().total_elements, 1);

        let diesel = ClassifierFilter {
            label: Some("diesel".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&diesel, &all).await.unwrap().content[0].id, id);

        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        repo.update(&Classifier {
            active: false,
            value: "changed".to_string(),
            ..saved
        })
        .await
        .unwrap();

        assert!(repo.find_by_type("fuel").await.unwrap().is_empty());
        assert_eq!(
            repo.label_of("fuel", "diesel_s10").await.unwrap().as_deref(),
            Some("Diesel S10")
        );

        let inactive = ClassifierFilter {
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(repo.find(&inactive, &all).await.unwrap().total_elements, 1);

        let err = repo
            .save(&Classifier {
                id: 0,
                classifier_type: "fuel".to_string(),
                value: "diesel_s10".to_string(),
                label: "Duplicado".to_string(),
                position: 2,
                active: true,
            })
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }
}
