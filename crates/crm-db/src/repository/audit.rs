//! # Audit Repository
//!
//! Append-only trail of changes. Entries are recorded, searched and read;
//! there is no update or delete.

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crm_core::{Audit, AuditFilter, Direction, Page, Pageable};

use super::{InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new("SELECT a.* FROM audit a", "SELECT COUNT(*) FROM audit a");

const SORT: SortSpec = SortSpec {
    columns: &[
        ("entity", "a.entity"),
        ("action", "a.action"),
        ("createdAt", "a.created_at"),
    ],
    default: ("a.created_at", Direction::Desc),
    tie_breaker: "a.id",
};

/// Serializes `payload` into the JSON text stored on an entry.
pub fn payload_of<T: Serialize>(payload: &T) -> DbResult<String> {
    Ok(serde_json::to_string(payload)?)
}

/// Inserts one entry on `conn`, so callers inside a transaction can write
/// their audit row atomically with the change.
pub(crate) async fn insert(conn: &mut SqliteConnection, entry: &Audit) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO audit (entity, entity_id, action, user_id, payload, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.entity.trim())
    .bind(entry.entity_id)
    .bind(entry.action)
    .bind(entry.user_id)
    .bind(&entry.payload)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

#[derive(Debug, Clone)]
pub struct AuditRepository {
    base: RepositoryBase,
}

impl AuditRepository {
    pub fn new(base: RepositoryBase) -> Self {
        AuditRepository { base }
    }

    pub async fn find(&self, filter: &AuditFilter, pageable: &Pageable) -> DbResult<Page<Audit>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "audit.find")
    }

    pub async fn search(
        &self,
        filter: &AuditFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Audit>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "audit.search")
    }

    async fn query(
        &self,
        filter: &AuditFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Audit>> {
        debug!(?filter, ?mode, "Querying audit trail");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("a.entity", filter.entity.as_deref(), mode)
                .eq("a.entity_id", filter.entity_id)
                .eq("a.user_id", filter.user_id)
                .eq("a.action", filter.action)
                .on_or_after("a.created_at", filter.from)
                .on_or_before("a.created_at", filter.until);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Audit>> {
        sqlx::query_as::<_, Audit>("SELECT * FROM audit WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "audit.get")
    }

    /// Appends an entry and returns its id.
    pub async fn record(&self, entry: &Audit) -> DbResult<i64> {
        info!(
            entity = %entry.entity,
            entity_id = entry.entity_id,
            action = %entry.action,
            "Recording audit entry"
        );

        let mut conn = self
            .base
            .pool()
            .acquire()
            .await
            .in_operation(&self.base, "audit.record")?;

        insert(&mut conn, entry)
            .await
            .in_operation(&self.base, "audit.record")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use crm_core::AuditAction;
    use serde_json::json;

    use super::*;
    use crate::test_support::{date, test_db};

    fn entry(entity: &str, entity_id: i64, action: AuditAction) -> Audit {
        Audit {
            id: 0,
            entity: entity.to_string(),
            entity_id,
            action,
            user_id: Some(1),
            payload: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let db = test_db().await;
        let repo = db.audits();

        let payload = payload_of(&json!({ "name": "Transportes Silva" })).unwrap();
        let id = repo
            .record(&Audit {
                payload: Some(payload.clone()),
                ..entry("customer", 7, AuditAction::Create)
            })
            .await
            .unwrap();

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.entity, "customer");
        assert_eq!(stored.action, AuditAction::Create);
        let parsed: serde_json::Value =
            serde_json::from_str(stored.payload.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["name"], "Transportes Silva");
    }

    #[tokio::test]
    async fn test_filters() {
        let db = test_db().await;
        let repo = db.audits();

        repo.record(&entry("customer", 7, AuditAction::Create)).await.unwrap();
        repo.record(&entry("customer", 7, AuditAction::Update)).await.unwrap();
        repo.record(&Audit {
            user_id: Some(2),
            created_at: Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap(),
            ..entry("proposal", 3, AuditAction::Approve)
        })
        .await
        .unwrap();

        let all = Pageable::default();

        let customer_7 = AuditFilter {
            entity: Some("customer".to_string()),
            entity_id: Some(7),
            ..Default::default()
        };
        assert_eq!(repo.find(&customer_7, &all).await.unwrap().total_elements, 2);

        let updates = AuditFilter {
            action: Some(AuditAction::Update),
            ..Default::default()
        };
        assert_eq!(repo.find(&updates, &all).await.unwrap().total_elements, 1);

        let february = AuditFilter {
            from: Some(date(2024, 2, 1)),
            until: Some(date(2024, 2, 29)),
            ..Default::default()
        };
        let page = repo.find(&february, &all).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].user_id, Some(2));

        let partial = AuditFilter {
            entity: Some("prop".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&partial, &all).await.unwrap().total_elements, 1);
        assert_eq!(repo.find(&partial, &all).await.unwrap().total_elements, 0);
    }
}
