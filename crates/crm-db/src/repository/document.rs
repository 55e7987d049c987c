//! # Document Repository
//!
//! Metadata of files attached to customers, leads, proposals and sales.
//! The bytes live elsewhere under `storage_key`, which is assigned here.

use tracing::{debug, info};
use uuid::Uuid;

use crm_core::{Direction, Document, DocumentFilter, DocumentOwner, Page, Pageable};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT doc.* FROM document doc",
    "SELECT COUNT(*) FROM document doc",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "doc.name"),
        ("sizeBytes", "doc.size_bytes"),
        ("createdAt", "doc.created_at"),
    ],
    default: ("doc.created_at", Direction::Desc),
    tie_breaker: "doc.id",
};

#[derive(Debug, Clone)]
pub struct DocumentRepository {
    base: RepositoryBase,
}

impl DocumentRepository {
    pub fn new(base: RepositoryBase) -> Self {
        DocumentRepository { base }
    }

    pub async fn find(
        &self,
        filter: &DocumentFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Document>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "document.find")
    }

    pub async fn search(
        &self,
        filter: &DocumentFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Document>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "document.search")
    }

    async fn query(
        &self,
        filter: &DocumentFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Document>> {
        debug!(?filter, ?mode, "Querying documents");

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.eq("doc.owner_type", filter.owner_type)
                .eq("doc.owner_id", filter.owner_id)
                .text("doc.name", filter.name.as_deref(), mode);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM document WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "document.get")
    }

    /// Documents attached to one owner, newest first.
    pub async fn find_by_owner(
        &self,
        owner_type: DocumentOwner,
        owner_id: i64,
    ) -> DbResult<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM document
            WHERE owner_type = ? AND owner_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_type)
        .bind(owner_id)
        .fetch_all(self.base.pool())
        .await
        .in_operation(&self.base, "document.list")
    }

    /// Inserts the metadata and returns `(id, storage_key)`. A blank key is
    /// replaced by a random UUID.
    pub async fn save(&self, document: &Document) -> DbResult<(i64, String)> {
        document.validate().in_operation(&self.base, "document.save")?;

        let storage_key = match document.storage_key.trim() {
            "" => Uuid::new_v4().to_string(),
            key => key.to_string(),
        };

        info!(
            owner_type = %document.owner_type,
            owner_id = document.owner_id,
            %storage_key,
            "Saving document"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO document (
                owner_type, owner_id, name, content_type, storage_key, size_bytes,
                uploaded_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.owner_type)
        .bind(document.owner_id)
        .bind(document.name.trim())
        .bind(document.content_type.trim())
        .bind(&storage_key)
        .bind(document.size_bytes)
        .bind(document.uploaded_by)
        .bind(document.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "document.save")?;

        Ok((result.last_insert_rowid(), storage_key))
    }

    /// Renames or re-types a document. The owner and storage key never
    /// change.
    pub async fn update(&self, document: &Document) -> DbResult<()> {
        document.validate().in_operation(&self.base, "document.update")?;

        let result = sqlx::query(
            "UPDATE document SET name = ?, content_type = ?, size_bytes = ? WHERE id = ?",
        )
        .bind(document.name.trim())
        .bind(document.content_type.trim())
        .bind(document.size_bytes)
        .bind(document.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "document.update")?;

        expect_row(result.rows_affected(), "document", document.id)
            .in_operation(&self.base, "document.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting document");

        let result = sqlx::query("DELETE FROM document WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "document.delete")?;

        expect_row(result.rows_affected(), "document", id)
            .in_operation(&self.base, "document.delete")
    }
}
