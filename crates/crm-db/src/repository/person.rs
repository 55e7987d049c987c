//! # Person Repository
//!
//! Natural and legal persons referenced by users, partners and sellers.

use tracing::debug;

use crm_core::validation::normalize_document;
use crm_core::{Direction, Page, Pageable, Person, PersonFilter};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT p.* FROM person p",
    "SELECT COUNT(*) FROM person p",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "p.name"),
        ("email", "p.email"),
        ("createdAt", "p.created_at"),
    ],
    default: ("p.name", Direction::Asc),
    tie_breaker: "p.id",
};

#[derive(Debug, Clone)]
pub struct PersonRepository {
    base: RepositoryBase,
}

impl PersonRepository {
    pub fn new(base: RepositoryBase) -> Self {
        PersonRepository { base }
    }

    pub async fn find(&self, filter: &PersonFilter, pageable: &Pageable) -> DbResult<Page<Person>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "person.find")
    }

    pub async fn search(
        &self,
        filter: &PersonFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Person>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "person.search")
    }

    async fn query(
        &self,
        filter: &PersonFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Person>> {
        debug!(?filter, ?mode, "Querying people");

        let document = filter.document.as_deref().map(normalize_document);

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("p.name", filter.name.as_deref(), mode)
                .text("p.document", document.as_deref(), mode)
                .text("p.email", filter.email.as_deref(), mode)
                .eq("p.person_type", filter.person_type);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Person>> {
        sqlx::query_as::<_, Person>("SELECT * FROM person WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "person.get")
    }

    /// Looks a person up by CPF/CNPJ, punctuation ignored.
    pub async fn get_by_document(&self, document: &str) -> DbResult<Option<Person>> {
        sqlx::query_as::<_, Person>("SELECT * FROM person WHERE document = ?")
            .bind(normalize_document(document))
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "person.get")
    }

    pub async fn save(&self, person: &Person) -> DbResult<i64> {
        let person = person.normalized();
        person.validate().in_operation(&self.base, "person.save")?;

        debug!(name = %person.name, "Saving person");

        let result = sqlx::query(
            r#"
            INSERT INTO person (
                name, document, person_type, email, phone, birth_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&person.name)
        .bind(&person.document)
        .bind(person.person_type)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(person.birth_date)
        .bind(person.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "person.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, person: &Person) -> DbResult<()> {
        let person = person.normalized();
        person.validate().in_operation(&self.base, "person.update")?;

        debug!(id = person.id, "Updating person");

        let result = sqlx::query(
            r#"
            UPDATE person SET
                name = ?, document = ?, person_type = ?, email = ?, phone = ?, birth_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&person.name)
        .bind(&person.document)
        .bind(person.person_type)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(person.birth_date)
        .bind(person.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "person.update")?;

        expect_row(result.rows_affected(), "person", person.id)
            .in_operation(&self.base, "person.update")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting person");

        let result = sqlx::query("DELETE FROM person WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "person.delete")?;

        expect_row(result.rows_affected(), "person", id).in_operation(&self.base, "person.delete")
    }

    pub async fn has_user_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM user WHERE person_id = ?)", id)
            .await
            .in_operation(&self.base, "person.relationship")
    }

    pub async fn has_seller_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM seller WHERE person_id = ?)", id)
            .await
            .in_operation(&self.base, "person.relationship")
    }

    pub async fn has_partner_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists("SELECT EXISTS(SELECT 1 FROM partner WHERE person_id = ?)", id)
            .await
            .in_operation(&self.base, "person.relationship")
    }
}
