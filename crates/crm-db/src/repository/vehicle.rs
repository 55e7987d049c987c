//! # Vehicle Repository
//!
//! Physical stock units. The chassis is unique; plates are stored without
//! the legacy dash so `ABC-1234` and `ABC1234` filter the same.

use tracing::{debug, info};

use crm_core::{Direction, Page, Pageable, Vehicle, VehicleFilter, VehicleStatus};

use super::{expect_row, InOperation, RepositoryBase};
use crate::error::DbResult;
use crate::query::{fetch_page, MatchMode, PageQuery, SortSpec};

const PAGE: PageQuery = PageQuery::new(
    "SELECT v.* FROM vehicle v",
    "SELECT COUNT(*) FROM vehicle v",
);

const SORT: SortSpec = SortSpec {
    columns: &[
        ("chassis", "v.chassis"),
        ("plate", "v.plate"),
        ("modelYear", "v.model_year"),
        ("status", "v.status"),
        ("createdAt", "v.created_at"),
    ],
    default: ("v.created_at", Direction::Desc),
    tie_breaker: "v.id",
};

fn normalize_plate(plate: Option<&str>) -> Option<String> {
    plate.map(|p| p.trim().replace('-', ""))
}

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    base: RepositoryBase,
}

impl VehicleRepository {
    pub fn new(base: RepositoryBase) -> Self {
        VehicleRepository { base }
    }

    pub async fn find(
        &self,
        filter: &VehicleFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Vehicle>> {
        self.query(filter, pageable, MatchMode::Exact)
            .await
            .in_operation(&self.base, "vehicle.find")
    }

    pub async fn search(
        &self,
        filter: &VehicleFilter,
        pageable: &Pageable,
    ) -> DbResult<Page<Vehicle>> {
        self.query(filter, pageable, MatchMode::Like)
            .await
            .in_operation(&self.base, "vehicle.search")
    }

    async fn query(
        &self,
        filter: &VehicleFilter,
        pageable: &Pageable,
        mode: MatchMode,
    ) -> DbResult<Page<Vehicle>> {
        debug!(?filter, ?mode, "Querying vehicles");

        let plate = normalize_plate(filter.plate.as_deref());

        fetch_page(self.base.pool(), &PAGE, pageable, &SORT, |c| {
            c.text("v.chassis", filter.chassis.as_deref(), mode)
                .text("v.plate", plate.as_deref(), mode)
                .eq("v.model_id", filter.model_id)
                .eq("v.status", filter.status)
                .eq("v.model_year", filter.model_year);
        })
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicle WHERE id = ?")
            .bind(id)
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "vehicle.get")
    }

    pub async fn get_by_chassis(&self, chassis: &str) -> DbResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicle WHERE chassis = ?")
            .bind(chassis.trim())
            .fetch_optional(self.base.pool())
            .await
            .in_operation(&self.base, "vehicle.get")
    }

    pub async fn save(&self, vehicle: &Vehicle) -> DbResult<i64> {
        vehicle.validate().in_operation(&self.base, "vehicle.save")?;

        debug!(chassis = %vehicle.chassis, "Saving vehicle");

        let result = sqlx::query(
            r#"
            INSERT INTO vehicle (
                model_id, chassis, plate, color, model_year, manufacture_year, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(vehicle.model_id)
        .bind(vehicle.chassis.trim())
        .bind(normalize_plate(vehicle.plate.as_deref()))
        .bind(&vehicle.color)
        .bind(vehicle.model_year)
        .bind(vehicle.manufacture_year)
        .bind(vehicle.status)
        .bind(vehicle.created_at)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "vehicle.save")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&self, vehicle: &Vehicle) -> DbResult<()> {
        vehicle.validate().in_operation(&self.base, "vehicle.update")?;

        debug!(id = vehicle.id, "Updating vehicle");

        let result = sqlx::query(
            r#"
            UPDATE vehicle SET
                model_id = ?, chassis = ?, plate = ?, color = ?,
                model_year = ?, manufacture_year = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(vehicle.model_id)
        .bind(vehicle.chassis.trim())
        .bind(normalize_plate(vehicle.plate.as_deref()))
        .bind(&vehicle.color)
        .bind(vehicle.model_year)
        .bind(vehicle.manufacture_year)
        .bind(vehicle.status)
        .bind(vehicle.id)
        .execute(self.base.pool())
        .await
        .in_operation(&self.base, "vehicle.update")?;

        expect_row(result.rows_affected(), "vehicle", vehicle.id)
            .in_operation(&self.base, "vehicle.update")
    }

    /// Moves a unit between available, reserved and sold.
    pub async fn update_status(&self, id: i64, status: VehicleStatus) -> DbResult<()> {
        info!(id, %status, "Updating vehicle status");

        let result = sqlx::query("UPDATE vehicle SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "vehicle.status")?;

        expect_row(result.rows_affected(), "vehicle", id).in_operation(&self.base, "vehicle.status")
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting vehicle");

        let result = sqlx::query("DELETE FROM vehicle WHERE id = ?")
            .bind(id)
            .execute(self.base.pool())
            .await
            .in_operation(&self.base, "vehicle.delete")?;

        expect_row(result.rows_affected(), "vehicle", id).in_operation(&self.base, "vehicle.delete")
    }

    /// Whether a proposal line pins this exact unit.
    pub async fn has_proposal_relationship(&self, id: i64) -> DbResult<bool> {
        self.base
            .exists(
                "SELECT EXISTS(SELECT 1 FROM proposal_detail_vehicle WHERE vehicle_id = ?)",
                id,
            )
            .await
            .in_operation(&self.base, "vehicle.relationship")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chassis, test_db, vehicle, Graph};

    #[tokio::test]
    async fn test_filters() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.vehicles();

        repo.save(&Vehicle {
            plate: Some("BRA-2E19".to_string()),
            model_year: 2025,
            manufacture_year: 2024,
            ..vehicle(g.model_id, 2)
        })
        .await
        .unwrap();
        repo.save(&Vehicle {
            status: VehicleStatus::Sold,
            ..vehicle(g.model_id, 3)
        })
        .await
        .unwrap();

        let all = Pageable::default();

        let by_plate = VehicleFilter {
            plate: Some("BRA2E19".to_string()),
            ..Default::default()
        };
        let page = repo.find(&by_plate, &all).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].plate.as_deref(), Some("BRA2E19"));

        let sold = VehicleFilter {
            status: Some(VehicleStatus::Sold),
            ..Default::default()
        };
        assert_eq!(repo.find(&sold, &all).await.unwrap().content[0].chassis, chassis(3));

        let year = VehicleFilter {
            model_year: Some(2025),
            model_id: Some(g.model_id),
            ..Default::default()
        };
        assert_eq!(repo.find(&year, &all).await.unwrap().total_elements, 1);

        let partial_chassis = VehicleFilter {
            chassis: Some("VT00000".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search(&partial_chassis, &all).await.unwrap().total_elements, 3);
        assert_eq!(repo.find(&partial_chassis, &all).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn test_status_and_chassis_lookup() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.vehicles();

        let found = repo.get_by_chassis(&chassis(1)).await.unwrap().unwrap();
        assert_eq!(found.id, g.vehicle_id);
        assert_eq!(found.status, VehicleStatus::Available);

        repo.update_status(g.vehicle_id, VehicleStatus::Reserved).await.unwrap();
        assert_eq!(
            repo.get_by_id(g.vehicle_id).await.unwrap().unwrap().status,
            VehicleStatus::Reserved
        );

        let err = repo.update_status(999, VehicleStatus::Sold).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Erro ao alterar situação do veículo");
    }

    #[tokio::test]
    async fn test_round_trip_and_guard() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;
        let repo = db.vehicles();

        assert!(repo.has_proposal_relationship(g.vehicle_id).await.unwrap());

        let new = Vehicle {
            color: Some("Branco".to_string()),
            ..vehicle(g.model_id, 7)
        };
        let id = repo.save(&new).await.unwrap();
        let saved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved.chassis, new.chassis);
        assert_eq!(saved.color.as_deref(), Some("Branco"));
        assert!(!repo.has_proposal_relationship(id).await.unwrap());

        repo.update(&Vehicle {
            plate: Some("ABC1234".to_string()),
            ..saved
        })
        .await
        .unwrap();
        assert_eq!(
            repo.get_by_id(id).await.unwrap().unwrap().plate.as_deref(),
            Some("ABC1234")
        );

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_chassis(&chassis(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_chassis() {
        let db = test_db().await;
        let g = Graph::seed(&db).await;

        let err = db.vehicles().save(&vehicle(g.model_id, 1)).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
