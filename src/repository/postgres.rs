use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{ApplicationFilter, RepoResult, Repository, RepositoryError, status_moved};
use crate::models::{
    AdminOverview, ApplicationStatus, Barangay, Business, BusinessCategory,
    CreateApplicationRequest, CreateBarangayRequest, CreateBusinessRequest,
    CreateCategoryRequest, CreateHazardZoneRequest, CreateZoneRequest, DocumentField, HazardZone,
    Role, StatusCount, UpdateApplicationRequest, UpdateBarangayRequest, UpdateBusinessRequest,
    UpdateCategoryRequest, UpdateHazardZoneRequest, UpdateZoneRequest, User, Zone,
    ZoningApplication,
};

const APPLICATION_COLUMNS: &str = "id, application_no, applicant_id, business_id, barangay_id, zone_id, \
     project_title, lot_area_sqm, status, remarks, proof_of_residency, barangay_clearance, lot_plan, \
     location_map, tax_declaration, business_permit, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by Postgres. Queries are checked at runtime so the crate builds
/// without a live database; the schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolves a status-guarded UPDATE that matched no row: missing id is `None`, a row
    /// with another status is a `Conflict`.
    async fn guarded(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        updated: Option<ZoningApplication>,
    ) -> RepoResult<Option<ZoningApplication>> {
        if updated.is_some() {
            return Ok(updated);
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM zoning_applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match current {
            None => Ok(None),
            Some(raw) => {
                let actual = raw
                    .parse::<ApplicationStatus>()
                    .map_err(|_| RepositoryError::Decode(format!("unknown application status {raw}")))?;
                Err(status_moved(id, expected, actual))
            }
        }
    }

    async fn delete_by_id(&self, table: &'static str, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT id, email, full_name, role FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        Ok(sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, email, full_name, role) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, full_name, role",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "UPDATE profiles SET role = $2 WHERE id = $1 RETURNING id, email, full_name, role",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    // --- BARANGAYS ---

    async fn list_barangays(&self) -> RepoResult<Vec<Barangay>> {
        Ok(sqlx::query_as::<_, Barangay>(
            "SELECT id, name, district, created_at, updated_at FROM barangays ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_barangay(&self, id: Uuid) -> RepoResult<Option<Barangay>> {
        Ok(sqlx::query_as::<_, Barangay>(
            "SELECT id, name, district, created_at, updated_at FROM barangays WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_barangay(&self, req: CreateBarangayRequest) -> RepoResult<Barangay> {
        Ok(sqlx::query_as::<_, Barangay>(
            "INSERT INTO barangays (id, name, district, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) \
             RETURNING id, name, district, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.district)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_barangay(&self, id: Uuid, req: UpdateBarangayRequest) -> RepoResult<Option<Barangay>> {
        Ok(sqlx::query_as::<_, Barangay>(
            "UPDATE barangays SET name = COALESCE($2, name), district = COALESCE($3, district), \
             updated_at = NOW() WHERE id = $1 \
             RETURNING id, name, district, created_at, updated_at",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.district)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_barangay(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("barangays", id).await
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<BusinessCategory>> {
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "SELECT id, name, description, created_at, updated_at FROM business_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<BusinessCategory>> {
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "SELECT id, name, description, created_at, updated_at FROM business_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<BusinessCategory> {
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "INSERT INTO business_categories (id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) \
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> RepoResult<Option<BusinessCategory>> {
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "UPDATE business_categories SET name = COALESCE($2, name), \
             description = COALESCE($3, description), updated_at = NOW() WHERE id = $1 \
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("business_categories", id).await
    }

    // --- ZONES ---

    async fn list_zones(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<Zone>> {
        Ok(sqlx::query_as::<_, Zone>(
            "SELECT id, code, name, description, barangay_id, created_at, updated_at FROM zones \
             WHERE ($1::uuid IS NULL OR barangay_id = $1) ORDER BY code",
        )
        .bind(barangay_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_zone(&self, id: Uuid) -> RepoResult<Option<Zone>> {
        Ok(sqlx::query_as::<_, Zone>(
            "SELECT id, code, name, description, barangay_id, created_at, updated_at FROM zones WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_zone(&self, req: CreateZoneRequest) -> RepoResult<Zone> {
        Ok(sqlx::query_as::<_, Zone>(
            "INSERT INTO zones (id, code, name, description, barangay_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             RETURNING id, code, name, description, barangay_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.code)
        .bind(req.name)
        .bind(req.description)
        .bind(req.barangay_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_zone(&self, id: Uuid, req: UpdateZoneRequest) -> RepoResult<Option<Zone>> {
        Ok(sqlx::query_as::<_, Zone>(
            "UPDATE zones SET code = COALESCE($2, code), name = COALESCE($3, name), \
             description = COALESCE($4, description), barangay_id = COALESCE($5, barangay_id), \
             updated_at = NOW() WHERE id = $1 \
             RETURNING id, code, name, description, barangay_id, created_at, updated_at",
        )
        .bind(id)
        .bind(req.code)
        .bind(req.name)
        .bind(req.description)
        .bind(req.barangay_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_zone(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("zones", id).await
    }

    // --- HAZARD ZONES ---

    async fn list_hazards(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<HazardZone>> {
        Ok(sqlx::query_as::<_, HazardZone>(
            "SELECT id, name, hazard_type, level, barangay_id, created_at, updated_at FROM hazard_zones \
             WHERE ($1::uuid IS NULL OR barangay_id = $1) ORDER BY name",
        )
        .bind(barangay_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_hazard(&self, id: Uuid) -> RepoResult<Option<HazardZone>> {
        Ok(sqlx::query_as::<_, HazardZone>(
            "SELECT id, name, hazard_type, level, barangay_id, created_at, updated_at FROM hazard_zones WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_hazard(&self, req: CreateHazardZoneRequest) -> RepoResult<HazardZone> {
        Ok(sqlx::query_as::<_, HazardZone>(
            "INSERT INTO hazard_zones (id, name, hazard_type, level, barangay_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             RETURNING id, name, hazard_type, level, barangay_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.hazard_type)
        .bind(req.level.as_str())
        .bind(req.barangay_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_hazard(&self, id: Uuid, req: UpdateHazardZoneRequest) -> RepoResult<Option<HazardZone>> {
        Ok(sqlx::query_as::<_, HazardZone>(
            "UPDATE hazard_zones SET name = COALESCE($2, name), hazard_type = COALESCE($3, hazard_type), \
             level = COALESCE($4, level), barangay_id = COALESCE($5, barangay_id), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, name, hazard_type, level, barangay_id, created_at, updated_at",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.hazard_type)
        .bind(req.level.map(|level| level.as_str()))
        .bind(req.barangay_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_hazard(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("hazard_zones", id).await
    }

    // --- BUSINESSES ---

    async fn list_businesses(&self, owner_id: Option<Uuid>) -> RepoResult<Vec<Business>> {
        Ok(sqlx::query_as::<_, Business>(
            "SELECT id, owner_id, name, category_id, barangay_id, address, created_at, updated_at \
             FROM businesses WHERE ($1::uuid IS NULL OR owner_id = $1) ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_business(&self, id: Uuid) -> RepoResult<Option<Business>> {
        Ok(sqlx::query_as::<_, Business>(
            "SELECT id, owner_id, name, category_id, barangay_id, address, created_at, updated_at \
             FROM businesses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_business(&self, req: CreateBusinessRequest, owner_id: Uuid) -> RepoResult<Business> {
        Ok(sqlx::query_as::<_, Business>(
            "INSERT INTO businesses (id, owner_id, name, category_id, barangay_id, address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING id, owner_id, name, category_id, barangay_id, address, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(req.name)
        .bind(req.category_id)
        .bind(req.barangay_id)
        .bind(req.address)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_business(&self, id: Uuid, req: UpdateBusinessRequest) -> RepoResult<Option<Business>> {
        Ok(sqlx::query_as::<_, Business>(
            "UPDATE businesses SET name = COALESCE($2, name), category_id = COALESCE($3, category_id), \
             barangay_id = COALESCE($4, barangay_id), address = COALESCE($5, address), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, owner_id, name, category_id, barangay_id, address, created_at, updated_at",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.category_id)
        .bind(req.barangay_id)
        .bind(req.address)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_business(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("businesses", id).await
    }

    // --- ZONING APPLICATIONS ---

    /// Builds the WHERE clause with QueryBuilder so every filter value is bound, never spliced.
    async fn list_applications(&self, filter: ApplicationFilter) -> RepoResult<Vec<ZoningApplication>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM zoning_applications WHERE TRUE"
        ));

        if let Some(applicant_id) = filter.applicant_id {
            builder.push(" AND applicant_id = ");
            builder.push_bind(applicant_id);
        }
        if let Some(barangay_id) = filter.barangay_id {
            builder.push(" AND barangay_id = ");
            builder.push_bind(barangay_id);
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<&'static str> = filter.statuses.iter().map(|s| s.as_str()).collect();
            builder.push(" AND status = ANY(");
            builder.push_bind(statuses);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<ZoningApplication>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_application(&self, id: Uuid) -> RepoResult<Option<ZoningApplication>> {
        Ok(sqlx::query_as::<_, ZoningApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM zoning_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_application_by_no(&self, application_no: &str) -> RepoResult<Option<ZoningApplication>> {
        Ok(sqlx::query_as::<_, ZoningApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM zoning_applications WHERE application_no = $1"
        ))
        .bind(application_no)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// New applications always start as PENDING.
    async fn create_application(
        &self,
        req: CreateApplicationRequest,
        applicant_id: Uuid,
        application_no: String,
    ) -> RepoResult<ZoningApplication> {
        Ok(sqlx::query_as::<_, ZoningApplication>(&format!(
            "INSERT INTO zoning_applications \
             (id, application_no, applicant_id, business_id, barangay_id, zone_id, project_title, \
              lot_area_sqm, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(application_no)
        .bind(applicant_id)
        .bind(req.business_id)
        .bind(req.barangay_id)
        .bind(req.zone_id)
        .bind(req.project_title)
        .bind(req.lot_area_sqm)
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_application(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        req: UpdateApplicationRequest,
    ) -> RepoResult<Option<ZoningApplication>> {
        let updated = sqlx::query_as::<_, ZoningApplication>(&format!(
            "UPDATE zoning_applications SET business_id = COALESCE($3, business_id), \
             zone_id = COALESCE($4, zone_id), project_title = COALESCE($5, project_title), \
             lot_area_sqm = COALESCE($6, lot_area_sqm), updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(req.business_id)
        .bind(req.zone_id)
        .bind(req.project_title)
        .bind(req.lot_area_sqm)
        .fetch_optional(&self.pool)
        .await?;

        self.guarded(id, expected, updated).await
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        remarks: Option<String>,
    ) -> RepoResult<Option<ZoningApplication>> {
        let updated = sqlx::query_as::<_, ZoningApplication>(&format!(
            "UPDATE zoning_applications SET status = $3, remarks = COALESCE($4, remarks), \
             updated_at = NOW() WHERE id = $1 AND status = $2 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(remarks)
        .fetch_optional(&self.pool)
        .await?;

        self.guarded(id, from, updated).await
    }

    async fn attach_document(&self, id: Uuid, field: DocumentField, key: String) -> RepoResult<Option<ZoningApplication>> {
        // The column name comes from a closed enum, never from the request.
        Ok(sqlx::query_as::<_, ZoningApplication>(&format!(
            "UPDATE zoning_applications SET {column} = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}",
            column = field.column()
        ))
        .bind(id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_application(&self, id: Uuid) -> RepoResult<bool> {
        self.delete_by_id("zoning_applications", id).await
    }

    // --- DASHBOARDS ---

    async fn get_overview(&self) -> RepoResult<AdminOverview> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        let total_businesses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses")
            .fetch_one(&self.pool)
            .await?;
        let total_barangays = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM barangays")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM zoning_applications GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let applications_by_status = rows
            .into_iter()
            .map(|(status, count)| {
                status
                    .parse::<ApplicationStatus>()
                    .map(|status| StatusCount { status, count })
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AdminOverview {
            total_users,
            total_businesses,
            total_barangays,
            applications_by_status,
        })
    }
}
