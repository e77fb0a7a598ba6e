use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ApplicationFilter, RepoResult, Repository, RepositoryError, status_moved};
use crate::models::{
    AdminOverview, ApplicationDocuments, ApplicationStatus, Barangay, Business, BusinessCategory,
    CreateApplicationRequest, CreateBarangayRequest, CreateBusinessRequest,
    CreateCategoryRequest, CreateHazardZoneRequest, CreateZoneRequest, DocumentField, HazardZone,
    Role, StatusCount, UpdateApplicationRequest, UpdateBarangayRequest, UpdateBusinessRequest,
    UpdateCategoryRequest, UpdateHazardZoneRequest, UpdateZoneRequest, User, Zone,
    ZoningApplication,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    barangays: HashMap<Uuid, Barangay>,
    categories: HashMap<Uuid, BusinessCategory>,
    zones: HashMap<Uuid, Zone>,
    hazards: HashMap<Uuid, HazardZone>,
    businesses: HashMap<Uuid, Business>,
    applications: HashMap<Uuid, ZoningApplication>,
}

/// InMemoryRepository
///
/// `Repository` kept in process memory. Used by the test suite and for running the
/// API locally without Postgres. Mirrors the Postgres constraints that handlers rely
/// on: unique profile ids and application numbers, and barangays that cannot be deleted
/// while referenced.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile directly, bypassing the auth provider sign-up.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

fn sorted_by<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("profile {} already exists", user.id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    // --- BARANGAYS ---

    async fn list_barangays(&self) -> RepoResult<Vec<Barangay>> {
        let tables = self.tables.read().await;
        Ok(sorted_by(tables.barangays.values().cloned(), |b| b.name.clone()))
    }

    async fn get_barangay(&self, id: Uuid) -> RepoResult<Option<Barangay>> {
        Ok(self.tables.read().await.barangays.get(&id).cloned())
    }

    async fn create_barangay(&self, req: CreateBarangayRequest) -> RepoResult<Barangay> {
        let now = Utc::now();
        let barangay = Barangay {
            id: Uuid::new_v4(),
            name: req.name,
            district: req.district,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.barangays.insert(barangay.id, barangay.clone());
        Ok(barangay)
    }

    async fn update_barangay(&self, id: Uuid, req: UpdateBarangayRequest) -> RepoResult<Option<Barangay>> {
        let mut tables = self.tables.write().await;
        Ok(tables.barangays.get_mut(&id).map(|b| {
            if let Some(name) = req.name {
                b.name = name;
            }
            if req.district.is_some() {
                b.district = req.district;
            }
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn delete_barangay(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.applications.values().any(|a| a.barangay_id == id) {
            return Err(RepositoryError::Conflict(format!(
                "barangay {id} is still referenced by applications"
            )));
        }
        Ok(tables.barangays.remove(&id).is_some())
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<BusinessCategory>> {
        let tables = self.tables.read().await;
        Ok(sorted_by(tables.categories.values().cloned(), |c| c.name.clone()))
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<BusinessCategory>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<BusinessCategory> {
        let now = Utc::now();
        let category = BusinessCategory {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> RepoResult<Option<BusinessCategory>> {
        let mut tables = self.tables.write().await;
        Ok(tables.categories.get_mut(&id).map(|c| {
            if let Some(name) = req.name {
                c.name = name;
            }
            if req.description.is_some() {
                c.description = req.description;
            }
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.categories.remove(&id).is_some())
    }

    // --- ZONES ---

    async fn list_zones(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<Zone>> {
        let tables = self.tables.read().await;
        let zones = tables
            .zones
            .values()
            .filter(|z| barangay_id.is_none() || z.barangay_id == barangay_id)
            .cloned();
        Ok(sorted_by(zones, |z| z.code.clone()))
    }

    async fn get_zone(&self, id: Uuid) -> RepoResult<Option<Zone>> {
        Ok(self.tables.read().await.zones.get(&id).cloned())
    }

    async fn create_zone(&self, req: CreateZoneRequest) -> RepoResult<Zone> {
        let now = Utc::now();
        let zone = Zone {
            id: Uuid::new_v4(),
            code: req.code,
            name: req.name,
            description: req.description,
            barangay_id: req.barangay_id,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.zones.insert(zone.id, zone.clone());
        Ok(zone)
    }

    async fn update_zone(&self, id: Uuid, req: UpdateZoneRequest) -> RepoResult<Option<Zone>> {
        let mut tables = self.tables.write().await;
        Ok(tables.zones.get_mut(&id).map(|z| {
            if let Some(code) = req.code {
                z.code = code;
            }
            if let Some(name) = req.name {
                z.name = name;
            }
            if req.description.is_some() {
                z.description = req.description;
            }
            if req.barangay_id.is_some() {
                z.barangay_id = req.barangay_id;
            }
            z.updated_at = Utc::now();
            z.clone()
        }))
    }

    async fn delete_zone(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.zones.remove(&id).is_some())
    }

    // --- HAZARD ZONES ---

    async fn list_hazards(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<HazardZone>> {
        let tables = self.tables.read().await;
        let hazards = tables
            .hazards
            .values()
            .filter(|h| barangay_id.is_none() || h.barangay_id == barangay_id)
            .cloned();
        Ok(sorted_by(hazards, |h| h.name.clone()))
    }

    async fn get_hazard(&self, id: Uuid) -> RepoResult<Option<HazardZone>> {
        Ok(self.tables.read().await.hazards.get(&id).cloned())
    }

    async fn create_hazard(&self, req: CreateHazardZoneRequest) -> RepoResult<HazardZone> {
        let now = Utc::now();
        let hazard = HazardZone {
            id: Uuid::new_v4(),
            name: req.name,
            hazard_type: req.hazard_type,
            level: req.level,
            barangay_id: req.barangay_id,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.hazards.insert(hazard.id, hazard.clone());
        Ok(hazard)
    }

    async fn update_hazard(&self, id: Uuid, req: UpdateHazardZoneRequest) -> RepoResult<Option<HazardZone>> {
        let mut tables = self.tables.write().await;
        Ok(tables.hazards.get_mut(&id).map(|h| {
            if let Some(name) = req.name {
                h.name = name;
            }
            if let Some(hazard_type) = req.hazard_type {
                h.hazard_type = hazard_type;
            }
            if let Some(level) = req.level {
                h.level = level;
            }
            if req.barangay_id.is_some() {
                h.barangay_id = req.barangay_id;
            }
            h.updated_at = Utc::now();
            h.clone()
        }))
    }

    async fn delete_hazard(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.hazards.remove(&id).is_some())
    }

    // --- BUSINESSES ---

    async fn list_businesses(&self, owner_id: Option<Uuid>) -> RepoResult<Vec<Business>> {
        let tables = self.tables.read().await;
        let businesses = tables
            .businesses
            .values()
            .filter(|b| owner_id.is_none_or(|owner| b.owner_id == owner))
            .cloned();
        Ok(sorted_by(businesses, |b| std::cmp::Reverse(b.created_at)))
    }

    async fn get_business(&self, id: Uuid) -> RepoResult<Option<Business>> {
        Ok(self.tables.read().await.businesses.get(&id).cloned())
    }

    async fn create_business(&self, req: CreateBusinessRequest, owner_id: Uuid) -> RepoResult<Business> {
        let now = Utc::now();
        let business = Business {
            id: Uuid::new_v4(),
            owner_id,
            name: req.name,
            category_id: req.category_id,
            barangay_id: req.barangay_id,
            address: req.address,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.businesses.insert(business.id, business.clone());
        Ok(business)
    }

    async fn update_business(&self, id: Uuid, req: UpdateBusinessRequest) -> RepoResult<Option<Business>> {
        let mut tables = self.tables.write().await;
        Ok(tables.businesses.get_mut(&id).map(|b| {
            if let Some(name) = req.name {
                b.name = name;
            }
            if req.category_id.is_some() {
                b.category_id = req.category_id;
            }
            if req.barangay_id.is_some() {
                b.barangay_id = req.barangay_id;
            }
            if let Some(address) = req.address {
                b.address = address;
            }
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn delete_business(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.businesses.remove(&id).is_some())
    }

    // --- ZONING APPLICATIONS ---

    async fn list_applications(&self, filter: ApplicationFilter) -> RepoResult<Vec<ZoningApplication>> {
        let tables = self.tables.read().await;
        let applications = tables
            .applications
            .values()
            .filter(|a| filter.matches(a))
            .cloned();
        Ok(sorted_by(applications, |a| std::cmp::Reverse(a.created_at)))
    }

    async fn get_application(&self, id: Uuid) -> RepoResult<Option<ZoningApplication>> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn get_application_by_no(&self, application_no: &str) -> RepoResult<Option<ZoningApplication>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .values()
            .find(|a| a.application_no == application_no)
            .cloned())
    }

    async fn create_application(
        &self,
        req: CreateApplicationRequest,
        applicant_id: Uuid,
        application_no: String,
    ) -> RepoResult<ZoningApplication> {
        let mut tables = self.tables.write().await;
        if tables.applications.values().any(|a| a.application_no == application_no) {
            return Err(RepositoryError::Conflict(format!(
                "application number {application_no} already exists"
            )));
        }

        let now = Utc::now();
        let application = ZoningApplication {
            id: Uuid::new_v4(),
            application_no,
            applicant_id,
            business_id: req.business_id,
            barangay_id: req.barangay_id,
            zone_id: req.zone_id,
            project_title: req.project_title,
            lot_area_sqm: req.lot_area_sqm,
            status: ApplicationStatus::Pending,
            remarks: None,
            documents: ApplicationDocuments::default(),
            created_at: now,
            updated_at: now,
        };
        tables.applications.insert(application.id, application.clone());
        Ok(application)
    }

    async fn update_application(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        req: UpdateApplicationRequest,
    ) -> RepoResult<Option<ZoningApplication>> {
        let mut tables = self.tables.write().await;
        let Some(a) = tables.applications.get_mut(&id) else {
            return Ok(None);
        };
        if a.status != expected {
            return Err(status_moved(id, expected, a.status));
        }

        if req.business_id.is_some() {
            a.business_id = req.business_id;
        }
        if req.zone_id.is_some() {
            a.zone_id = req.zone_id;
        }
        if let Some(title) = req.project_title {
            a.project_title = title;
        }
        if req.lot_area_sqm.is_some() {
            a.lot_area_sqm = req.lot_area_sqm;
        }
        a.updated_at = Utc::now();
        Ok(Some(a.clone()))
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        remarks: Option<String>,
    ) -> RepoResult<Option<ZoningApplication>> {
        let mut tables = self.tables.write().await;
        let Some(a) = tables.applications.get_mut(&id) else {
            return Ok(None);
        };
        if a.status != from {
            return Err(status_moved(id, from, a.status));
        }

        a.status = to;
        if remarks.is_some() {
            a.remarks = remarks;
        }
        a.updated_at = Utc::now();
        Ok(Some(a.clone()))
    }

    async fn attach_document(&self, id: Uuid, field: DocumentField, key: String) -> RepoResult<Option<ZoningApplication>> {
        let mut tables = self.tables.write().await;
        Ok(tables.applications.get_mut(&id).map(|a| {
            a.documents.set(field, key);
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete_application(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.applications.remove(&id).is_some())
    }

    async fn get_overview(&self) -> RepoResult<AdminOverview> {
        let tables = self.tables.read().await;
        let applications_by_status = ApplicationStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: tables.applications.values().filter(|a| a.status == status).count() as i64,
            })
            .filter(|entry| entry.count > 0)
            .collect();

        Ok(AdminOverview {
            total_users: tables.users.len() as i64,
            total_businesses: tables.businesses.len() as i64,
            total_barangays: tables.barangays.len() as i64,
            applications_by_status,
        })
    }
}
