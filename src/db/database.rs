use crate::catalog::sort::SortOrder;
use crate::configuration::{DatabaseSettings, DatabaseType};
use crate::db::errors::DBError;
use crate::db::financing_application::FinancingApplication;
use crate::db::in_memory::InMemoryDB;
use crate::db::relational::RelationalDB;
use crate::db::staff_user::StaffUser;
use crate::db::traits::VehicleStore;
use crate::db::vehicle::{Vehicle, VehicleKind};
use crate::db::vehicle_filter::{FacetField, PriceYearBounds, VehicleFilter};
use crate::errors::AppErrors;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::Database as SeaOrmDB;
use tracing::info;
use uuid::Uuid;

#[derive(Debug)]
pub enum Database {
    InMemory(Box<InMemoryDB>),
    Relational(RelationalDB),
}

impl Database {
    pub async fn try_from(settings: &DatabaseSettings) -> Result<Self, AppErrors> {
        settings.check_if_valid()?;
        match settings.db_type {
            DatabaseType::InMemory => {
                let db = match &settings.file_path {
                    Some(file_path) => InMemoryDB::try_from(file_path.to_owned())?,
                    None => InMemoryDB::default(),
                };
                info!("using in-memory storage");
                Ok(Self::InMemory(Box::new(db)))
            }
            DatabaseType::Relational => {
                let connection_settings = settings.relational_connection()?;
                let connection = SeaOrmDB::connect(connection_settings)
                    .await
                    .map_err(|e| AppErrors::DatabaseError(DBError::Relational(e)))?;
                let db = RelationalDB::init(connection);
                db.create_tables().await?;
                info!("connected to relational storage");
                Ok(Self::Relational(db))
            }
        }
    }

    pub async fn close(self) -> Result<(), DBError> {
        match self {
            Database::InMemory(_) => Ok(()),
            Database::Relational(db) => db.close().await,
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StaffUser>, DBError> {
        match self {
            Database::InMemory(db) => db.find_user_by_email(email),
            Database::Relational(db) => db.find_user_by_email(email).await,
        }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<StaffUser>, DBError> {
        match self {
            Database::InMemory(db) => db.get_user(id),
            Database::Relational(db) => db.get_user(id).await,
        }
    }

    pub async fn all_users(&self) -> Result<Vec<StaffUser>, DBError> {
        match self {
            Database::InMemory(db) => db.all_users(),
            Database::Relational(db) => db.all_users().await,
        }
    }

    pub async fn insert_user(&self, user: StaffUser) -> Result<StaffUser, DBError> {
        match self {
            Database::InMemory(db) => db.insert_user(user),
            Database::Relational(db) => db.insert_user(user).await,
        }
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, DBError> {
        match self {
            Database::InMemory(db) => db.delete_user(id),
            Database::Relational(db) => db.delete_user(id).await,
        }
    }

    pub async fn insert_financing(
        &self,
        application: FinancingApplication,
    ) -> Result<FinancingApplication, DBError> {
        match self {
            Database::InMemory(db) => db.insert_financing(application),
            Database::Relational(db) => db.insert_financing(application).await,
        }
    }

    pub async fn has_financing_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, DBError> {
        match self {
            Database::InMemory(db) => db.has_financing_since(email, since),
            Database::Relational(db) => db.has_financing_since(email, since).await,
        }
    }

    pub async fn all_financing(&self) -> Result<Vec<FinancingApplication>, DBError> {
        match self {
            Database::InMemory(db) => db.all_financing(),
            Database::Relational(db) => db.all_financing().await,
        }
    }
}

#[async_trait]
impl VehicleStore for Database {
    async fn find_vehicles(
        &self,
        filter: &VehicleFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Vehicle>, DBError> {
        match self {
            Database::InMemory(db) => db.find_vehicles(filter, sort, skip, limit),
            Database::Relational(db) => db.find_vehicles(filter, sort, skip, limit).await,
        }
    }

    async fn count_vehicles(&self, filter: &VehicleFilter) -> Result<u64, DBError> {
        match self {
            Database::InMemory(db) => db.count_vehicles(filter),
            Database::Relational(db) => db.count_vehicles(filter).await,
        }
    }

    async fn distinct_values(
        &self,
        field: FacetField,
        filter: &VehicleFilter,
    ) -> Result<Vec<String>, DBError> {
        match self {
            Database::InMemory(db) => db.distinct_values(field, filter),
            Database::Relational(db) => db.distinct_values(field, filter).await,
        }
    }

    async fn price_year_bounds(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Option<PriceYearBounds>, DBError> {
        match self {
            Database::InMemory(db) => db.price_year_bounds(filter),
            Database::Relational(db) => db.price_year_bounds(filter).await,
        }
    }

    async fn view_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError> {
        match self {
            Database::InMemory(db) => db.view_vehicle(kind, id),
            Database::Relational(db) => db.view_vehicle(kind, id).await,
        }
    }

    async fn get_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError> {
        match self {
            Database::InMemory(db) => db.get_vehicle(kind, id),
            Database::Relational(db) => db.get_vehicle(kind, id).await,
        }
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, DBError> {
        match self {
            Database::InMemory(db) => db.insert_vehicle(vehicle),
            Database::Relational(db) => db.insert_vehicle(vehicle).await,
        }
    }

    async fn replace_vehicle(&self, vehicle: Vehicle) -> Result<Option<Vehicle>, DBError> {
        match self {
            Database::InMemory(db) => db.replace_vehicle(vehicle),
            Database::Relational(db) => db.replace_vehicle(vehicle).await,
        }
    }

    async fn delete_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<bool, DBError> {
        match self {
            Database::InMemory(db) => db.delete_vehicle(kind, id),
            Database::Relational(db) => db.delete_vehicle(kind, id).await,
        }
    }
}
