use crate::catalog::sort::SortOrder;
use crate::db::errors::{DBError, InMemoryError};
use crate::db::financing_application::FinancingApplication;
use crate::db::staff_user::{normalize_email, StaffUser};
use crate::db::vehicle::{Vehicle, VehicleKind};
use crate::db::vehicle_filter::{FacetField, PriceYearBounds, VehicleFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileStructure {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub users: Vec<StaffUser>,
    #[serde(default)]
    pub financing_applications: Vec<FinancingApplication>,
}

#[derive(Debug, Default)]
pub struct InMemoryDB {
    pub vehicles: RwLock<Vec<Vehicle>>,
    pub users: RwLock<Vec<StaffUser>>,
    pub financing_applications: RwLock<Vec<FinancingApplication>>,
}

impl TryFrom<String> for InMemoryDB {
    type Error = DBError;

    fn try_from(file_path: String) -> Result<Self, Self::Error> {
        let data = fs::read_to_string(file_path)
            .map_err(|e| DBError::InMemoryError(InMemoryError::IoError(e)))?;
        let db: FileStructure = serde_json::from_str(&data)
            .map_err(|e| DBError::InMemoryError(InMemoryError::SerdeError(e)))?;
        Ok(Self::from(db))
    }
}

impl From<FileStructure> for InMemoryDB {
    fn from(db: FileStructure) -> Self {
        let users = db
            .users
            .into_iter()
            .map(|user| StaffUser {
                email: normalize_email(&user.email),
                ..user
            })
            .collect();
        Self {
            vehicles: RwLock::new(db.vehicles),
            users: RwLock::new(users),
            financing_applications: RwLock::new(db.financing_applications),
        }
    }
}

impl InMemoryDB {
    pub fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles: RwLock::new(vehicles),
            ..Default::default()
        }
    }

    pub fn find_vehicles(
        &self,
        filter: &VehicleFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Vehicle>, DBError> {
        let vehicles = self.vehicles.read()?;
        let mut selected: Vec<Vehicle> = vehicles
            .iter()
            .filter(|vehicle| filter.matches(vehicle))
            .cloned()
            .collect();
        selected.sort_by(|a, b| sort.compare(a, b));
        Ok(selected
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    pub fn count_vehicles(&self, filter: &VehicleFilter) -> Result<u64, DBError> {
        let vehicles = self.vehicles.read()?;
        Ok(vehicles.iter().filter(|vehicle| filter.matches(vehicle)).count() as u64)
    }

    pub fn distinct_values(
        &self,
        field: FacetField,
        filter: &VehicleFilter,
    ) -> Result<Vec<String>, DBError> {
        let vehicles = self.vehicles.read()?;
        let values: BTreeSet<String> = vehicles
            .iter()
            .filter(|vehicle| filter.matches(vehicle))
            .filter_map(|vehicle| field.value_of(vehicle))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        Ok(values.into_iter().collect())
    }

    pub fn price_year_bounds(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Option<PriceYearBounds>, DBError> {
        let vehicles = self.vehicles.read()?;
        Ok(vehicles
            .iter()
            .filter(|vehicle| filter.matches(vehicle))
            .fold(None, |bounds: Option<PriceYearBounds>, vehicle| {
                Some(match bounds {
                    None => PriceYearBounds {
                        min_price: vehicle.price,
                        max_price: vehicle.price,
                        min_year: vehicle.year,
                        max_year: vehicle.year,
                    },
                    Some(bounds) => PriceYearBounds {
                        min_price: bounds.min_price.min(vehicle.price),
                        max_price: bounds.max_price.max(vehicle.price),
                        min_year: bounds.min_year.min(vehicle.year),
                        max_year: bounds.max_year.max(vehicle.year),
                    },
                })
            }))
    }

    pub fn view_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError> {
        let mut vehicles = self.vehicles.write()?;
        Ok(vehicles
            .iter_mut()
            .find(|vehicle| vehicle.id == id && vehicle.kind() == kind)
            .map(|vehicle| {
                vehicle.views += 1;
                vehicle.clone()
            }))
    }

    pub fn get_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError> {
        let vehicles = self.vehicles.read()?;
        Ok(vehicles
            .iter()
            .find(|vehicle| vehicle.id == id && vehicle.kind() == kind)
            .cloned())
    }

    pub fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, DBError> {
        let mut vehicles = self.vehicles.write()?;
        vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    pub fn replace_vehicle(&self, vehicle: Vehicle) -> Result<Option<Vehicle>, DBError> {
        let mut vehicles = self.vehicles.write()?;
        match vehicles
            .iter_mut()
            .find(|stored| stored.id == vehicle.id && stored.kind() == vehicle.kind())
        {
            Some(stored) => {
                *stored = vehicle.clone();
                Ok(Some(vehicle))
            }
            None => Ok(None),
        }
    }

    pub fn delete_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<bool, DBError> {
        let mut vehicles = self.vehicles.write()?;
        let before = vehicles.len();
        vehicles.retain(|vehicle| !(vehicle.id == id && vehicle.kind() == kind));
        Ok(vehicles.len() < before)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<StaffUser>, DBError> {
        let email = normalize_email(email);
        let users = self.users.read()?;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<StaffUser>, DBError> {
        let users = self.users.read()?;
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    pub fn all_users(&self) -> Result<Vec<StaffUser>, DBError> {
        let mut users = self.users.read()?.clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    pub fn insert_user(&self, user: StaffUser) -> Result<StaffUser, DBError> {
        let mut users = self.users.write()?;
        if users.iter().any(|stored| stored.email == user.email) {
            return Err(DBError::DuplicateEmail);
        }
        users.push(user.clone());
        Ok(user)
    }

    pub fn delete_user(&self, id: Uuid) -> Result<bool, DBError> {
        let mut users = self.users.write()?;
        let before = users.len();
        users.retain(|user| user.id != id);
        Ok(users.len() < before)
    }

    pub fn insert_financing(
        &self,
        application: FinancingApplication,
    ) -> Result<FinancingApplication, DBError> {
        let mut applications = self.financing_applications.write()?;
        applications.push(application.clone());
        Ok(application)
    }

    pub fn has_financing_since(&self, email: &str, since: DateTime<Utc>) -> Result<bool, DBError> {
        let email = normalize_email(email);
        let applications = self.financing_applications.read()?;
        Ok(applications
            .iter()
            .any(|application| application.applicant_email == email && application.submitted_at >= since))
    }

    pub fn all_financing(&self) -> Result<Vec<FinancingApplication>, DBError> {
        let mut applications = self.financing_applications.read()?.clone();
        applications.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(applications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sort::SortField;
    use crate::db::vehicle::fixtures;
    use chrono::Duration;
    use std::io::Write;

    fn fords() -> Vec<Vehicle> {
        [15000.0, 22000.0, 25000.0, 38000.0, 50000.0]
            .into_iter()
            .enumerate()
            .map(|(i, price)| fixtures::gas("Ford", &format!("Model {i}"), 2020, price))
            .collect()
    }

    #[test]
    fn find_sorts_skips_and_limits() {
        let db = InMemoryDB::with_vehicles(fords());
        let filter = VehicleFilter::available(VehicleKind::Gas);
        let page = db
            .find_vehicles(&filter, SortOrder::desc(SortField::Price), 1, 2)
            .expect("Failed to find vehicles");
        let prices: Vec<f64> = page.iter().map(|vehicle| vehicle.price).collect();
        assert_eq!(prices, vec![38000.0, 25000.0]);
        assert_eq!(db.count_vehicles(&filter).unwrap(), 5);
    }

    #[test]
    fn view_increments_once_per_call() {
        let car = fixtures::gas("Ford", "Focus", 2020, 15000.0);
        let id = car.id;
        let db = InMemoryDB::with_vehicles(vec![car]);
        db.view_vehicle(VehicleKind::Gas, id).unwrap();
        let viewed = db.view_vehicle(VehicleKind::Gas, id).unwrap().expect("Vehicle missing");
        assert_eq!(viewed.views, 2);
        assert!(db.view_vehicle(VehicleKind::Electric, id).unwrap().is_none());
    }

    #[test]
    fn distinct_values_are_sorted_and_skip_blanks() {
        let blank = fixtures::gas("  ", "X", 2020, 1000.0);
        let db = InMemoryDB::with_vehicles(vec![
            fixtures::gas("Toyota", "Camry", 2020, 20000.0),
            fixtures::gas("BMW", "X5", 2021, 50000.0),
            fixtures::gas("Toyota", "Corolla", 2019, 18000.0),
            blank,
        ]);
        let brands = db
            .distinct_values(FacetField::Brand, &VehicleFilter::available(VehicleKind::Gas))
            .unwrap();
        assert_eq!(brands, vec!["BMW".to_string(), "Toyota".to_string()]);
    }

    #[test]
    fn bounds_cover_matching_vehicles() {
        let db = InMemoryDB::with_vehicles(vec![
            fixtures::gas("Toyota", "Camry", 2018, 20000.0),
            fixtures::gas("BMW", "X5", 2022, 50000.0),
        ]);
        let bounds = db
            .price_year_bounds(&VehicleFilter::available(VehicleKind::Gas))
            .unwrap()
            .expect("Bounds missing");
        assert_eq!(bounds.min_price, 20000.0);
        assert_eq!(bounds.max_price, 50000.0);
        assert_eq!((bounds.min_year, bounds.max_year), (2018, 2022));
        assert!(db
            .price_year_bounds(&VehicleFilter::available(VehicleKind::Electric))
            .unwrap()
            .is_none());
    }

    #[test]
    fn replace_and_delete_respect_kind() {
        let mut car = fixtures::gas("Ford", "Focus", 2020, 15000.0);
        let db = InMemoryDB::with_vehicles(vec![car.clone()]);
        car.price = 14000.0;
        assert!(db.replace_vehicle(car.clone()).unwrap().is_some());
        assert_eq!(db.get_vehicle(VehicleKind::Gas, car.id).unwrap().unwrap().price, 14000.0);
        assert!(!db.delete_vehicle(VehicleKind::Electric, car.id).unwrap());
        assert!(db.delete_vehicle(VehicleKind::Gas, car.id).unwrap());
        assert!(db.replace_vehicle(car).unwrap().is_none());
    }

    #[test]
    fn duplicate_emails_are_rejected() {
        let db = InMemoryDB::default();
        db.insert_user(StaffUser::new("Ana", "ana@dealer.test", "h".to_string(), true))
            .expect("Failed to insert user");
        let result = db.insert_user(StaffUser::new("Ana", "ANA@dealer.test", "h".to_string(), false));
        assert!(matches!(result, Err(DBError::DuplicateEmail)));
        assert!(db.find_user_by_email(" Ana@Dealer.test").unwrap().is_some());
    }

    #[test]
    fn recent_financing_window() {
        let db = InMemoryDB::default();
        let submitted_at = Utc::now() - Duration::hours(30);
        db.insert_financing(FinancingApplication {
            id: Uuid::new_v4(),
            submitted_at,
            applicant_email: "jo@buyer.test".to_string(),
            applicant_name: "Jo Buyer".to_string(),
            vehicle: "2022 Ford Mustang".to_string(),
            details: serde_json::json!({}),
        })
        .unwrap();
        let day_ago = Utc::now() - Duration::hours(24);
        assert!(!db.has_financing_since("jo@buyer.test", day_ago).unwrap());
        assert!(db
            .has_financing_since("Jo@Buyer.test", submitted_at - Duration::minutes(1))
            .unwrap());
    }

    #[test]
    fn loads_seed_file() {
        let vehicle = fixtures::electric("Tesla", "Model 3", 2022, 40000.0, 358.0);
        let seed = serde_json::json!({ "vehicles": [vehicle] });
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{seed}").expect("Failed to write seed");

        let path = file.path().to_string_lossy().to_string();
        let db = InMemoryDB::try_from(path).expect("Failed to load seed");
        assert_eq!(db.get_vehicle(VehicleKind::Electric, vehicle.id).unwrap(), Some(vehicle));
        assert!(db.all_users().unwrap().is_empty());
    }
}
