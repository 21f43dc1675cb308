mod database;
mod errors;
pub mod financing_application;
pub mod in_memory;
mod relational;
pub mod staff_user;
pub mod traits;
pub mod vehicle;
pub mod vehicle_filter;

pub use database::Database;
pub use errors::DBError as DatabaseError;
pub use errors::InMemoryError;
pub use financing_application::FinancingApplication;
pub use staff_user::StaffUser;
pub use traits::{ExternalText, VehicleStore};
pub use vehicle::{Vehicle, VehicleKind, VehicleSpecs, VehicleStatus};
