pub use super::financing_application::Entity as FinancingApplication;
pub use super::staff_user::Entity as StaffUser;
pub use super::vehicle::Entity as Vehicle;
