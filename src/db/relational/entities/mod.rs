pub mod prelude;

pub mod financing_application;
pub mod staff_user;
pub mod vehicle;
