pub mod date_range;
pub mod education;
pub mod experience;
pub mod locator;
pub mod profile;
