pub mod default_route;
pub mod profile_route;
