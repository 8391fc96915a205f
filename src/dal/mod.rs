pub mod profile_db;
