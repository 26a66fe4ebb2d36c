// Library exports for integration tests and the CLI binary

pub mod catalog;
pub mod compat_api;
pub mod config;
pub mod db;
pub mod identity;
pub mod import;
