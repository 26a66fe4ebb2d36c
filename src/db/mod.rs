pub mod client;
pub mod models;

pub use client::{is_unique_violation, Database};
pub use models::*;
