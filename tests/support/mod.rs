pub mod mock_compat_source;

pub use mock_compat_source::MockCompatSource;

use chrono::Utc;
use parts_catalog::db::{Database, DbSeller};
use parts_catalog::identity::HashIdentity;
use tempfile::TempDir;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub const TEST_SELLER: i64 = 1;

/// A fresh catalog on a temp database, with one seller already registered
pub struct TestCatalog {
    pub database: Database,
    pub identity: HashIdentity,
    _temp: TempDir,
}

pub async fn setup() -> TestCatalog {
    tracing_init();

    let temp = TempDir::new().expect("Failed to create temp dir");
    let db_file = temp.path().join("test.db");
    let database = Database::new(db_file.to_str().unwrap())
        .await
        .expect("Failed to create database");

    database
        .insert_seller(&DbSeller::new(
            TEST_SELLER,
            "Auto Pecas Silva",
            "12345678000190",
        ))
        .await
        .expect("Failed to insert seller");

    TestCatalog {
        database,
        identity: HashIdentity::new("test-secret"),
        _temp: temp,
    }
}

impl TestCatalog {
    pub async fn seed_category(&self, id: &str, name: &str) {
        sqlx::query(
            "INSERT INTO categories (id, name, display_order, created_at) VALUES (?, ?, 1, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(self.database.pool())
        .await
        .expect("Failed to seed category");
    }

    pub async fn seed_brand(&self, id: &str, name: &str) {
        sqlx::query(
            "INSERT INTO vehicle_brands (id, name, logo_url, display_order, created_at) \
             VALUES (?, ?, NULL, 0, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(self.database.pool())
        .await
        .expect("Failed to seed brand");
    }

    pub async fn seed_vehicle(&self, name: &str, brand_id: &str) {
        sqlx::query(
            "INSERT INTO vehicles (name, start_year, end_year, vehicle_type, brand_id, created_at) \
             VALUES (?, NULL, NULL, NULL, ?, ?)",
        )
        .bind(name)
        .bind(brand_id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.database.pool())
        .await
        .expect("Failed to seed vehicle");
    }

    pub async fn seed_product(&self, code: &str, category_id: &str) {
        sqlx::query(
            "INSERT INTO products (code, name, description, is_active, is_manufactured, \
             category_id, seller_id, created_at) VALUES (?, ?, NULL, 1, 1, ?, ?, ?)",
        )
        .bind(code)
        .bind(format!("Product {}", code))
        .bind(category_id)
        .bind(TEST_SELLER)
        .bind(Utc::now().to_rfc3339())
        .execute(self.database.pool())
        .await
        .expect("Failed to seed product");
    }
}
