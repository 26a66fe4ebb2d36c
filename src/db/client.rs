use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::db::models::*;

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Initialize database connection and create tables
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        // Use sqlite:// with ?mode=rwc to create if it doesn't exist
        let database_url = format!("sqlite://{}?mode=rwc", database_path);
        info!("Connecting to {}", database_url);
        let pool = SqlitePool::connect(&database_url).await?;

        let db = Database { pool };
        db.create_tables().await?;
        Ok(db)
    }

    /// Connection pool, for callers that manage their own transactions
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all necessary tables
    async fn create_tables(&self) -> Result<(), sqlx::Error> {
        // Sellers table (tenants)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sellers (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                cnpj TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Categories table (shared across sellers, name is the natural key)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                display_order INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Vehicle brands table (shared across sellers)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vehicle_brands (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                logo_url TEXT,
                display_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Vehicles table (normalized name is the primary key)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vehicles (
                name TEXT PRIMARY KEY,
                start_year INTEGER,
                end_year INTEGER,
                vehicle_type TEXT,
                brand_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (brand_id) REFERENCES vehicle_brands (id)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Products table (code is supplied by the seller)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_manufactured BOOLEAN NOT NULL DEFAULT TRUE,
                bar_code INTEGER,
                gear_quantity INTEGER,
                gear_dimensions TEXT,
                cross_reference TEXT,
                category_id TEXT NOT NULL,
                seller_id INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories (id)
                    ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY (seller_id) REFERENCES sellers (id)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Product images table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS product_images (
                product_code TEXT NOT NULL,
                image_id TEXT NOT NULL,
                url TEXT NOT NULL,
                PRIMARY KEY (product_code, image_id),
                FOREIGN KEY (product_code) REFERENCES products (code)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Compatibility edges (product <-> vehicle)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS compatibilities (
                product_code TEXT NOT NULL,
                vehicle_name TEXT NOT NULL,
                PRIMARY KEY (product_code, vehicle_name),
                FOREIGN KEY (product_code) REFERENCES products (code)
                    ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY (vehicle_name) REFERENCES vehicles (name)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Seller-category junction table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seller_categories (
                seller_id INTEGER NOT NULL,
                category_id TEXT NOT NULL,
                PRIMARY KEY (seller_id, category_id),
                FOREIGN KEY (seller_id) REFERENCES sellers (id)
                    ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories (id)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Seller-brand junction table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seller_brands (
                seller_id INTEGER NOT NULL,
                brand_id TEXT NOT NULL,
                PRIMARY KEY (seller_id, brand_id),
                FOREIGN KEY (seller_id) REFERENCES sellers (id)
                    ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY (brand_id) REFERENCES vehicle_brands (id)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Seller-vehicle junction table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seller_vehicles (
                seller_id INTEGER NOT NULL,
                vehicle_name TEXT NOT NULL,
                PRIMARY KEY (seller_id, vehicle_name),
                FOREIGN KEY (seller_id) REFERENCES sellers (id)
                    ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY (vehicle_name) REFERENCES vehicles (name)
                    ON UPDATE CASCADE ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Indexes for foreign-key lookups
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products (category_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_seller ON products (seller_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vehicles_brand ON vehicles (brand_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_compatibilities_vehicle ON compatibilities (vehicle_name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new seller
    pub async fn insert_seller(&self, seller: &DbSeller) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sellers (id, name, cnpj, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(seller.id)
        .bind(&seller.name)
        .bind(&seller.cnpj)
        .bind(seller.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get category by normalized name (the natural key)
    pub async fn get_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DbCategory>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            Ok(Some(DbCategory {
                id: row.get("id"),
                name: row.get("name"),
                display_order: row.get("display_order"),
                created_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
                    .unwrap()
                    .with_timezone(&Utc),
            }))
        } else {
            Ok(None)
        }
    }

    /// Get vehicle brand by normalized name
    pub async fn get_vehicle_brand_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DbVehicleBrand>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM vehicle_brands WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            Ok(Some(DbVehicleBrand {
                id: row.get("id"),
                name: row.get("name"),
                logo_url: row.get("logo_url"),
                display_order: row.get("display_order"),
                created_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
                    .unwrap()
                    .with_timezone(&Utc),
            }))
        } else {
            Ok(None)
        }
    }

    /// Get vehicle by normalized name
    pub async fn get_vehicle_by_name(&self, name: &str) -> Result<Option<DbVehicle>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM vehicles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            Ok(Some(DbVehicle {
                name: row.get("name"),
                start_year: row.get("start_year"),
                end_year: row.get("end_year"),
                vehicle_type: row.get("vehicle_type"),
                brand_id: row.get("brand_id"),
                created_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
                    .unwrap()
                    .with_timezone(&Utc),
            }))
        } else {
            Ok(None)
        }
    }

    /// Get product by code
    pub async fn get_product_by_code(&self, code: &str) -> Result<Option<DbProduct>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM products WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            Ok(Some(DbProduct {
                code: row.get("code"),
                name: row.get("name"),
                description: row.get("description"),
                is_active: row.get("is_active"),
                is_manufactured: row.get("is_manufactured"),
                bar_code: row.get("bar_code"),
                gear_quantity: row.get("gear_quantity"),
                gear_dimensions: row.get("gear_dimensions"),
                cross_reference: row.get("cross_reference"),
                category_id: row.get("category_id"),
                seller_id: row.get("seller_id"),
                created_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
                    .unwrap()
                    .with_timezone(&Utc),
            }))
        } else {
            Ok(None)
        }
    }

    /// Get all images for a product, ordered by image id
    pub async fn get_images_for_product(
        &self,
        product_code: &str,
    ) -> Result<Vec<DbProductImage>, sqlx::Error> {
        let rows =
            sqlx::query("SELECT * FROM product_images WHERE product_code = ? ORDER BY image_id")
                .bind(product_code)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| DbProductImage {
                product_code: row.get("product_code"),
                image_id: row.get("image_id"),
                url: row.get("url"),
            })
            .collect())
    }

    /// Get the names of all vehicles compatible with a product
    pub async fn get_compatible_vehicle_names(
        &self,
        product_code: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT vehicle_name FROM compatibilities WHERE product_code = ? ORDER BY vehicle_name",
        )
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("vehicle_name")).collect())
    }

    /// Check whether a seller has adopted a category
    pub async fn seller_has_category(
        &self,
        seller_id: i64,
        category_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT seller_id FROM seller_categories WHERE seller_id = ? AND category_id = ?",
        )
        .bind(seller_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Check whether a seller has adopted a vehicle brand
    pub async fn seller_has_brand(
        &self,
        seller_id: i64,
        brand_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row =
            sqlx::query("SELECT seller_id FROM seller_brands WHERE seller_id = ? AND brand_id = ?")
                .bind(seller_id)
                .bind(brand_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Check whether a seller has adopted a vehicle
    pub async fn seller_has_vehicle(
        &self,
        seller_id: i64,
        vehicle_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT seller_id FROM seller_vehicles WHERE seller_id = ? AND vehicle_name = ?",
        )
        .bind(seller_id)
        .bind(vehicle_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Count categories
    pub async fn count_categories(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Count vehicle brands
    pub async fn count_brands(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM vehicle_brands")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Count vehicles
    pub async fn count_vehicles(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM vehicles")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Count products
    pub async fn count_products(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Count compatibility edges
    pub async fn count_compatibilities(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM compatibilities")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

/// True when the error is a unique or primary-key violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
