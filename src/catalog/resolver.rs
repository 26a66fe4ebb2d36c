use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use thiserror::Error;
use tracing::info;

use crate::db::client::is_unique_violation;
use crate::db::models::{DbCategory, DbVehicle, DbVehicleBrand};
use crate::identity::HashIdentity;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("entity name is empty after normalization")]
    EmptyName,
    #[error("insert conflict for {kind} '{key}' with no matching row to adopt")]
    ResolutionConflict { kind: &'static str, key: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of one find-or-create resolution
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub entity: T,
    /// True when this call inserted the entity row
    pub created: bool,
    /// True when this call linked the entity to the seller
    pub link_created: bool,
}

/// Attributes for a vehicle that may be created during resolution
///
/// Everything except the name is metadata, captured only when the vehicle
/// is first seen. Resolving an existing vehicle never rewrites it.
#[derive(Debug, Clone)]
pub struct NewVehicle<'a> {
    pub name: &'a str,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub vehicle_type: Option<&'a str>,
    pub brand_id: &'a str,
}

/// Entities seen during this run, keyed by normalized name
///
/// Entries written while a row is in flight stay staged until the caller
/// commits; a rolled-back row discards its staged entries so later rows
/// cannot adopt entities the store never kept.
struct CacheShelf<T> {
    published: HashMap<String, T>,
    staged: HashMap<String, T>,
}

impl<T> CacheShelf<T> {
    fn new() -> Self {
        CacheShelf {
            published: HashMap::new(),
            staged: HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.staged.get(key).or_else(|| self.published.get(key))
    }

    fn stage(&mut self, key: String, entity: T) {
        self.staged.insert(key, entity);
    }

    fn publish(&mut self) {
        self.published.extend(self.staged.drain());
    }

    fn discard(&mut self) {
        self.staged.clear();
    }
}

/// Find-or-create resolution for shared catalog entities
///
/// Methods take a plain connection so the same resolution runs inside an
/// import row's transaction or a short standalone one. The store is the
/// source of truth: every cache miss re-checks it, and a lost insert race
/// is recovered by adopting the row the winner left behind. A conflict
/// that re-query cannot explain surfaces as `ResolutionConflict`.
pub struct EntityResolver {
    identity: HashIdentity,
    categories: CacheShelf<DbCategory>,
    brands: CacheShelf<DbVehicleBrand>,
    vehicles: CacheShelf<DbVehicle>,
}

impl EntityResolver {
    pub fn new(identity: HashIdentity) -> Self {
        EntityResolver {
            identity,
            categories: CacheShelf::new(),
            brands: CacheShelf::new(),
            vehicles: CacheShelf::new(),
        }
    }

    /// Keep entities staged by the current row; call after the row commits
    pub fn publish_staged(&mut self) {
        self.categories.publish();
        self.brands.publish();
        self.vehicles.publish();
    }

    /// Drop entities staged by the current row; call after a rollback
    pub fn discard_staged(&mut self) {
        self.categories.discard();
        self.brands.discard();
        self.vehicles.discard();
    }

    /// Resolve a category by name, creating it if absent
    pub async fn resolve_category(
        &mut self,
        conn: &mut SqliteConnection,
        raw_name: &str,
        seller_id: i64,
    ) -> Result<Resolved<DbCategory>, ResolveError> {
        let name = normalize_key(raw_name).ok_or(ResolveError::EmptyName)?;

        if let Some(category) = self.categories.get(&name).cloned() {
            let link_created = ensure_seller_category(conn, seller_id, &category.id).await?;
            return Ok(Resolved {
                entity: category,
                created: false,
                link_created,
            });
        }

        if let Some(category) = select_category_by_name(conn, &name).await? {
            let link_created = ensure_seller_category(conn, seller_id, &category.id).await?;
            self.categories.stage(name, category.clone());
            return Ok(Resolved {
                entity: category,
                created: false,
                link_created,
            });
        }

        let id = self.identity.derive(&name);
        let created_at = Utc::now();

        // display_order comes from the insert statement itself: SQLite
        // serializes writers, so two concurrent creations cannot read the
        // same max.
        let insert = sqlx::query(
            r#"
            INSERT INTO categories (id, name, display_order, created_at)
            SELECT ?, ?, COALESCE(MAX(display_order), 0) + 1, ?
            FROM categories
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(created_at.to_rfc3339())
        .execute(&mut *conn)
        .await;

        match insert {
            Ok(_) => {
                let row = sqlx::query("SELECT display_order FROM categories WHERE id = ?")
                    .bind(&id)
                    .fetch_one(&mut *conn)
                    .await?;
                let category = DbCategory {
                    id,
                    name: name.clone(),
                    display_order: row.get("display_order"),
                    created_at,
                };

                let link_created = ensure_seller_category(conn, seller_id, &category.id).await?;
                info!("Created category '{}'", name);
                self.categories.stage(name, category.clone());
                Ok(Resolved {
                    entity: category,
                    created: true,
                    link_created,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                let category = select_category_by_name(conn, &name).await?.ok_or_else(|| {
                    ResolveError::ResolutionConflict {
                        kind: "category",
                        key: name.clone(),
                    }
                })?;

                info!("Category '{}' was created concurrently, adopting it", name);
                let link_created = ensure_seller_category(conn, seller_id, &category.id).await?;
                self.categories.stage(name, category.clone());
                Ok(Resolved {
                    entity: category,
                    created: false,
                    link_created,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve a vehicle brand by name, creating it if absent
    pub async fn resolve_brand(
        &mut self,
        conn: &mut SqliteConnection,
        raw_name: &str,
        seller_id: i64,
    ) -> Result<Resolved<DbVehicleBrand>, ResolveError> {
        let name = normalize_key(raw_name).ok_or(ResolveError::EmptyName)?;

        if let Some(brand) = self.brands.get(&name).cloned() {
            let link_created = ensure_seller_brand(conn, seller_id, &brand.id).await?;
            return Ok(Resolved {
                entity: brand,
                created: false,
                link_created,
            });
        }

        if let Some(brand) = select_brand_by_name(conn, &name).await? {
            let link_created = ensure_seller_brand(conn, seller_id, &brand.id).await?;
            self.brands.stage(name, brand.clone());
            return Ok(Resolved {
                entity: brand,
                created: false,
                link_created,
            });
        }

        let brand = DbVehicleBrand::new(&self.identity.derive(&name), &name);

        let insert = sqlx::query(
            r#"
            INSERT INTO vehicle_brands (id, name, logo_url, display_order, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&brand.id)
        .bind(&brand.name)
        .bind(&brand.logo_url)
        .bind(brand.display_order)
        .bind(brand.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await;

        match insert {
            Ok(_) => {
                let link_created = ensure_seller_brand(conn, seller_id, &brand.id).await?;
                info!("Created vehicle brand '{}'", name);
                self.brands.stage(name, brand.clone());
                Ok(Resolved {
                    entity: brand,
                    created: true,
                    link_created,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                let brand = select_brand_by_name(conn, &name).await?.ok_or_else(|| {
                    ResolveError::ResolutionConflict {
                        kind: "vehicle brand",
                        key: name.clone(),
                    }
                })?;

                info!(
                    "Vehicle brand '{}' was created concurrently, adopting it",
                    name
                );
                let link_created = ensure_seller_brand(conn, seller_id, &brand.id).await?;
                self.brands.stage(name, brand.clone());
                Ok(Resolved {
                    entity: brand,
                    created: false,
                    link_created,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve a vehicle by name, creating it with the given metadata if absent
    pub async fn resolve_vehicle(
        &mut self,
        conn: &mut SqliteConnection,
        vehicle: NewVehicle<'_>,
        seller_id: i64,
    ) -> Result<Resolved<DbVehicle>, ResolveError> {
        let name = normalize_key(vehicle.name).ok_or(ResolveError::EmptyName)?;

        if let Some(existing) = self.vehicles.get(&name).cloned() {
            let link_created = ensure_seller_vehicle(conn, seller_id, &existing.name).await?;
            return Ok(Resolved {
                entity: existing,
                created: false,
                link_created,
            });
        }

        if let Some(existing) = select_vehicle_by_name(conn, &name).await? {
            let link_created = ensure_seller_vehicle(conn, seller_id, &existing.name).await?;
            self.vehicles.stage(name, existing.clone());
            return Ok(Resolved {
                entity: existing,
                created: false,
                link_created,
            });
        }

        let new_vehicle = DbVehicle::new(
            &name,
            vehicle.start_year,
            vehicle.end_year,
            vehicle.vehicle_type.map(str::to_string),
            vehicle.brand_id,
        );

        let insert = sqlx::query(
            r#"
            INSERT INTO vehicles (name, start_year, end_year, vehicle_type, brand_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_vehicle.name)
        .bind(new_vehicle.start_year)
        .bind(new_vehicle.end_year)
        .bind(&new_vehicle.vehicle_type)
        .bind(&new_vehicle.brand_id)
        .bind(new_vehicle.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await;

        match insert {
            Ok(_) => {
                let link_created = ensure_seller_vehicle(conn, seller_id, &new_vehicle.name).await?;
                info!("Created vehicle '{}'", name);
                self.vehicles.stage(name, new_vehicle.clone());
                Ok(Resolved {
                    entity: new_vehicle,
                    created: true,
                    link_created,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                let existing = select_vehicle_by_name(conn, &name).await?.ok_or_else(|| {
                    ResolveError::ResolutionConflict {
                        kind: "vehicle",
                        key: name.clone(),
                    }
                })?;

                info!("Vehicle '{}' was created concurrently, adopting it", name);
                let link_created = ensure_seller_vehicle(conn, seller_id, &existing.name).await?;
                self.vehicles.stage(name, existing.clone());
                Ok(Resolved {
                    entity: existing,
                    created: false,
                    link_created,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Trim and uppercase a natural key; None when nothing remains
pub(crate) fn normalize_key(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

async fn select_category_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<DbCategory>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
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

async fn select_brand_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<DbVehicleBrand>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM vehicle_brands WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
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

async fn select_vehicle_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<DbVehicle>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM vehicles WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
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

// Tenant links insert with ON CONFLICT DO NOTHING so two workers adopting
// the same entity at once both succeed; rows_affected reports whether this
// call created the link.

async fn ensure_seller_category(
    conn: &mut SqliteConnection,
    seller_id: i64,
    category_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO seller_categories (seller_id, category_id)
        VALUES (?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(seller_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn ensure_seller_brand(
    conn: &mut SqliteConnection,
    seller_id: i64,
    brand_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO seller_brands (seller_id, brand_id)
        VALUES (?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(seller_id)
    .bind(brand_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn ensure_seller_vehicle(
    conn: &mut SqliteConnection,
    seller_id: i64,
    vehicle_name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO seller_vehicles (seller_id, vehicle_name)
        VALUES (?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(seller_id)
    .bind(vehicle_name)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
