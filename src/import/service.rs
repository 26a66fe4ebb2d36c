// # Import Service - Orchestrator
//
// Drives one bulk import: validates the column set up front, then walks the
// rows in input order, each inside its own transaction. A failing row rolls
// back, lands in the report as "row <n>: <error>", and the batch moves on.
// Counters are staged per row and merged only when the row commits, so the
// report never counts work the store threw away.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{reconcile_on, EntityResolver, NewVehicle, ReconcileError, ResolveError};
use crate::db::Database;
use crate::identity::HashIdentity;
use crate::import::fields::{
    normalize_year, parse_pseudo_list, split_discontinued, zip_compat_tuples,
};
use crate::import::types::{ImportBatch, ImportReport, ImportRow, REQUIRED_COLUMNS};

/// Batches run to thousands of rows; log progress at this interval
const PROGRESS_INTERVAL: usize = 100;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] csv::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything that can sink a single row without sinking the batch
#[derive(Error, Debug)]
enum RowError {
    #[error("missing required value {0}")]
    Missing(&'static str),
    #[error("invalid ID_SELLER '{0}'")]
    InvalidSeller(String),
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Reconcile(#[from] ReconcileError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Counters staged while a row is in flight, merged on commit
#[derive(Default)]
struct RowStats {
    categories_created: u32,
    products_created: u32,
    brands_created: u32,
    vehicles_created: u32,
    compatibilities_created: u32,
    compatibilities_deleted: u32,
    images_created: u32,
    seller_categories_created: u32,
    seller_brands_created: u32,
    seller_vehicles_created: u32,
}

pub struct ImportService {
    database: Database,
    identity: HashIdentity,
}

impl ImportService {
    pub fn new(database: Database, identity: HashIdentity) -> Self {
        ImportService { database, identity }
    }

    /// Run one bulk import and return its report
    ///
    /// Fails fast (before any write) when the batch is missing required
    /// columns; everything after that is recovered at row granularity.
    pub async fn import(&self, batch: ImportBatch) -> Result<ImportReport, ImportError> {
        let missing = missing_columns(&batch.columns);
        if !missing.is_empty() {
            return Err(ImportError::Schema { missing });
        }

        let mut resolver = EntityResolver::new(self.identity.clone());
        let mut report = ImportReport::default();
        let total = batch.rows.len();

        info!("Importing {} rows", total);

        for (index, row) in batch.rows.iter().enumerate() {
            let ordinal = index + 1;

            let mut tx = self.database.pool().begin().await?;
            let mut stats = RowStats::default();

            let row_result = match process_row(&mut tx, &mut resolver, row, &mut stats).await {
                Ok(()) => tx.commit().await.map_err(RowError::from),
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("Row {} rollback failed: {}", ordinal, rollback_err);
                    }
                    Err(err)
                }
            };

            match row_result {
                Ok(()) => {
                    resolver.publish_staged();
                    report.processed += 1;
                    merge_stats(&mut report, &stats);
                }
                Err(err) => {
                    resolver.discard_staged();
                    report.errors.push(format!("row {}: {}", ordinal, err));
                }
            }

            if ordinal % PROGRESS_INTERVAL == 0 {
                info!("Processed {}/{} rows", ordinal, total);
            }
        }

        info!(
            "Import finished: {} rows processed, {} errors",
            report.processed,
            report.errors.len()
        );

        Ok(report)
    }
}

/// Required columns not present in the batch, case-insensitive
fn missing_columns(columns: &[String]) -> Vec<String> {
    let present: HashSet<String> = columns
        .iter()
        .map(|column| column.trim().to_uppercase())
        .collect();

    REQUIRED_COLUMNS
        .iter()
        .filter(|&&required| !present.contains(required))
        .map(|required| required.to_string())
        .collect()
}

/// Process one row inside the caller's transaction
async fn process_row(
    conn: &mut SqliteConnection,
    resolver: &mut EntityResolver,
    row: &ImportRow,
    stats: &mut RowStats,
) -> Result<(), RowError> {
    let seller_id = parse_seller_id(row)?;
    let category_name = row
        .category
        .as_deref()
        .ok_or(RowError::Missing("CATEGORY"))?;

    let category = resolver
        .resolve_category(conn, category_name, seller_id)
        .await?;
    if category.created {
        stats.categories_created += 1;
    }
    if category.link_created {
        stats.seller_categories_created += 1;
    }

    let product_code =
        create_product_if_absent(conn, row, &category.entity.id, seller_id, stats).await?;

    if let Some(images) = row.images.as_deref() {
        create_images(conn, &product_code, images, stats).await?;
    }

    let names = parse_pseudo_list(row.compatibility.as_deref().unwrap_or_default());
    let starts = parse_pseudo_list(row.start_year.as_deref().unwrap_or_default());
    let ends = parse_pseudo_list(row.end_year.as_deref().unwrap_or_default());
    let types = parse_pseudo_list(row.type_vehicle.as_deref().unwrap_or_default());
    let brands = parse_pseudo_list(row.vehicle_brand.as_deref().unwrap_or_default());

    let mut incoming = Vec::new();
    for tuple in zip_compat_tuples(&names, &starts, &ends, &types, &brands) {
        let (vehicle_name, brand_name) =
            match (tuple.vehicle_name.as_deref(), tuple.brand_name.as_deref()) {
                (Some(name), Some(brand)) => (name, brand),
                // Zipped past the shorter lists; nothing to resolve
                _ => continue,
            };

        let brand = resolver.resolve_brand(conn, brand_name, seller_id).await?;
        if brand.created {
            stats.brands_created += 1;
        }
        if brand.link_created {
            stats.seller_brands_created += 1;
        }

        let vehicle = resolver
            .resolve_vehicle(
                conn,
                NewVehicle {
                    name: vehicle_name,
                    start_year: normalize_year(tuple.start_year.as_deref()),
                    end_year: normalize_year(tuple.end_year.as_deref()),
                    vehicle_type: tuple.vehicle_type.as_deref(),
                    brand_id: &brand.entity.id,
                },
                seller_id,
            )
            .await?;
        if vehicle.created {
            stats.vehicles_created += 1;
        }
        if vehicle.link_created {
            stats.seller_vehicles_created += 1;
        }

        incoming.push(vehicle.entity.name.clone());
    }

    let outcome = reconcile_on(conn, &product_code, &incoming).await?;
    stats.compatibilities_created += outcome.created.len() as u32;
    stats.compatibilities_deleted += outcome.deleted.len() as u32;

    Ok(())
}

fn parse_seller_id(row: &ImportRow) -> Result<i64, RowError> {
    let raw = row
        .id_seller
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(RowError::Missing("ID_SELLER"))?;

    raw.parse::<i64>()
        .map_err(|_| RowError::InvalidSeller(raw.to_string()))
}

/// Create the row's product unless its code is already taken
///
/// Re-imported codes keep their stored fields; nothing is updated.
async fn create_product_if_absent(
    conn: &mut SqliteConnection,
    row: &ImportRow,
    category_id: &str,
    seller_id: i64,
    stats: &mut RowStats,
) -> Result<String, RowError> {
    let code = row
        .cod_product
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(RowError::Missing("COD_PRODUCT"))?
        .to_string();
    let raw_name = row
        .name_product
        .as_deref()
        .ok_or(RowError::Missing("NAME_PRODUCT"))?;

    let existing = sqlx::query("SELECT code FROM products WHERE code = ?")
        .bind(&code)
        .fetch_optional(&mut *conn)
        .await?;
    if existing.is_some() {
        return Ok(code);
    }

    let (name, is_manufactured) = split_discontinued(raw_name);
    let bar_code = row
        .bar_code
        .as_deref()
        .and_then(|value| value.trim().parse::<i64>().ok());
    let gear_quantity = row
        .gear_quantity
        .as_deref()
        .and_then(|value| value.trim().parse::<i32>().ok());

    sqlx::query(
        r#"
        INSERT INTO products (
            code, name, description, is_active, is_manufactured, bar_code,
            gear_quantity, gear_dimensions, cross_reference, category_id,
            seller_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&code)
    .bind(&name)
    .bind(row.description.as_deref().map(str::trim))
    .bind(true)
    .bind(is_manufactured)
    .bind(bar_code)
    .bind(gear_quantity)
    .bind(row.gear_dimensions.as_deref())
    .bind(row.cross_reference.as_deref())
    .bind(category_id)
    .bind(seller_id)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    stats.products_created += 1;
    Ok(code)
}

/// Insert image rows from the pipe-separated IMAGES cell
///
/// Image ids are `"<code>-<n>"`. A bare `"<code>"` row counts as suffix 0;
/// new images take the next free suffix from 1 up, skipping taken ids.
async fn create_images(
    conn: &mut SqliteConnection,
    product_code: &str,
    raw: &str,
    stats: &mut RowStats,
) -> Result<(), RowError> {
    let urls: Vec<&str> = raw
        .split('|')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect();
    if urls.is_empty() {
        return Ok(());
    }

    let rows = sqlx::query("SELECT image_id FROM product_images WHERE product_code = ?")
        .bind(product_code)
        .fetch_all(&mut *conn)
        .await?;

    let suffix_prefix = format!("{}-", product_code);
    let mut existing: HashSet<String> = HashSet::new();
    let mut max_suffix: i64 = -1;
    for row in rows {
        let image_id: String = row.get("image_id");
        if image_id == product_code {
            max_suffix = max_suffix.max(0);
        } else if let Some(suffix) = image_id
            .strip_prefix(&suffix_prefix)
            .and_then(|rest| rest.parse::<i64>().ok())
        {
            max_suffix = max_suffix.max(suffix);
        }
        existing.insert(image_id);
    }

    let mut next_suffix = (max_suffix + 1).max(1);
    for url in urls {
        let mut image_id = format!("{}-{}", product_code, next_suffix);
        while existing.contains(&image_id) {
            next_suffix += 1;
            image_id = format!("{}-{}", product_code, next_suffix);
        }

        sqlx::query("INSERT INTO product_images (product_code, image_id, url) VALUES (?, ?, ?)")
            .bind(product_code)
            .bind(&image_id)
            .bind(url)
            .execute(&mut *conn)
            .await?;

        existing.insert(image_id);
        stats.images_created += 1;
        next_suffix += 1;
    }

    Ok(())
}

fn merge_stats(report: &mut ImportReport, stats: &RowStats) {
    report.categories_created += stats.categories_created;
    report.products_created += stats.products_created;
    report.brands_created += stats.brands_created;
    report.vehicles_created += stats.vehicles_created;
    report.compatibilities_created += stats.compatibilities_created;
    report.compatibilities_deleted += stats.compatibilities_deleted;
    report.images_created += stats.images_created;
    report.seller_categories_created += stats.seller_categories_created;
    report.seller_brands_created += stats.seller_brands_created;
    report.seller_vehicles_created += stats.seller_vehicles_created;
}
