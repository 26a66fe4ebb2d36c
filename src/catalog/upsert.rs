use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::info;

use crate::catalog::reconciler::{CompatibilityReconciler, ReconcileError};
use crate::catalog::resolver::{EntityResolver, NewVehicle, ResolveError};
use crate::compat_api::{CompatApiError, CompatSource, CompatYear, YearValue};
use crate::db::Database;
use crate::identity::HashIdentity;
use crate::import::fields::normalize_year;

/// Vehicle type recorded for models coming from the lookup service, which
/// only covers light vehicles
const LIGHT_VEHICLE_TYPE: &str = "leve";

#[derive(Error, Debug)]
pub enum UpsertError {
    #[error("product {0} not found")]
    ProductNotFound(String),
    #[error("compatibility lookup failed: {0}")]
    Source(#[from] CompatApiError),
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Summary of one compatibility upsert
#[derive(Debug, Clone, Serialize)]
pub struct UpsertSummary {
    pub product_code: String,
    pub brands_processed: u32,
    pub vehicles_processed: u32,
    pub compatibilities_created: u32,
    pub compatibilities_deleted: u32,
}

/// Replaces a product's compatibility set from external model descriptors
///
/// Descriptors come from the configured `CompatSource`; each one resolves a
/// brand and a vehicle in a short transaction of its own, then the whole
/// resolved set is reconciled against the stored edges in one pass.
pub struct UpsertService {
    database: Database,
    identity: HashIdentity,
    source: Arc<dyn CompatSource>,
}

impl UpsertService {
    pub fn new(database: Database, identity: HashIdentity, source: Arc<dyn CompatSource>) -> Self {
        UpsertService {
            database,
            identity,
            source,
        }
    }

    /// Upsert a product's compatibilities from the given model ids
    pub async fn upsert(
        &self,
        product_code: &str,
        seller_id: i64,
        model_ids: &[i64],
    ) -> Result<UpsertSummary, UpsertError> {
        if self
            .database
            .get_product_by_code(product_code)
            .await?
            .is_none()
        {
            return Err(UpsertError::ProductNotFound(product_code.to_string()));
        }

        let descriptors = self.source.fetch_models(model_ids).await?;
        info!(
            "Upserting {} descriptors for product {}",
            descriptors.len(),
            product_code
        );

        let mut resolver = EntityResolver::new(self.identity.clone());
        let mut brand_ids: HashSet<String> = HashSet::new();
        let mut seen_vehicles: HashSet<String> = HashSet::new();
        let mut vehicle_names: Vec<String> = Vec::new();

        for descriptor in &descriptors {
            let (brand_name, car_version) = match (
                descriptor.brand_name.as_deref(),
                descriptor.car_version.as_deref(),
            ) {
                (Some(brand), Some(version)) => (brand, version),
                // A descriptor without both names resolves to nothing
                _ => continue,
            };

            let (start_year, end_year) = year_span(&descriptor.years);

            let mut tx = self.database.pool().begin().await?;
            match resolve_descriptor(
                &mut tx,
                &mut resolver,
                seller_id,
                brand_name,
                car_version,
                start_year,
                end_year,
            )
            .await
            {
                Ok((brand_id, vehicle_name)) => {
                    tx.commit().await?;
                    resolver.publish_staged();

                    brand_ids.insert(brand_id);
                    if seen_vehicles.insert(vehicle_name.clone()) {
                        vehicle_names.push(vehicle_name);
                    }
                }
                Err(err) => {
                    let _ = tx.rollback().await;
                    resolver.discard_staged();
                    return Err(err.into());
                }
            }
        }

        let reconciler = CompatibilityReconciler::new(self.database.clone());
        let outcome = reconciler.reconcile(product_code, &vehicle_names).await?;

        let summary = UpsertSummary {
            product_code: product_code.to_string(),
            brands_processed: brand_ids.len() as u32,
            vehicles_processed: vehicle_names.len() as u32,
            compatibilities_created: outcome.created.len() as u32,
            compatibilities_deleted: outcome.deleted.len() as u32,
        };

        info!(
            "Upserted compatibilities for {}: {} created, {} deleted",
            product_code, summary.compatibilities_created, summary.compatibilities_deleted
        );

        Ok(summary)
    }
}

async fn resolve_descriptor(
    conn: &mut SqliteConnection,
    resolver: &mut EntityResolver,
    seller_id: i64,
    brand_name: &str,
    car_version: &str,
    start_year: Option<i32>,
    end_year: Option<i32>,
) -> Result<(String, String), ResolveError> {
    let brand = resolver.resolve_brand(conn, brand_name, seller_id).await?;
    let vehicle = resolver
        .resolve_vehicle(
            conn,
            NewVehicle {
                name: car_version,
                start_year,
                end_year,
                vehicle_type: Some(LIGHT_VEHICLE_TYPE),
                brand_id: &brand.entity.id,
            },
            seller_id,
        )
        .await?;

    Ok((brand.entity.id, vehicle.entity.name))
}

/// Min and max usable year in a descriptor's year list
fn year_span(years: &[CompatYear]) -> (Option<i32>, Option<i32>) {
    let parsed: Vec<i32> = years
        .iter()
        .filter_map(|entry| entry.year.as_ref())
        .filter_map(|value| match value {
            YearValue::Number(number) => i32::try_from(*number).ok(),
            YearValue::Text(text) => normalize_year(Some(text.as_str())),
        })
        .collect();

    (parsed.iter().min().copied(), parsed.iter().max().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(value: YearValue) -> CompatYear {
        CompatYear { year: Some(value) }
    }

    #[test]
    fn test_year_span_mixes_numbers_and_strings() {
        let years = vec![
            year(YearValue::Text("1986".to_string())),
            year(YearValue::Number(1980)),
            year(YearValue::Number(1983)),
        ];

        assert_eq!(year_span(&years), (Some(1980), Some(1986)));
    }

    #[test]
    fn test_year_span_drops_sentinels_and_garbage() {
        let years = vec![
            year(YearValue::Text("Desconhecido".to_string())),
            year(YearValue::Text("19XX".to_string())),
            CompatYear { year: None },
        ];

        assert_eq!(year_span(&years), (None, None));
    }

    #[test]
    fn test_year_span_empty_list() {
        assert_eq!(year_span(&[]), (None, None));
    }
}
