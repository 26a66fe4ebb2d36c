use std::collections::BTreeSet;

use sqlx::{Row, SqliteConnection};
use thiserror::Error;
use tracing::info;

use crate::catalog::resolver::normalize_key;
use crate::db::Database;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Delta between a product's stored edge set and an incoming target set
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub kept: BTreeSet<String>,
    pub to_create: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
}

impl ReconcilePlan {
    /// Build the delta. Incoming names are normalized; empties drop out.
    pub fn build(current: &[String], incoming: &[String]) -> Self {
        let current: BTreeSet<String> = current.iter().cloned().collect();
        let incoming: BTreeSet<String> = incoming
            .iter()
            .filter_map(|name| normalize_key(name))
            .collect();

        ReconcilePlan {
            kept: current.intersection(&incoming).cloned().collect(),
            to_create: incoming.difference(&current).cloned().collect(),
            to_delete: current.difference(&incoming).cloned().collect(),
        }
    }

    fn into_outcome(self) -> ReconcileOutcome {
        ReconcileOutcome {
            kept: self.kept,
            created: self.to_create,
            deleted: self.to_delete,
        }
    }
}

/// What a reconcile call actually did
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub kept: BTreeSet<String>,
    pub created: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

/// Reconcile a product's edges inside the caller's transaction
///
/// Loads the stored edge set, applies the delta, and returns it. Nothing is
/// committed here; the caller owns the transaction.
pub async fn reconcile_on(
    conn: &mut SqliteConnection,
    product_code: &str,
    incoming: &[String],
) -> Result<ReconcileOutcome, ReconcileError> {
    let current = select_edge_names(conn, product_code).await?;
    let plan = ReconcilePlan::build(&current, incoming);

    if !plan.to_delete.is_empty() {
        delete_edges(conn, product_code, &plan.to_delete).await?;
    }

    for vehicle_name in &plan.to_create {
        insert_edge(conn, product_code, vehicle_name).await?;
    }

    Ok(plan.into_outcome())
}

/// Standalone reconciliation with its own transaction boundaries
///
/// The whole deletion batch commits as one transaction (skipped entirely
/// when there is nothing to delete); each creation then commits on its own,
/// so a failure partway through the list keeps the edges already written.
pub struct CompatibilityReconciler {
    database: Database,
}

impl CompatibilityReconciler {
    pub fn new(database: Database) -> Self {
        CompatibilityReconciler { database }
    }

    /// Reconcile a product's edges against the incoming vehicle names
    pub async fn reconcile(
        &self,
        product_code: &str,
        incoming: &[String],
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let current = self
            .database
            .get_compatible_vehicle_names(product_code)
            .await?;
        let plan = ReconcilePlan::build(&current, incoming);

        if !plan.to_delete.is_empty() {
            let mut tx = self.database.pool().begin().await?;
            delete_edges(&mut tx, product_code, &plan.to_delete).await?;
            tx.commit().await?;
        }

        if !plan.to_create.is_empty() {
            let mut conn = self.database.pool().acquire().await?;
            for vehicle_name in &plan.to_create {
                insert_edge(&mut conn, product_code, vehicle_name).await?;
            }
        }

        if !plan.to_create.is_empty() || !plan.to_delete.is_empty() {
            info!(
                "Reconciled product {}: {} edges created, {} deleted",
                product_code,
                plan.to_create.len(),
                plan.to_delete.len()
            );
        }

        Ok(plan.into_outcome())
    }
}

async fn select_edge_names(
    conn: &mut SqliteConnection,
    product_code: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT vehicle_name FROM compatibilities WHERE product_code = ?")
        .bind(product_code)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(|row| row.get("vehicle_name")).collect())
}

// Deletes are always scoped by the full composite key. Filtering on vehicle
// name alone would strip the same edge from every other product.
async fn delete_edges(
    conn: &mut SqliteConnection,
    product_code: &str,
    names: &BTreeSet<String>,
) -> Result<(), sqlx::Error> {
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "DELETE FROM compatibilities WHERE product_code = ? AND vehicle_name IN ({})",
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(product_code);
    for name in names {
        query = query.bind(name);
    }
    query.execute(&mut *conn).await?;

    Ok(())
}

async fn insert_edge(
    conn: &mut SqliteConnection,
    product_code: &str,
    vehicle_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO compatibilities (product_code, vehicle_name) VALUES (?, ?)")
        .bind(product_code)
        .bind(vehicle_name)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
