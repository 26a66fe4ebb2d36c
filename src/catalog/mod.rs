// # Catalog Module
//
// Entity resolution and compatibility reconciliation:
//
// - **EntityResolver**: Find-or-create for shared categories, brands and vehicles
// - **ReconcilePlan**: Set delta between stored and incoming compatibility edges
// - **CompatibilityReconciler**: Standalone reconciliation with partial progress
// - **UpsertService**: Replaces one product's edges from external descriptors

mod reconciler;
mod resolver;
mod upsert;

// Public API exports
pub use reconciler::{
    reconcile_on, CompatibilityReconciler, ReconcileError, ReconcileOutcome, ReconcilePlan,
};
pub use resolver::{EntityResolver, NewVehicle, Resolved, ResolveError};
pub use upsert::{UpsertError, UpsertService, UpsertSummary};
