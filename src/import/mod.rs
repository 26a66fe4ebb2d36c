// # Import Module
//
// Bulk catalog import with focused, testable components:
//
// - **spreadsheet**: Reads a CSV export into an `ImportBatch`
// - **fields**: Parses pseudo-list cells and the field-level conventions
// - **ImportService**: Validates the schema and drives the per-row workflow
//
// Public API:
// - `ImportService`: Run a batch and collect its report
// - `ImportBatch` / `ImportRow`: Parsed spreadsheet contents
// - `ImportReport`: Row and entity counters plus per-row errors

pub mod fields;
pub mod spreadsheet;

mod service;
mod types;

// Public API exports
pub use service::{ImportError, ImportService};
pub use types::{ImportBatch, ImportReport, ImportRow, REQUIRED_COLUMNS};
