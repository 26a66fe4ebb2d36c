// # Spreadsheet Reader
//
// Reads a CSV export into an `ImportBatch`. Headers are matched
// case-insensitively and cells are trimmed; blank cells become `None` so the
// orchestrator only ever sees values worth parsing.

use std::collections::HashMap;
use std::path::Path;

use crate::import::service::ImportError;
use crate::import::types::{ImportBatch, ImportRow};

/// Read a CSV file into a batch ready for `ImportService::import`
pub fn read_batch(path: &Path) -> Result<ImportBatch, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let positions: HashMap<String, usize> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| (column.to_uppercase(), index))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |column: &str| -> Option<String> {
            positions
                .get(column)
                .and_then(|&index| record.get(index))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        rows.push(ImportRow {
            cod_product: cell("COD_PRODUCT"),
            name_product: cell("NAME_PRODUCT"),
            description: cell("DESCRIPTION"),
            category: cell("CATEGORY"),
            id_seller: cell("ID_SELLER"),
            bar_code: cell("BAR_CODE"),
            gear_quantity: cell("GEAR_QUANTITY"),
            gear_dimensions: cell("GEAR_DIMENSIONS"),
            cross_reference: cell("CROSS_REFERENCE"),
            images: cell("IMAGES"),
            compatibility: cell("COMPATIBILITY"),
            start_year: cell("START_YEAR"),
            end_year: cell("END_YEAR"),
            type_vehicle: cell("TYPE_VEHICLE"),
            vehicle_brand: cell("VEHICLE_BRAND"),
        });
    }

    Ok(ImportBatch { columns, rows })
}
