use serde::Serialize;

/// Columns every bulk import must declare, matched case-insensitively
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "COD_PRODUCT",
    "NAME_PRODUCT",
    "CATEGORY",
    "ID_SELLER",
    "BAR_CODE",
    "GEAR_QUANTITY",
];

/// One bulk import: the declared column set plus the decoded rows
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub columns: Vec<String>,
    pub rows: Vec<ImportRow>,
}

/// A single import row with cells already normalized
///
/// Absent or blank cells are None. Numeric-looking fields stay as text
/// here; the orchestrator parses them lossily where the schema wants
/// numbers.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub cod_product: Option<String>,
    pub name_product: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub id_seller: Option<String>,
    pub bar_code: Option<String>,
    pub gear_quantity: Option<String>,
    pub gear_dimensions: Option<String>,
    pub cross_reference: Option<String>,
    pub images: Option<String>,
    pub compatibility: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
    pub type_vehicle: Option<String>,
    pub vehicle_brand: Option<String>,
}

/// Aggregated result of one bulk import
///
/// Counters reflect committed rows only; a rolled-back row contributes
/// nothing but its error string. `errors` keeps input order, each entry
/// prefixed with the 1-based row ordinal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub processed: u32,
    pub categories_created: u32,
    pub products_created: u32,
    pub brands_created: u32,
    pub vehicles_created: u32,
    pub compatibilities_created: u32,
    pub compatibilities_deleted: u32,
    pub images_created: u32,
    pub seller_categories_created: u32,
    pub seller_brands_created: u32,
    pub seller_vehicles_created: u32,
    pub errors: Vec<String>,
}
