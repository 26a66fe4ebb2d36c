use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database models for the parts catalog
///
/// Lookup entities (categories, vehicle brands, vehicles) are shared across
/// sellers and deduplicated by a normalized natural key. Products belong to
/// one seller; compatibility rows link products to vehicles. Junction tables
/// record which seller has adopted which shared entity.
///
/// Seller (tenant) metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbSeller {
    pub id: i64,
    pub name: String,
    /// Brazilian company registration number
    pub cnpj: String,
    pub created_at: DateTime<Utc>,
}

/// Product category
///
/// Shared across sellers. The id is derived deterministically from the
/// normalized name (see `HashIdentity`), the name is stored trimmed and
/// uppercased, and `display_order` is assigned at creation as max+1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbCategory {
    pub id: String,
    pub name: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Vehicle brand
///
/// Shared across sellers, same identity scheme as categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbVehicleBrand {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Vehicle model
///
/// The normalized name is the primary key; there is no derived hash.
/// Years, type and brand are metadata captured when the vehicle is first
/// seen and never rewritten by resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbVehicle {
    pub name: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Free-form class, e.g. "leve" for light vehicles
    pub vehicle_type: Option<String>,
    pub brand_id: String,
    pub created_at: DateTime<Utc>,
}

/// Product published by a seller
///
/// The code is the tenant-supplied primary key. Bulk imports never update
/// an existing product; re-imported codes keep their stored fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// False for discontinued items still listed for reference
    pub is_manufactured: bool,
    pub bar_code: Option<i64>,
    pub gear_quantity: Option<i32>,
    pub gear_dimensions: Option<String>,
    /// Competitor part numbers this product replaces
    pub cross_reference: Option<String>,
    pub category_id: String,
    pub seller_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Image attached to a product
///
/// The image id is `"<product code>-<n>"` with n the next free numeric
/// suffix, so re-imports append instead of overwriting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbProductImage {
    pub product_code: String,
    pub image_id: String,
    pub url: String,
}

/// Compatibility edge between a product and a vehicle
///
/// Composite key (product_code, vehicle_name). Created and destroyed only
/// by reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbCompatibility {
    pub product_code: String,
    pub vehicle_name: String,
}

impl DbSeller {
    pub fn new(id: i64, name: &str, cnpj: &str) -> Self {
        DbSeller {
            id,
            name: name.to_string(),
            cnpj: cnpj.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl DbCategory {
    pub fn new(id: &str, name: &str, display_order: i32) -> Self {
        DbCategory {
            id: id.to_string(),
            name: name.to_string(),
            display_order,
            created_at: Utc::now(),
        }
    }
}

impl DbVehicleBrand {
    pub fn new(id: &str, name: &str) -> Self {
        DbVehicleBrand {
            id: id.to_string(),
            name: name.to_string(),
            logo_url: None,
            display_order: 0,
            created_at: Utc::now(),
        }
    }
}

impl DbVehicle {
    pub fn new(
        name: &str,
        start_year: Option<i32>,
        end_year: Option<i32>,
        vehicle_type: Option<String>,
        brand_id: &str,
    ) -> Self {
        DbVehicle {
            name: name.to_string(),
            start_year,
            end_year,
            vehicle_type,
            brand_id: brand_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl DbProductImage {
    pub fn new(product_code: &str, image_id: &str, url: &str) -> Self {
        DbProductImage {
            product_code: product_code.to_string(),
            image_id: image_id.to_string(),
            url: url.to_string(),
        }
    }
}
