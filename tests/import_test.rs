mod support;

use parts_catalog::import::{ImportBatch, ImportError, ImportRow, ImportService};
use support::TEST_SELLER;

fn full_columns() -> Vec<String> {
    [
        "COD_PRODUCT",
        "NAME_PRODUCT",
        "DESCRIPTION",
        "CATEGORY",
        "ID_SELLER",
        "BAR_CODE",
        "GEAR_QUANTITY",
        "GEAR_DIMENSIONS",
        "CROSS_REFERENCE",
        "IMAGES",
        "COMPATIBILITY",
        "START_YEAR",
        "END_YEAR",
        "TYPE_VEHICLE",
        "VEHICLE_BRAND",
    ]
    .iter()
    .map(|column| column.to_string())
    .collect()
}

fn base_row(code: &str) -> ImportRow {
    ImportRow {
        cod_product: Some(code.to_string()),
        name_product: Some(format!("Engrenagem {}", code)),
        category: Some("Motor".to_string()),
        id_seller: Some(TEST_SELLER.to_string()),
        ..Default::default()
    }
}

fn batch_of(rows: Vec<ImportRow>) -> ImportBatch {
    ImportBatch {
        columns: full_columns(),
        rows,
    }
}

#[tokio::test]
async fn test_full_row_creates_every_entity() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let row = ImportRow {
        description: Some("Engrenagem do motor de partida".to_string()),
        bar_code: Some("7891234567890".to_string()),
        gear_quantity: Some("12".to_string()),
        gear_dimensions: Some("10x25mm".to_string()),
        cross_reference: Some("BOSCH F000AL0120".to_string()),
        images: Some("http://img/a.jpg|http://img/b.jpg".to_string()),
        compatibility: Some("['Gol';'Uno']".to_string()),
        start_year: Some("['1980';'desconhecido']".to_string()),
        end_year: Some("['1994']".to_string()),
        type_vehicle: Some("['leve';'leve']".to_string()),
        vehicle_brand: Some("['Volkswagen';'Fiat']".to_string()),
        ..base_row("P1")
    };

    let report = service.import(batch_of(vec![row])).await.unwrap();

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(report.processed, 1);
    assert_eq!(report.categories_created, 1);
    assert_eq!(report.products_created, 1);
    assert_eq!(report.brands_created, 2);
    assert_eq!(report.vehicles_created, 2);
    assert_eq!(report.compatibilities_created, 2);
    assert_eq!(report.compatibilities_deleted, 0);
    assert_eq!(report.images_created, 2);
    assert_eq!(report.seller_categories_created, 1);
    assert_eq!(report.seller_brands_created, 2);
    assert_eq!(report.seller_vehicles_created, 2);

    let product = catalog
        .database
        .get_product_by_code("P1")
        .await
        .unwrap()
        .expect("Product should exist");
    assert_eq!(product.name, "Engrenagem P1");
    assert!(product.is_active);
    assert!(product.is_manufactured);
    assert_eq!(product.bar_code, Some(7891234567890));
    assert_eq!(product.gear_quantity, Some(12));
    assert_eq!(product.seller_id, Some(TEST_SELLER));

    let gol = catalog
        .database
        .get_vehicle_by_name("GOL")
        .await
        .unwrap()
        .expect("GOL should exist");
    assert_eq!(gol.start_year, Some(1980));
    assert_eq!(gol.end_year, Some(1994));
    assert_eq!(gol.vehicle_type.as_deref(), Some("leve"));

    // UNO's start year was the unknown sentinel and its end year fell off
    // the shorter list
    let uno = catalog
        .database
        .get_vehicle_by_name("UNO")
        .await
        .unwrap()
        .expect("UNO should exist");
    assert_eq!(uno.start_year, None);
    assert_eq!(uno.end_year, None);

    let brand = catalog
        .database
        .get_vehicle_brand_by_name("VOLKSWAGEN")
        .await
        .unwrap()
        .expect("Brand should exist");
    assert_eq!(gol.brand_id, brand.id);

    let edges = catalog
        .database
        .get_compatible_vehicle_names("P1")
        .await
        .unwrap();
    assert_eq!(edges, vec!["GOL".to_string(), "UNO".to_string()]);

    let images = catalog.database.get_images_for_product("P1").await.unwrap();
    let image_ids: Vec<&str> = images.iter().map(|image| image.image_id.as_str()).collect();
    assert_eq!(image_ids, vec!["P1-1", "P1-2"]);
}

#[tokio::test]
async fn test_missing_required_column_fails_fast() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let columns: Vec<String> = full_columns()
        .into_iter()
        .filter(|column| column != "GEAR_QUANTITY")
        .collect();
    let batch = ImportBatch {
        columns,
        rows: vec![base_row("P1")],
    };

    let err = service.import(batch).await.expect_err("Schema should fail");
    match err {
        ImportError::Schema { missing } => {
            assert_eq!(missing, vec!["GEAR_QUANTITY".to_string()]);
        }
        other => panic!("Expected schema error, got {}", other),
    }

    // Nothing was written before the gate
    assert_eq!(catalog.database.count_products().await.unwrap(), 0);
    assert_eq!(catalog.database.count_categories().await.unwrap(), 0);
}

#[tokio::test]
async fn test_row_failures_are_isolated() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    // Row 2 references a seller that does not exist; its category insert
    // rolls back with the row. Row 3 then creates the same category for
    // real.
    let bad_row = ImportRow {
        category: Some("Suspensao".to_string()),
        id_seller: Some("999".to_string()),
        ..base_row("P2")
    };
    let retry_row = ImportRow {
        category: Some("Suspensao".to_string()),
        ..base_row("P3")
    };

    let report = service
        .import(batch_of(vec![base_row("P1"), bad_row, retry_row]))
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(
        report.errors[0].starts_with("row 2:"),
        "unexpected error: {}",
        report.errors[0]
    );
    assert_eq!(report.products_created, 2);
    assert_eq!(report.categories_created, 2);

    assert!(catalog
        .database
        .get_product_by_code("P1")
        .await
        .unwrap()
        .is_some());
    assert!(catalog
        .database
        .get_product_by_code("P2")
        .await
        .unwrap()
        .is_none());
    assert!(catalog
        .database
        .get_product_by_code("P3")
        .await
        .unwrap()
        .is_some());
    assert!(catalog
        .database
        .get_category_by_name("SUSPENSAO")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_missing_values_are_row_errors() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let no_category = ImportRow {
        category: None,
        ..base_row("P1")
    };
    let no_code = ImportRow {
        cod_product: None,
        ..base_row("P2")
    };
    let bad_seller = ImportRow {
        id_seller: Some("abc".to_string()),
        ..base_row("P3")
    };

    let report = service
        .import(batch_of(vec![no_category, no_code, bad_seller]))
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(
        report.errors,
        vec![
            "row 1: missing required value CATEGORY".to_string(),
            "row 2: missing required value COD_PRODUCT".to_string(),
            "row 3: invalid ID_SELLER 'abc'".to_string(),
        ]
    );
    assert_eq!(catalog.database.count_products().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reimport_does_not_duplicate() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let row = ImportRow {
        compatibility: Some("['Gol']".to_string()),
        vehicle_brand: Some("['Volkswagen']".to_string()),
        ..base_row("P1")
    };
    service.import(batch_of(vec![row])).await.unwrap();

    // Same code again, different name: the stored product wins
    let renamed = ImportRow {
        name_product: Some("Engrenagem Nova".to_string()),
        compatibility: Some("['Gol']".to_string()),
        vehicle_brand: Some("['Volkswagen']".to_string()),
        ..base_row("P1")
    };
    let report = service.import(batch_of(vec![renamed])).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.products_created, 0);
    assert_eq!(report.categories_created, 0);
    assert_eq!(report.brands_created, 0);
    assert_eq!(report.vehicles_created, 0);
    assert_eq!(report.compatibilities_created, 0);
    assert_eq!(report.compatibilities_deleted, 0);
    assert_eq!(report.seller_categories_created, 0);

    let product = catalog
        .database
        .get_product_by_code("P1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.name, "Engrenagem P1");
    assert_eq!(catalog.database.count_products().await.unwrap(), 1);
    assert_eq!(catalog.database.count_vehicles().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reimport_reconciles_compatibilities() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let first = ImportRow {
        compatibility: Some("['Gol';'Uno']".to_string()),
        vehicle_brand: Some("['Volkswagen';'Fiat']".to_string()),
        ..base_row("P1")
    };
    service.import(batch_of(vec![first])).await.unwrap();

    let second = ImportRow {
        compatibility: Some("['Uno';'Palio']".to_string()),
        vehicle_brand: Some("['Fiat';'Fiat']".to_string()),
        ..base_row("P1")
    };
    let report = service.import(batch_of(vec![second])).await.unwrap();

    assert_eq!(report.compatibilities_created, 1);
    assert_eq!(report.compatibilities_deleted, 1);

    let edges = catalog
        .database
        .get_compatible_vehicle_names("P1")
        .await
        .unwrap();
    assert_eq!(edges, vec!["PALIO".to_string(), "UNO".to_string()]);
}

#[tokio::test]
async fn test_discontinued_prefix_marks_product() {
    let catalog = support::setup().await;
    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let discontinued = ImportRow {
        name_product: Some("ITEM DESCONTINUADO - Engrenagem Velha".to_string()),
        ..base_row("P1")
    };
    let hyphenated = ImportRow {
        name_product: Some("Filtro - Premium".to_string()),
        ..base_row("P2")
    };

    let report = service
        .import(batch_of(vec![discontinued, hyphenated]))
        .await
        .unwrap();
    assert!(report.errors.is_empty());

    let old = catalog
        .database
        .get_product_by_code("P1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old.name, "Engrenagem Velha");
    assert!(!old.is_manufactured);

    // A hyphen in an ordinary name is not the discontinued marker
    let premium = catalog
        .database
        .get_product_by_code("P2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(premium.name, "Filtro - Premium");
    assert!(premium.is_manufactured);
}

#[tokio::test]
async fn test_image_ids_take_next_free_suffix() {
    let catalog = support::setup().await;

    // A product imported before suffixed ids existed: one image row whose
    // id is the bare product code.
    catalog.seed_category("CAT-LEGACY", "MOTOR").await;
    catalog.seed_product("P1", "CAT-LEGACY").await;
    sqlx::query("INSERT INTO product_images (product_code, image_id, url) VALUES (?, ?, ?)")
        .bind("P1")
        .bind("P1")
        .bind("http://img/old.jpg")
        .execute(catalog.database.pool())
        .await
        .unwrap();

    let service = ImportService::new(catalog.database.clone(), catalog.identity.clone());

    let row = ImportRow {
        images: Some("http://img/a.jpg|http://img/b.jpg".to_string()),
        ..base_row("P1")
    };
    let report = service.import(batch_of(vec![row])).await.unwrap();
    assert_eq!(report.products_created, 0);
    assert_eq!(report.images_created, 2);

    let more = ImportRow {
        images: Some("http://img/c.jpg".to_string()),
        ..base_row("P1")
    };
    service.import(batch_of(vec![more])).await.unwrap();

    let images = catalog.database.get_images_for_product("P1").await.unwrap();
    let image_ids: Vec<&str> = images.iter().map(|image| image.image_id.as_str()).collect();
    assert_eq!(image_ids, vec!["P1", "P1-1", "P1-2", "P1-3"]);
}
