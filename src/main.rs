use std::env;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use parts_catalog::catalog::UpsertService;
use parts_catalog::compat_api::CompatApiClient;
use parts_catalog::config::Config;
use parts_catalog::db::{Database, DbSeller};
use parts_catalog::identity::HashIdentity;
use parts_catalog::import::{spreadsheet, ImportService};

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} import <file.csv>", program);
    eprintln!("  {} add-seller <id> <name> <cnpj>", program);
    eprintln!("  {} upsert <product_code> <seller_id> <model_id>...", program);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("parts-catalog");

    if args.len() < 2 {
        print_usage(program);
        exit(1);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            exit(1);
        }
    };

    let database = match Database::new(&config.database_path.to_string_lossy()).await {
        Ok(database) => database,
        Err(err) => {
            eprintln!("Failed to open database: {}", err);
            exit(1);
        }
    };
    let identity = HashIdentity::new(&config.hash_secret);

    match args[1].as_str() {
        "import" => {
            if args.len() != 3 {
                print_usage(program);
                exit(1);
            }

            let batch = match spreadsheet::read_batch(Path::new(&args[2])) {
                Ok(batch) => batch,
                Err(err) => {
                    eprintln!("Failed to read {}: {}", args[2], err);
                    exit(1);
                }
            };

            let service = ImportService::new(database, identity);
            match service.import(batch).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report).unwrap());
                    if !report.errors.is_empty() {
                        exit(1);
                    }
                }
                Err(err) => {
                    eprintln!("Import failed: {}", err);
                    exit(1);
                }
            }
        }
        "add-seller" => {
            if args.len() != 5 {
                print_usage(program);
                exit(1);
            }

            let id: i64 = match args[2].parse() {
                Ok(id) => id,
                Err(_) => {
                    eprintln!("Invalid seller id '{}'", args[2]);
                    exit(1);
                }
            };

            let seller = DbSeller::new(id, &args[3], &args[4]);
            if let Err(err) = database.insert_seller(&seller).await {
                eprintln!("Failed to add seller: {}", err);
                exit(1);
            }
            println!("Added seller {} ({})", seller.name, seller.id);
        }
        "upsert" => {
            if args.len() < 5 {
                print_usage(program);
                exit(1);
            }

            let base_url = match config.compat_base_url {
                Some(url) => url,
                None => {
                    eprintln!("CATALOG_COMPAT_URL must be set for upsert");
                    exit(1);
                }
            };

            let seller_id: i64 = match args[3].parse() {
                Ok(id) => id,
                Err(_) => {
                    eprintln!("Invalid seller id '{}'", args[3]);
                    exit(1);
                }
            };

            let mut model_ids = Vec::new();
            for raw in &args[4..] {
                match raw.parse::<i64>() {
                    Ok(id) => model_ids.push(id),
                    Err(_) => {
                        eprintln!("Invalid model id '{}'", raw);
                        exit(1);
                    }
                }
            }

            let source = Arc::new(CompatApiClient::new(base_url));
            let service = UpsertService::new(database, identity, source);
            match service.upsert(&args[2], seller_id, &model_ids).await {
                Ok(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary).unwrap());
                }
                Err(err) => {
                    eprintln!("Upsert failed: {}", err);
                    exit(1);
                }
            }
        }
        other => {
            eprintln!("Unknown command '{}'", other);
            print_usage(program);
            exit(1);
        }
    }
}
