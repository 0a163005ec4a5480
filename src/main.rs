use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use location_refdata::{
    ImportOrchestrator, ReferenceDataStore, SqliteStore, SPREADSHEET_CONTENT_TYPE,
};

const DEFAULT_DB_PATH: &str = "locations.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => run_import(&args[2..]),
        Some("state") => run_state_lookup(&args[2..]),
        Some("city") => run_city_lookup(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("location-refdata {}", location_refdata::VERSION);
    println!();
    println!("Usage:");
    println!("  location-refdata import <workbook.xlsx> [db-path] [--json]");
    println!("  location-refdata state <code> [db-path]");
    println!("  location-refdata city <code> [db-path]");
}

fn db_path_from(args: &[String], index: usize) -> &Path {
    args.get(index)
        .filter(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .map_or(Path::new(DEFAULT_DB_PATH), Path::new)
}

fn run_import(args: &[String]) -> Result<()> {
    let Some(workbook_path) = args.first() else {
        bail!("missing workbook path; usage: location-refdata import <workbook.xlsx> [db-path]");
    };
    let db_path = db_path_from(args, 1);
    let as_json = args.iter().any(|arg| arg == "--json");

    let payload = fs::read(workbook_path)
        .with_context(|| format!("failed to read workbook {}", workbook_path))?;

    let mut store = SqliteStore::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let report = ImportOrchestrator::new(&mut store)
        .import(SPREADSHEET_CONTENT_TYPE, &payload)
        .context("import failed")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Importing {} into {}", workbook_path, db_path.display());
    println!("\u{2713} {}", report.summary());
    for failure in &report.errors {
        println!(
            "  row {} of {}: {}",
            failure.row, failure.sheet, failure.message
        );
    }

    Ok(())
}

fn run_state_lookup(args: &[String]) -> Result<()> {
    let code = parse_code_arg(args)?;
    let store = SqliteStore::open(db_path_from(args, 1))?;

    match store.get_state(code)? {
        Some(state) => println!(
            "{} {} ({})",
            state.code(),
            state.name(),
            state.abbreviation()
        ),
        None => println!("no state with code {}", code),
    }
    Ok(())
}

fn run_city_lookup(args: &[String]) -> Result<()> {
    let code = parse_code_arg(args)?;
    let store = SqliteStore::open(db_path_from(args, 1))?;

    match store.get_city(code)? {
        Some(city) => println!(
            "{} {} (state {})",
            city.code(),
            city.name(),
            city.state_code()
        ),
        None => println!("no city with code {}", code),
    }
    Ok(())
}

fn parse_code_arg(args: &[String]) -> Result<u32> {
    let Some(raw) = args.first() else {
        bail!("missing code argument");
    };
    raw.parse::<u32>()
        .with_context(|| format!("{:?} is not a numeric code", raw))
}
