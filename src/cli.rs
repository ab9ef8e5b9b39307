use crate::catalog::{fetch_catalog, CatalogEntry};
use crate::config::AuditConfig;
use crate::fleet::FleetRunner;
use crate::inspect::FallbackSchemas;
use crate::report::{CsvReportWriter, MemorySink};
use crate::source::HttpPortalClient;

const USAGE: &str = "usage: nullwatch <run|inspect|catalog> [args]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Inspect,
    Catalog,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("run") => Some(Command::Run),
        Some("inspect") => Some(Command::Inspect),
        Some("catalog") => Some(Command::Catalog),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Run) => handle_run(args),
        Some(Command::Inspect) => handle_inspect(args),
        Some(Command::Catalog) => handle_catalog(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn prepare(config_path: Option<&String>) -> Result<(AuditConfig, HttpPortalClient), String> {
    let config = AuditConfig::load_or_default(config_path.map(String::as_str))
        .map_err(|err| err.to_string())?;
    let client = HttpPortalClient::new(config.request_timeout())
        .map_err(|err| format!("failed to build http client: {err}"))?;
    Ok((config, client))
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize output: {err}");
            1
        }
    }
}

/// `nullwatch run [config.yaml]`
fn handle_run(args: &[String]) -> i32 {
    let (config, client) = match prepare(args.get(2)) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let entries = match fetch_catalog(&client, &config) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let writer = match CsvReportWriter::for_today(&config.output_dir) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("cannot prepare output directory '{}': {err}", config.output_dir.display());
            return 1;
        }
    };

    let fallbacks = FallbackSchemas::load(&config.fallback_schemas);
    let summary = FleetRunner::new(&client, &config, &fallbacks).run(&entries, &writer);
    print_json(&summary)
}

/// `nullwatch inspect <api_id> [name] [config.yaml]`
fn handle_inspect(args: &[String]) -> i32 {
    let Some(api_id) = args.get(2) else {
        eprintln!("usage: nullwatch inspect <api_id> [name] [config.yaml]");
        return 2;
    };
    let name = args.get(3).unwrap_or(api_id);

    let (config, client) = match prepare(args.get(4)) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let fallbacks = FallbackSchemas::load(&config.fallback_schemas);
    let sink = MemorySink::new();
    let entry = CatalogEntry::new(name.as_str(), api_id.as_str(), "");
    FleetRunner::new(&client, &config, &fallbacks).run(std::slice::from_ref(&entry), &sink);

    match sink.reports().first() {
        Some(report) => print_json(report),
        None => {
            eprintln!("dataset '{api_id}' is on the skip list");
            1
        }
    }
}

/// `nullwatch catalog [config.yaml]`
fn handle_catalog(args: &[String]) -> i32 {
    let (config, client) = match prepare(args.get(2)) {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    match fetch_catalog(&client, &config) {
        Ok(entries) => print_json(&entries),
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
