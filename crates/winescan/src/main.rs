//! `winescan` - CLI for the wine scanner
//!
//! This binary resolves scanned payloads, shows the matching wine, and
//! manages the scan history.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use winescan::cli::{
    CatalogCommand, Cli, Command, ConfigCommand, DevicesCommand, HistoryCommand, ScanCommand,
    WatchCommand,
};
use winescan::export::{self, DEFAULT_EXPORT_FILE};
use winescan::view::{history_table, HistoryRow, RecordView};
use winescan::{
    init_logging, AppState, Catalog, Config, HistoryLog, LineInput, LineSource, MatchTier,
    Resolution, ScanSession, ScanSource, Storage,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Scan(scan_cmd) => handle_scan(&config, &scan_cmd),
        Command::Watch(watch_cmd) => handle_watch(&config, watch_cmd),
        Command::Devices(devices_cmd) => {
            handle_devices(&config, &devices_cmd);
            Ok(())
        }
        Command::Catalog(catalog_cmd) => handle_catalog(&config, &catalog_cmd),
        Command::History(history_cmd) => handle_history(&config, history_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_history(config: &Config) -> Result<HistoryLog, Box<dyn std::error::Error>> {
    let storage = Storage::open(config.database_path())?;
    Ok(HistoryLog::new(storage, config.history.storage_key.clone())
        .with_max_entries(config.max_entries()))
}

fn open_app(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let catalog = Catalog::load_or_empty(&config.catalog.path);
    Ok(AppState::new(catalog, open_history(config)?))
}

fn line_input(path: Option<PathBuf>) -> LineInput {
    path.map_or(LineInput::Stdin, LineInput::File)
}

fn print_resolution(resolution: &Resolution, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let output = serde_json::json!({
            "resolution": resolution,
            "view": RecordView::from_resolution(resolution),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", RecordView::from_resolution(resolution));
    }
    Ok(())
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> Result<(), Box<dyn std::error::Error>> {
    let app = open_app(config)?;
    match app.submit_manual(&cmd.payload)? {
        Some(resolution) => print_resolution(&resolution, cmd.json),
        None => {
            println!("Nothing to scan: the payload is empty.");
            Ok(())
        }
    }
}

fn handle_watch(config: &Config, cmd: WatchCommand) -> Result<(), Box<dyn std::error::Error>> {
    let app = open_app(config)?;
    let source = LineSource::new(line_input(cmd.input));
    let device = cmd.device.or_else(|| config.scan.default_device.clone());
    let session = ScanSession::new(app, source, config.redraw_interval());

    // Decode events are served by a single task, one at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_watch(session, device, cmd.json))
}

async fn run_watch(
    mut session: ScanSession<LineSource>,
    device: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = session.start(device.as_deref()).await {
        eprintln!("Unable to start scanning: {e}");
        return Err(e.into());
    }

    while let Some(event) = session.next_event().await {
        let update = session.on_decode(event, Instant::now())?;
        if let Some(resolution) = &update.resolution {
            print_resolution(resolution, json)?;
            if !json {
                println!();
            }
            std::io::stdout().flush()?;
        }
    }

    session.stop()?;
    if !json {
        println!("Scanned {} codes.", session.decoded_count());
    }
    Ok(())
}

fn handle_devices(config: &Config, cmd: &DevicesCommand) {
    let source = LineSource::new(line_input(cmd.input.clone()));
    let devices = source.available_devices();

    if devices.is_empty() {
        println!("No devices available.");
        return;
    }
    let default_device = config.scan.default_device.as_deref();
    for (i, device) in devices.iter().enumerate() {
        let marker = if default_device == Some(device.id.as_str()) {
            "  [default]"
        } else {
            ""
        };
        println!("{:>2}. {}  ({}){marker}", i + 1, device.label, device.id);
    }
}

fn handle_catalog(config: &Config, cmd: &CatalogCommand) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load_or_empty(&config.catalog.path);

    match cmd {
        CatalogCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else if catalog.is_empty() {
                println!("Catalog is empty ({}).", config.catalog.path.display());
            } else {
                for (id, record) in catalog.iter() {
                    println!(
                        "{id}\t{}\t{}\t{}\t{}",
                        record.name, record.region, record.variety, record.vintage
                    );
                }
            }
        }
        CatalogCommand::Get { id, json } => match catalog.get(id) {
            Some(record) if *json => println!("{}", serde_json::to_string_pretty(record)?),
            Some(record) => {
                let resolution = Resolution {
                    label: id.clone(),
                    tier: MatchTier::Reference,
                    key: Some(id.clone()),
                    record: Some(record.clone()),
                };
                println!("{}", RecordView::from_resolution(&resolution));
            }
            None => println!("No catalog entry with id '{id}'."),
        },
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: HistoryCommand) -> Result<(), Box<dyn std::error::Error>> {
    let history = open_history(config)?;

    match cmd {
        HistoryCommand::List { limit, json } => {
            let mut events = history.list()?;
            if let Some(limit) = limit {
                events.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                let rows: Vec<HistoryRow> = events.iter().map(HistoryRow::from_event).collect();
                print!("{}", history_table(&rows));
            }
        }
        HistoryCommand::Export { output } => {
            let events = history.list()?;
            let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));
            if output.as_os_str() == "-" {
                export::write_csv(&events, std::io::stdout().lock())?;
            } else {
                export::export_to_file(&events, &output)?;
                println!("Exported {} events to {}", events.len(), output.display());
            }
        }
        HistoryCommand::Clear { yes } => {
            if yes {
                history.clear()?;
                println!("Scan history cleared.");
            } else {
                println!("This will remove all scan history.");
                println!("Use --yes to confirm.");
            }
        }
        HistoryCommand::Stats { json } => {
            let stats = history.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("winescan history");
                println!("----------------");
                println!("Database:      {}", history.storage().path().display());
                println!("Storage key:   {}", history.key());
                println!("Events:        {}", stats.total_events);
                println!("Matched:       {}", stats.matched_events);
                if let Some(newest) = stats.newest_event {
                    println!("Newest:        {}", newest.to_rfc3339());
                }
                if let Some(oldest) = stats.oldest_event {
                    println!("Oldest:        {}", oldest.to_rfc3339());
                }
                println!("Size:          {} bytes", stats.db_size_bytes);
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Catalog]");
                println!("  Path:               {}", config.catalog.path.display());
                println!();
                println!("[History]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Storage key:        {}", config.history.storage_key);
                println!("  Max entries:        {}", config.history.max_entries);
                println!();
                println!("[Scan]");
                println!("  Redraw interval ms: {}", config.scan.redraw_interval_ms);
                println!(
                    "  Default device:     {}",
                    config.scan.default_device.as_deref().unwrap_or("(none)")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
