use clap::Parser;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use zgrab::configuration::config::{CliArgs, Config};
use zgrab::encoding::registry::EventTypeRegistry;
use zgrab::processing::json_lines::{GrabEncoder, TargetDecoder};
use zgrab::processing::pipeline::process;
use zgrab::scanner::grab_worker::GrabWorker;

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    })
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = Config::load(&args).unwrap_or_else(|e| {
        eprintln!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });

    // Validated above, so the level is known to parse.
    let level = config.log_level_filter().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_target(false)
        .init();

    info!("Configuration imported successfully");

    let registry = EventTypeRegistry::with_defaults().unwrap_or_else(|e| {
        error!("Unable to build the event type registry: {}, exiting...", e);
        std::process::exit(1);
    });
    info!("Registered event types: {}", registry.names().join(", "));

    let input = open_input(config.io.input.as_deref()).unwrap_or_else(|e| {
        error!("Unable to open target list: {}", e);
        std::process::exit(1);
    });
    let output = open_output(config.io.output.as_deref()).unwrap_or_else(|e| {
        error!("Unable to open output: {}", e);
        std::process::exit(1);
    });

    let port = config.scan.port;
    let connect_timeout = config.connect_timeout();
    info!(
        "Scanning port {} with {} worker(s), connect timeout {:?}",
        port, config.scan.workers, connect_timeout
    );

    let result = process(
        TargetDecoder::new(input),
        GrabEncoder::new(output),
        config.scan.workers,
        |index| GrabWorker::new(index, port, connect_timeout),
    )
    .await;

    match result {
        Ok(stats) => info!(
            "Scan finished: {} target(s) read, {} grab(s) written",
            stats.read, stats.written
        ),
        Err(e) => {
            error!("Scan failed: {}", e);
            std::process::exit(1);
        }
    }
}
