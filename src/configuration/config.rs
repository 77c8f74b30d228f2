use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Command-line arguments of the `zgrab` binary.
///
/// Every value except `config` overrides the matching setting loaded from the
/// configuration file, see [`Config::apply_overrides`].
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "zgrab")]
#[command(version)]
#[command(about = "Connects to a list of targets and records what each one answered")]
pub struct CliArgs {
    /// TOML configuration file. Built-in defaults are used when absent.
    ///
    /// # Command Line
    /// Use `--config <FILE>` or the `ZGRAB_CONFIG` environment variable
    #[arg(long, short, env = "ZGRAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// TCP port to connect to on every target
    #[arg(long)]
    pub port: Option<u16>,

    /// Target list, one `host[,domain]` per line. Defaults to stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Where grabs are written as JSON lines. Defaults to stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// One of off, error, warn, info, debug, trace
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Runtime configuration of a scan.
///
/// Loaded from a TOML file; every table and key is optional and falls back to
/// the defaults in [`super::types`].
///
/// # Examples
///
/// ```
/// use zgrab::configuration::config::Config;
///
/// let config: Config = "[scan]\nport = 8443".parse().unwrap();
/// assert_eq!(config.scan.port, 8443);
/// assert_eq!(config.scan.workers, 16);
/// ```
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: String,
    pub scan: ScanSettings,
    pub io: IoSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            scan: ScanSettings::default(),
            io: IoSettings::default(),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

impl Config {
    /// Reads and parses `path`. The result is not validated yet.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Loads the file named by `args` (or the defaults), then applies the
    /// command-line overrides and validates the outcome.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(workers) = args.workers {
            self.scan.workers = workers;
        }
        if let Some(port) = args.port {
            self.scan.port = port;
        }
        if let Some(input) = &args.input {
            self.io.input = Some(input.clone());
        }
        if let Some(output) = &args.output {
            self.io.output = Some(output.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level_filter()?;
        if self.scan.port == 0 {
            return Err(ConfigError::BadPort(String::from(
                "scan.port must be between 1 and 65535",
            )));
        }
        if !(1..=MAX_WORKERS).contains(&self.scan.workers) {
            return Err(ConfigError::NotInRange(format!(
                "scan.workers = {} (expected 1..={})",
                self.scan.workers, MAX_WORKERS
            )));
        }
        if self.scan.connect_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "scan.connect_timeout_secs must be positive",
            )));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::BadLogLevel(self.log_level.clone()))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn args_under_test() -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from([
            "zgrab",
            "--workers",
            "8",
            "--port",
            "8443",
            "--output",
            "/tmp/grabs.json",
        ])
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_ok!(config.validate());
        assert_eq!(config.scan.port, DEFAULT_PORT);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn file_values_and_cli_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[scan]\nworkers = 2\nconnect_timeout_secs = 3\n\n[io]\ninput = \"targets.txt\""
        )
        .unwrap();

        let mut config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scan.workers, 2);
        assert_eq!(config.scan.port, DEFAULT_PORT);
        assert_eq!(config.io.input, Some(PathBuf::from("targets.txt")));
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Debug);

        let args = args_under_test().unwrap_or_else(|e| panic!("{}", e));
        config.apply_overrides(&args);
        assert_eq!(config.scan.workers, 8);
        assert_eq!(config.scan.port, 8443);
        assert_eq!(config.scan.connect_timeout_secs, 3);
        assert_eq!(config.io.output, Some(PathBuf::from("/tmp/grabs.json")));
        assert_ok!(config.validate());
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let args = CliArgs::try_parse_from(["zgrab", "--log-level", "trace"]).unwrap();
        let config = Config::load(&args).unwrap();
        assert_eq!(config.scan.workers, DEFAULT_WORKERS);
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Trace);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();
        config.scan.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));

        let mut config = Config::default();
        config.scan.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::BadPort(_))));

        let mut config = Config::default();
        config.scan.connect_timeout_secs = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.log_level = String::from("loud");
        assert!(matches!(config.validate(), Err(ConfigError::BadLogLevel(_))));
    }

    #[test]
    fn malformed_toml_and_missing_file() {
        assert!(matches!(
            "[scan]\nworkers = \"many\"".parse::<Config>(),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            "[scan]\nthreads = 4".parse::<Config>(),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/zgrab.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
