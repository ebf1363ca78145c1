use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::deutils::{deserialize_bool_from_anything, deserialize_i2c_address, parse_i2c_address};

pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_ADDRESS: u8 = 0x27;
pub const DEFAULT_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_COLUMNS: u8 = 16;
pub const DEFAULT_ROWS: u8 = 2;
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub update_interval_ms: Option<u64>,
    /// display wiring & behavior
    pub display: Option<DisplayConfig>,
    /// where telemetry comes from
    pub telemetry: Option<TelemetryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub bus: Option<String>,        // e.g. "/dev/i2c-1"
    #[serde(default, deserialize_with = "deserialize_i2c_address")]
    pub address: Option<u8>,        // 7-bit, 0x27 or 0x3F on most backpacks
    pub columns: Option<u8>,
    pub rows: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub backlight: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TelemetryConfig {
    /// container CLI used for the count, "none" disables it
    pub container_runtime: Option<String>,
    pub thermal_zone: Option<String>,
}

impl TelemetryConfig {
    pub fn container_runtime(&self) -> Option<String> {
        match self.container_runtime.as_deref() {
            None => Some(DEFAULT_CONTAINER_RUNTIME.to_string()),
            Some("" | "none") => None,
            Some(runtime) => Some(runtime.to_string()),
        }
    }

    pub fn thermal_zone_path(&self) -> PathBuf {
        PathBuf::from(self.thermal_zone.as_deref().unwrap_or(DEFAULT_THERMAL_ZONE))
    }
}

impl Config {
    fn display_or_default(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn i2c_bus(&self) -> String {
        self.display_or_default().bus.unwrap_or_else(|| DEFAULT_I2C_BUS.to_string())
    }

    pub fn address(&self) -> u8 {
        self.display_or_default().address.unwrap_or(DEFAULT_ADDRESS)
    }

    pub fn backlight(&self) -> bool {
        self.display_or_default().backlight.unwrap_or(true)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.unwrap_or(DEFAULT_INTERVAL_MS))
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        self.telemetry.clone().unwrap_or_default()
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lcdmons", version, about = "LcdMonS host status panel", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Shorthand for --log-level debug
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// I2C bus device path (e.g., /dev/i2c-1)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub i2c_bus: Option<String>,
    /// Expander address, 0x27 or 0x3F are common
    #[arg(short = 'a', long, value_parser = parse_i2c_address)]
    pub address: Option<u8>,
    /// Page update interval in milliseconds
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,
    /// Leave the backlight off
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_backlight: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;
    Ok((cfg, cli))
}

/// Layer defaults, YAML and the given CLI overrides
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lcdmons/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lcdmons/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lcdmons.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lcdmons.yaml", "config.yaml", "config/lcdmons.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

pub fn to_yaml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()          { dst.log_level = src.log_level; }
    if src.update_interval_ms.is_some() { dst.update_interval_ms = src.update_interval_ms; }
    // display
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    // telemetry
    match (&mut dst.telemetry, src.telemetry) {
        (None, Some(t)) => dst.telemetry = Some(t),
        (Some(d), Some(s)) => {
            if s.container_runtime.is_some() { d.container_runtime = s.container_runtime; }
            if s.thermal_zone.is_some()      { d.thermal_zone = s.thermal_zone; }
        }
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.bus.is_some()       { dst.bus = src.bus; }
    if src.address.is_some()   { dst.address = src.address; }
    if src.columns.is_some()   { dst.columns = src.columns; }
    if src.rows.is_some()      { dst.rows = src.rows; }
    if src.backlight.is_some() { dst.backlight = src.backlight; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()   { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                 { cfg.log_level = Some("debug".to_string()); }
    if cli.interval_ms.is_some() { cfg.update_interval_ms = cli.interval_ms; }

    let any_display = cli.i2c_bus.is_some() || cli.address.is_some() || cli.no_backlight;
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.i2c_bus.is_some() { display.bus = cli.i2c_bus.clone(); }
        if cli.address.is_some() { display.address = cli.address; }
        if cli.no_backlight      { display.backlight = Some(false); }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(ms) = cfg.update_interval_ms {
        if ms == 0 {
            return Err(ConfigError::Validation("update_interval_ms must be > 0".into()));
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let Some(address) = display.address {
            if address > 0x7F {
                return Err(ConfigError::Validation(format!(
                    "display address 0x{:02X} is not a 7-bit address", address
                )));
            }
        }
        if display.columns.is_some_and(|c| c != DEFAULT_COLUMNS)
            || display.rows.is_some_and(|r| r != DEFAULT_ROWS)
        {
            return Err(ConfigError::Validation(format!(
                "only {}x{} displays are supported", DEFAULT_COLUMNS, DEFAULT_ROWS
            )));
        }
        if display.bus.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation("display bus path must not be empty".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.address(), 0x27);
        assert_eq!(cfg.i2c_bus(), "/dev/i2c-1");
        assert_eq!(cfg.update_interval(), Duration::from_millis(3000));
        assert!(cfg.backlight());
        assert_eq!(cfg.telemetry().container_runtime(), Some("docker".to_string()));
    }

    #[test]
    fn test_yaml_parse() {
        let yaml = "\
log_level: debug
update_interval_ms: 5000
display:
  bus: /dev/i2c-0
  address: \"0x3F\"
  backlight: off
telemetry:
  container_runtime: podman
";
        let cfg = parse_yaml(yaml).unwrap();
        assert_eq!(cfg.address(), 0x3F);
        assert_eq!(cfg.i2c_bus(), "/dev/i2c-0");
        assert!(!cfg.backlight());
        assert_eq!(cfg.update_interval(), Duration::from_millis(5000));
        assert_eq!(cfg.telemetry().container_runtime(), Some("podman".to_string()));
    }

    #[test]
    fn test_runtime_none_disables_containers() {
        let t = TelemetryConfig { container_runtime: Some("none".into()), thermal_zone: None };
        assert_eq!(t.container_runtime(), None);
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml("display:\n  address: 0x27\n  bus: /dev/i2c-1\n").unwrap();
        let cli = Cli {
            address: Some(0x3F),
            interval_ms: Some(1000),
            no_backlight: true,
            debug: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.address(), 0x3F);
        assert_eq!(cfg.i2c_bus(), "/dev/i2c-1");
        assert!(!cfg.backlight());
        assert_eq!(cfg.update_interval_ms, Some(1000));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut dst = parse_yaml("display:\n  bus: /dev/i2c-3\n").unwrap();
        let src = parse_yaml("display:\n  address: 0x3F\n").unwrap();
        merge(&mut dst, src);
        assert_eq!(dst.i2c_bus(), "/dev/i2c-3");
        assert_eq!(dst.address(), 0x3F);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = Config { update_interval_ms: Some(0), ..Default::default() };
        assert!(matches!(validate(&zero), Err(ConfigError::Validation(_))));

        let wide = parse_yaml("display:\n  columns: 20\n  rows: 4\n").unwrap();
        assert!(matches!(validate(&wide), Err(ConfigError::Validation(_))));

        let ok = parse_yaml("display:\n  columns: 16\n  rows: 2\n").unwrap();
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/lcdmons.yaml")),
            ..Default::default()
        };
        assert!(matches!(load_with(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_dump_round_trip() {
        let cfg = parse_yaml("update_interval_ms: 2500\n").unwrap();
        let dumped = to_yaml(&cfg).unwrap();
        assert_eq!(parse_yaml(&dumped).unwrap(), cfg);
    }
}
