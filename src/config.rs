use serde::{Deserialize, Serialize};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::placement::MeterLocation;

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

/// Top-level widget configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// meter-specific behavior
    pub meter: Option<MeterConfig>,
    /// self-update check
    pub updates: Option<UpdateConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeterConfig {
    /// Display the meter outside the signal panel's field area.
    pub outside_field: Option<bool>,
    /// Allow the squelch function to be used.
    pub enable_squelch: Option<bool>,
    /// Colors follow the host theme, with the inversion pass on light themes.
    pub use_theme_colors: Option<bool>,
    /// Reported dBm reading with no antenna connected, calibrating the low
    /// signal interpolation; 0 (or absent) disables it.
    pub noise_floor_dbm: Option<f32>,
    /// Below-27 MHz AM correction; disables the noise floor down there.
    pub am_offset: Option<bool>,
    pub location: Option<MeterLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateConfig {
    pub check: Option<bool>,
    /// Static text resource the published version is read from.
    pub url: Option<String>,
}

/// CLI overrides, layered over the file. All fields are Options so absent
/// flags leave the file values alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub outside_field: Option<bool>,
    pub enable_squelch: Option<bool>,
    pub use_theme_colors: Option<bool>,
    pub noise_floor_dbm: Option<f32>,
    pub am_offset: Option<bool>,
    pub location: Option<MeterLocation>,
    pub check_updates: Option<bool>,
}

/// Public entry point: read YAML (explicit path or search), merge
/// overrides, validate.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = path {
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
    apply_overrides(&mut cfg, overrides);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/smeters/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/smeters/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/smeters.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["smeters.yaml", "config.yaml", "config/smeters.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.meter, src.meter) {
        (None, Some(c)) => dst.meter = Some(c),
        (Some(d), Some(s)) => merge_meter(d, s),
        _ => {}
    }
    match (&mut dst.updates, src.updates) {
        (None, Some(c)) => dst.updates = Some(c),
        (Some(d), Some(s)) => {
            if s.check.is_some() { d.check = s.check; }
            if s.url.is_some()   { d.url = s.url; }
        }
        _ => {}
    }
}

fn merge_meter(dst: &mut MeterConfig, src: MeterConfig) {
    if src.outside_field.is_some()    { dst.outside_field = src.outside_field; }
    if src.enable_squelch.is_some()   { dst.enable_squelch = src.enable_squelch; }
    if src.use_theme_colors.is_some() { dst.use_theme_colors = src.use_theme_colors; }
    if src.noise_floor_dbm.is_some()  { dst.noise_floor_dbm = src.noise_floor_dbm; }
    if src.am_offset.is_some()        { dst.am_offset = src.am_offset; }
    if src.location.is_some()         { dst.location = src.location; }
}

fn apply_overrides(cfg: &mut Config, ov: &Overrides) {
    if ov.log_level.is_some() { cfg.log_level = ov.log_level.clone(); }

    let any_meter = ov.outside_field.is_some()
        || ov.enable_squelch.is_some()
        || ov.use_theme_colors.is_some()
        || ov.noise_floor_dbm.is_some()
        || ov.am_offset.is_some()
        || ov.location.is_some();

    if any_meter && cfg.meter.is_none() {
        cfg.meter = Some(MeterConfig::default());
    }
    if let Some(meter) = cfg.meter.as_mut() {
        if ov.outside_field.is_some()    { meter.outside_field = ov.outside_field; }
        if ov.enable_squelch.is_some()   { meter.enable_squelch = ov.enable_squelch; }
        if ov.use_theme_colors.is_some() { meter.use_theme_colors = ov.use_theme_colors; }
        if ov.noise_floor_dbm.is_some()  { meter.noise_floor_dbm = ov.noise_floor_dbm; }
        if ov.am_offset.is_some()        { meter.am_offset = ov.am_offset; }
        if ov.location.is_some()         { meter.location = ov.location; }
    }

    if ov.check_updates.is_some() {
        if cfg.updates.is_none() {
            cfg.updates = Some(UpdateConfig::default());
        }
        if let Some(updates) = cfg.updates.as_mut() {
            updates.check = ov.check_updates;
        }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(meter) = cfg.meter.as_ref() {
        if let Some(floor) = meter.noise_floor_dbm {
            if floor > 0.0 {
                return Err(ConfigError::Validation(
                    "meter noise_floor_dbm must be negative (or 0 to disable)".into(),
                ));
            }
        }
    }
    Ok(())
}

impl Config {
    /// The noise floor with the 0-means-disabled convention applied.
    pub fn noise_floor(&self) -> Option<f32> {
        self.meter
            .as_ref()
            .and_then(|m| m.noise_floor_dbm)
            .filter(|f| *f != 0.0)
    }

    pub fn outside_field(&self) -> bool {
        self.meter.as_ref().and_then(|m| m.outside_field).unwrap_or(true)
    }

    pub fn enable_squelch(&self) -> bool {
        self.meter.as_ref().and_then(|m| m.enable_squelch).unwrap_or(true)
    }

    pub fn use_theme_colors(&self) -> bool {
        self.meter.as_ref().and_then(|m| m.use_theme_colors).unwrap_or(true)
    }

    pub fn am_offset(&self) -> bool {
        self.meter.as_ref().and_then(|m| m.am_offset).unwrap_or(false)
    }

    pub fn location(&self) -> MeterLocation {
        self.meter.as_ref().and_then(|m| m.location).unwrap_or_default()
    }

    pub fn check_updates(&self) -> bool {
        self.updates.as_ref().and_then(|u| u.check).unwrap_or(false)
    }

    pub fn update_url(&self) -> Option<&str> {
        self.updates.as_ref().and_then(|u| u.url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.outside_field());
        assert!(cfg.enable_squelch());
        assert!(cfg.use_theme_colors());
        assert!(!cfg.am_offset());
        assert_eq!(cfg.noise_floor(), None);
        assert_eq!(cfg.location(), MeterLocation::Auto);
    }

    #[test]
    fn test_yaml_round_trip_and_merge() {
        let yaml = r#"
log_level: debug
meter:
  noise_floor_dbm: -123
  location: sdr-graph-only
"#;
        let parsed: Config = serde_yaml::from_str(yaml).unwrap();
        let mut cfg = Config::default();
        merge(&mut cfg, parsed);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.noise_floor(), Some(-123.0));
        assert_eq!(cfg.location(), MeterLocation::SdrGraphOnly);
        // Unset fields keep their defaults through the merge
        assert!(cfg.enable_squelch());
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let mut cfg = Config {
            meter: Some(MeterConfig {
                noise_floor_dbm: Some(-123.0),
                am_offset: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let ov = Overrides {
            noise_floor_dbm: Some(-118.0),
            am_offset: Some(true),
            ..Default::default()
        };
        apply_overrides(&mut cfg, &ov);
        assert_eq!(cfg.noise_floor(), Some(-118.0));
        assert!(cfg.am_offset());
    }

    #[test]
    fn test_zero_floor_disables_interpolation() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            &Overrides { noise_floor_dbm: Some(0.0), ..Default::default() },
        );
        assert_eq!(cfg.noise_floor(), None);
    }

    #[test]
    fn test_positive_floor_rejected() {
        let cfg = Config {
            meter: Some(MeterConfig {
                noise_floor_dbm: Some(12.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate(&cfg).is_err());
    }
}
