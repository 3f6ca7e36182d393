//! Bench configuration, loaded from YAML.
//!
//! ```yaml
//! vna:
//!   vendor: rigol
//!   host: 192.168.1.60
//!   simulate: false
//! pgxl:
//!   host: 192.168.1.50
//! flex:
//!   host: 192.168.1.40
//!   disable_band_persistence: true
//! bands_m: [40, 20, 10]
//! band_centers_mhz:
//!   60: 5.3305
//! burn_in:
//!   duration_s: 600
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use pgxl_core::{Band, BandPlan};
use pgxl_instruments::{VnaVendor, DEFAULT_SCPI_PORT};

/// Measurement instrument settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnaConfig {
    #[serde(default)]
    pub vendor: VnaVendor,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_vna_port")]
    pub port: u16,
    #[serde(default = "default_vna_timeout_ms")]
    pub timeout_ms: u64,
    /// Use the simulated backend even when a host is set.
    #[serde(default = "default_true")]
    pub simulate: bool,
}

impl Default for VnaConfig {
    fn default() -> Self {
        VnaConfig {
            vendor: VnaVendor::default(),
            host: None,
            port: default_vna_port(),
            timeout_ms: default_vna_timeout_ms(),
            simulate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgxlConfig {
    pub host: String,
    #[serde(default = "default_pgxl_port")]
    pub port: u16,
    #[serde(default = "default_pgxl_model")]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexConfig {
    pub host: String,
    #[serde(default = "default_flex_port")]
    pub port: u16,
    /// Send `radio set band_persistence_enabled=0` after connecting.
    #[serde(default = "default_true")]
    pub disable_band_persistence: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnInConfig {
    #[serde(default = "default_burn_in_duration_s")]
    pub duration_s: u64,
    #[serde(default = "default_burn_in_interval_s")]
    pub interval_s: u64,
}

impl Default for BurnInConfig {
    fn default() -> Self {
        BurnInConfig {
            duration_s: default_burn_in_duration_s(),
            interval_s: default_burn_in_interval_s(),
        }
    }
}

/// Everything a suite run needs to know about the bench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vna: VnaConfig,
    pub pgxl: PgxlConfig,
    #[serde(default)]
    pub flex: Option<FlexConfig>,
    #[serde(default = "default_bands")]
    pub bands_m: Vec<u16>,
    /// Overrides applied on top of the default band plan.
    #[serde(default)]
    pub band_centers_mhz: BTreeMap<u16, f64>,
    #[serde(default)]
    pub burn_in: BurnInConfig,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

impl AppConfig {
    /// Minimal configuration for an amplifier at `host`.
    pub fn for_amplifier(host: &str) -> Self {
        AppConfig {
            vna: VnaConfig::default(),
            pgxl: PgxlConfig {
                host: host.to_string(),
                port: default_pgxl_port(),
                model: default_pgxl_model(),
            },
            flex: None,
            bands_m: default_bands(),
            band_centers_mhz: BTreeMap::new(),
            burn_in: BurnInConfig::default(),
            artifacts_dir: default_artifacts_dir(),
        }
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(text).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// Check band lists and hosts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pgxl.host.trim().is_empty() {
            bail!("pgxl.host must not be empty");
        }
        if let Some(flex) = &self.flex {
            if flex.host.trim().is_empty() {
                bail!("flex.host must not be empty");
            }
        }
        if self.burn_in.interval_s == 0 {
            bail!("burn_in.interval_s must be at least 1");
        }
        self.band_plan()?;
        self.bands()?;
        Ok(())
    }

    /// Default band plan with `band_centers_mhz` applied.
    pub fn band_plan(&self) -> anyhow::Result<BandPlan> {
        let mut plan = BandPlan::default();
        for (&meters, &center) in &self.band_centers_mhz {
            let band = Band::from_meters(meters)
                .with_context(|| format!("band_centers_mhz: unknown band {meters} m"))?;
            plan.set_center(band, center)
                .with_context(|| format!("band_centers_mhz: {meters} m"))?;
        }
        Ok(plan)
    }

    /// `bands_m` as bands, in configured order.
    pub fn bands(&self) -> anyhow::Result<Vec<Band>> {
        self.bands_m
            .iter()
            .map(|&m| Band::from_meters(m).with_context(|| format!("bands_m: unknown band {m} m")))
            .collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_vna_port() -> u16 {
    DEFAULT_SCPI_PORT
}

fn default_vna_timeout_ms() -> u64 {
    5000
}

fn default_pgxl_port() -> u16 {
    pgxl_amp::DEFAULT_PORT
}

fn default_pgxl_model() -> String {
    "PGXL".to_string()
}

fn default_flex_port() -> u16 {
    pgxl_flex::DEFAULT_PORT
}

fn default_bands() -> Vec<u16> {
    Band::all().iter().map(Band::meters).collect()
}

fn default_burn_in_duration_s() -> u64 {
    7200
}

fn default_burn_in_interval_s() -> u64 {
    5
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_takes_defaults() {
        let config = AppConfig::from_yaml_str("pgxl:\n  host: 10.0.0.5\n").unwrap();
        assert_eq!(config.pgxl.port, 9008);
        assert_eq!(config.pgxl.model, "PGXL");
        assert!(config.flex.is_none());
        assert_eq!(config.vna, VnaConfig::default());
        assert_eq!(config.vna.port, 5025);
        assert_eq!(
            config.bands_m,
            vec![160, 80, 60, 40, 30, 20, 17, 15, 12, 10, 6]
        );
        assert_eq!(config.burn_in.duration_s, 7200);
        assert_eq!(config.burn_in.interval_s, 5);
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
    }

    #[test]
    fn full_yaml() {
        let yaml = "\
vna:
  vendor: rigol
  host: 192.168.1.60
  simulate: false
pgxl:
  host: 192.168.1.50
  port: 9100
flex:
  host: 192.168.1.40
bands_m: [40, 20]
band_centers_mhz:
  60: 5.3305
burn_in:
  duration_s: 60
";
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.vna.vendor, VnaVendor::Rigol);
        assert_eq!(config.vna.host.as_deref(), Some("192.168.1.60"));
        assert!(!config.vna.simulate);
        assert_eq!(config.pgxl.port, 9100);
        assert_eq!(config.flex.as_ref().map(|f| f.port), Some(4992));
        assert_eq!(
            config.flex.as_ref().map(|f| f.disable_band_persistence),
            Some(true)
        );
        assert_eq!(config.bands().unwrap(), vec![Band::Band40m, Band::Band20m]);
        assert_eq!(config.burn_in.interval_s, 5);

        let plan = config.band_plan().unwrap();
        assert_eq!(plan.center_mhz(Band::Band60m), Some(5.3305));
        assert_eq!(plan.center_mhz(Band::Band20m), Some(14.175));
    }

    #[test]
    fn band_persistence_can_stay_enabled() {
        let yaml = "pgxl:\n  host: 10.0.0.5\nflex:\n  host: 10.0.0.6\n  disable_band_persistence: false\n";
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.flex.map(|f| f.disable_band_persistence),
            Some(false)
        );
    }

    #[test]
    fn pgxl_host_is_required() {
        assert!(AppConfig::from_yaml_str("bands_m: [20]\n").is_err());
        assert!(AppConfig::from_yaml_str("pgxl:\n  host: ''\n").is_err());
    }

    #[test]
    fn unknown_band_is_rejected() {
        let err = AppConfig::from_yaml_str("pgxl:\n  host: a\nbands_m: [20, 2]\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown band 2 m"));
    }

    #[test]
    fn bad_center_is_rejected() {
        assert!(
            AppConfig::from_yaml_str("pgxl:\n  host: a\nband_centers_mhz:\n  20: -1.0\n").is_err()
        );
        assert!(
            AppConfig::from_yaml_str("pgxl:\n  host: a\nband_centers_mhz:\n  11: 27.0\n").is_err()
        );
    }

    #[test]
    fn unknown_vendor_is_rejected() {
        assert!(AppConfig::from_yaml_str("pgxl:\n  host: a\nvna:\n  vendor: hp\n").is_err());
    }
}
