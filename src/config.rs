//! Server configuration.
//!
//! Loaded from an optional JSON file; every field has a default that
//! points at the Annual NLCD 2024 CONUS bundle under `./data`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::Legend;

pub const NLCD_URL: &str = "https://www.mrlc.gov/downloads/sciweb1/shared/mrlc/data-bundles/Annual_NLCD_LndCov_2024_CU_C1V1.zip";
pub const NLCD_ARCHIVE: &str = "Annual_NLCD_LndCov_2024_CU_C1V1.zip";
pub const NLCD_LAND_COVER: &str = "Annual_NLCD_LndCov_2024_CU_C1V1.tif";
pub const NLCD_FILES: [&str; 3] = [
    NLCD_LAND_COVER,
    "Annual_NLCD_LndCov_2024_CU_C1V1.tif.aux.xml",
    "Annual_NLCD_LndCov_2024_CU_C1V1.xml",
];
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No soil layer configured")]
    MissingSoilLayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: PathBuf,
    pub download: DownloadSettings,
    pub land_cover: LandCoverSettings,
    pub soil: Option<SoilSettings>,
    /// Earlier land cover layers, for dates and history.
    pub history: Vec<HistoryLayer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            download: DownloadSettings::default(),
            land_cover: LandCoverSettings::default(),
            soil: None,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadSettings {
    pub url: String,
    /// Archive file name inside the data directory.
    pub archive: String,
    /// Files that must exist after extraction.
    pub expected_files: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            url: NLCD_URL.to_string(),
            archive: NLCD_ARCHIVE.to_string(),
            expected_files: NLCD_FILES.iter().map(|file| file.to_string()).collect(),
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LandCoverSettings {
    pub file: PathBuf,
    pub band: usize,
    /// Observation date of this layer.
    pub date: NaiveDate,
}

impl Default for LandCoverSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(NLCD_LAND_COVER),
            band: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoilSettings {
    pub file: PathBuf,
    #[serde(default = "first_band")]
    pub band: usize,
    /// Defaults to the WRB reference soil groups.
    #[serde(default = "Legend::wrb_reference_groups")]
    pub legend: Legend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryLayer {
    pub date: NaiveDate,
    pub file: PathBuf,
    #[serde(default = "first_band")]
    pub band: usize,
}

fn first_band() -> usize {
    1
}

impl Config {
    /// Defaults when no path is given.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        self
    }

    /// Soil lookups have no answer without a soil layer.
    pub fn require_soil(&self) -> Result<&SoilSettings, ConfigError> {
        self.soil.as_ref().ok_or(ConfigError::MissingSoilLayer)
    }

    /// Relative paths live in the data directory.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}
