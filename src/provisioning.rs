//! One-time download and extraction of the dataset archive.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use log::{info, warn};
use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::DownloadSettings;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Timed out after {timeout_secs}s fetching {url}")]
    Timeout { url: String, timeout_secs: u64 },
    #[error("Failed to fetch {url}: {reason}")]
    Http { url: String, reason: String },
    #[error("I/O error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to extract `{}`: {source}", .path.display())]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("Missing files after extracting {archive}: {}", .files.join(", "))]
    MissingAfterExtract { archive: String, files: Vec<String> },
    #[error("Provisioning lock poisoned by an earlier failure")]
    Poisoned,
}

impl ProvisioningError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Downloads an archive to a local file.
pub trait ArchiveFetcher: Send + Sync {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), ProvisioningError>;
}

/// [`ArchiveFetcher`] over blocking HTTP with a request timeout.
#[derive(Clone)]
pub struct HttpArchiveFetcher {
    client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for HttpArchiveFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpArchiveFetcher")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpArchiveFetcher {
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProvisioningError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("landuse-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisioningError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }

    fn http_error(&self, url: &str, error: reqwest::Error) -> ProvisioningError {
        if error.is_timeout() {
            ProvisioningError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ProvisioningError::Http {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), ProvisioningError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.http_error(url, e))?;
        if !response.status().is_success() {
            return Err(ProvisioningError::Http {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let mut file =
            File::create(destination).map_err(|e| ProvisioningError::io(destination, e))?;
        response
            .copy_to(&mut file)
            .map_err(|e| self.http_error(url, e))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyPresent,
    Fetched,
}

/// Makes sure the expected dataset files exist in the data directory.
pub struct DatasetProvisioner<F: ArchiveFetcher> {
    data_dir: PathBuf,
    settings: DownloadSettings,
    fetcher: F,
    lock: Mutex<()>,
}

impl DatasetProvisioner<HttpArchiveFetcher> {
    pub fn http(data_dir: PathBuf, settings: DownloadSettings) -> Result<Self, ProvisioningError> {
        let fetcher = HttpArchiveFetcher::with_timeout(Duration::from_secs(settings.timeout_secs))?;
        Ok(Self::new(data_dir, settings, fetcher))
    }
}

impl<F: ArchiveFetcher> DatasetProvisioner<F> {
    pub fn new(data_dir: PathBuf, settings: DownloadSettings, fetcher: F) -> Self {
        Self {
            data_dir,
            settings,
            fetcher,
            lock: Mutex::new(()),
        }
    }

    pub fn missing_files(&self) -> Vec<String> {
        self.settings
            .expected_files
            .iter()
            .filter(|file| !self.data_dir.join(file).exists())
            .cloned()
            .collect()
    }

    /// Fetch and extract the archive unless every expected file exists.
    pub fn ensure(&self) -> Result<ProvisionOutcome, ProvisioningError> {
        let _guard = self.lock.lock().map_err(|_| ProvisioningError::Poisoned)?;

        let missing = self.missing_files();
        if missing.is_empty() {
            info!("dataset already present in {}", self.data_dir.display());
            return Ok(ProvisionOutcome::AlreadyPresent);
        }
        info!(
            "missing dataset files {missing:?}, fetching {}",
            self.settings.url
        );

        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| ProvisioningError::io(&self.data_dir, e))?;
        let archive = self.data_dir.join(&self.settings.archive);
        self.download(&archive)?;
        if let Err(err) = self.extract(&archive) {
            if matches!(err, ProvisioningError::Zip { .. }) {
                warn!("discarding unreadable archive {}", archive.display());
                let _ = std::fs::remove_file(&archive);
            }
            return Err(err);
        }

        let missing = self.missing_files();
        if !missing.is_empty() {
            return Err(ProvisioningError::MissingAfterExtract {
                archive: self.settings.archive.clone(),
                files: missing,
            });
        }
        info!("download and extraction complete");
        Ok(ProvisionOutcome::Fetched)
    }

    /// Downloads next to `archive` and renames, so an interrupted fetch
    /// never looks like a complete archive.
    fn download(&self, archive: &Path) -> Result<(), ProvisioningError> {
        if archive.exists() {
            info!("reusing archive {}", archive.display());
            return Ok(());
        }
        let partial = archive.with_extension("part");
        if let Err(err) = self.fetcher.fetch(&self.settings.url, &partial) {
            let _ = std::fs::remove_file(&partial);
            return Err(err);
        }
        std::fs::rename(&partial, archive).map_err(|e| ProvisioningError::io(archive, e))
    }

    fn extract(&self, archive: &Path) -> Result<(), ProvisioningError> {
        let zip_error = |source: zip::result::ZipError| ProvisioningError::Zip {
            path: archive.to_path_buf(),
            source,
        };
        let file = File::open(archive).map_err(|e| ProvisioningError::io(archive, e))?;
        let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;
        zip.extract(&self.data_dir).map_err(zip_error)
    }
}
