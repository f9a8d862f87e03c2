//! Configuration types for batch-rename

use crate::error::{Error, Result};
use crate::utils::sanitize_file_name;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One gibibyte
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Archive sizing and batching configuration
///
/// Governs when a selection is packed into a single archive and how larger
/// selections are split into parts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Total input size at or below which a single archive is produced (default: 2 GiB)
    #[serde(default = "default_single_archive_threshold")]
    pub single_archive_threshold: u64,

    /// Maximum number of files per part when splitting (default: 500)
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,

    /// Maximum cumulative input bytes per part when splitting (default: 1 GiB)
    ///
    /// A single file larger than this still forms its own one-file part.
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: u64,

    /// Pause between consecutive part deliveries (default: 2000 ms, zero disables)
    #[serde(default = "default_inter_batch_delay", with = "duration_millis_serde")]
    pub inter_batch_delay: Duration,

    /// Archive file name without extension (default: "renamed-files")
    ///
    /// Parts are named `{base_name}-part{K}-of-{N}.zip`.
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// What to do when two entries end up with the same name
    #[serde(default)]
    pub name_collision: NameCollisionAction,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            single_archive_threshold: default_single_archive_threshold(),
            max_batch_files: default_max_batch_files(),
            max_batch_bytes: default_max_batch_bytes(),
            inter_batch_delay: default_inter_batch_delay(),
            base_name: default_base_name(),
            name_collision: NameCollisionAction::default(),
        }
    }
}

impl ArchiveConfig {
    /// File name of the single archive produced for small selections
    pub fn single_archive_name(&self) -> String {
        format!("{}.zip", self.base_name)
    }

    /// File name of part `index` (1-based) out of `total`
    pub fn part_archive_name(&self, index: usize, total: usize) -> String {
        format!("{}-part{}-of-{}.zip", self.base_name, index, total)
    }
}

/// Where and how finished outputs are delivered
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving archives and individually saved files (default: "./renamed")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Pause between files when saving individually (default: 100 ms)
    #[serde(default = "default_individual_delay", with = "duration_millis_serde")]
    pub individual_delay: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            individual_delay: default_individual_delay(),
        }
    }
}

/// Limits a selection must respect before any work starts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum number of files per operation (default: 5000)
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single file (default: 2 GiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum combined size of the selection (default: 10 GiB)
    #[serde(default = "default_max_total_size")]
    pub max_total_size: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            max_total_size: default_max_total_size(),
        }
    }
}

/// Strategy for entries whose final names collide
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCollisionAction {
    /// Append (1), (2), etc. before the extension of later duplicates (default)
    #[default]
    Rename,
    /// Abort the operation with [`Error::NameCollision`]
    Fail,
}

/// Main configuration
///
/// Groups:
/// - [`archive`](ArchiveConfig): thresholds, batch limits and naming
/// - [`output`](OutputConfig): delivery directory and pacing
/// - [`selection`](SelectionConfig): file count and size limits
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive sizing and naming
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Selection limits
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Delivery settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that limits are usable
    pub fn validate(&self) -> Result<()> {
        let archive = &self.archive;
        if archive.max_batch_files == 0 {
            return Err(Error::config(
                "max_batch_files must be at least 1",
                "max_batch_files",
            ));
        }
        if archive.max_batch_bytes == 0 {
            return Err(Error::config(
                "max_batch_bytes must be at least 1",
                "max_batch_bytes",
            ));
        }
        if archive.base_name.trim().is_empty() {
            return Err(Error::config("base_name must not be empty", "base_name"));
        }
        if sanitize_file_name(&archive.base_name) != archive.base_name {
            return Err(Error::config(
                format!(
                    "base_name {:?} contains characters not allowed in file names",
                    archive.base_name
                ),
                "base_name",
            ));
        }

        let selection = &self.selection;
        if selection.max_files == 0 {
            return Err(Error::config("max_files must be at least 1", "max_files"));
        }
        if selection.max_file_size == 0 {
            return Err(Error::config(
                "max_file_size must be at least 1",
                "max_file_size",
            ));
        }
        if selection.max_total_size == 0 {
            return Err(Error::config(
                "max_total_size must be at least 1",
                "max_total_size",
            ));
        }
        Ok(())
    }
}

fn default_single_archive_threshold() -> u64 {
    2 * GIB
}

fn default_max_batch_files() -> usize {
    500
}

fn default_max_batch_bytes() -> u64 {
    GIB
}

fn default_inter_batch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_base_name() -> String {
    "renamed-files".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./renamed")
}

fn default_individual_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_max_files() -> usize {
    5000
}

fn default_max_file_size() -> u64 {
    2 * GIB
}

fn default_max_total_size() -> u64 {
    10 * GIB
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
