use crate::error::{FitsColsError, Result};
use crate::extractor::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Rows processed per write batch. Does not affect the result,
    /// only peak memory and write granularity.
    pub chunk_size: usize,
    /// Extension index to read; when unset, the first BINTABLE
    /// extension is used.
    pub hdu: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Show the per-chunk progress bar.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract: ExtractConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hdu: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FitsColsError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FitsColsError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| FitsColsError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["fitscols.toml", ".fitscols.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(chunk_size) = cli_args.chunk_size {
            self.extract.chunk_size = chunk_size;
        }

        if let Some(hdu) = cli_args.hdu {
            self.extract.hdu = Some(hdu);
        }

        if let Some(progress) = cli_args.progress {
            self.output.progress = progress;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FitsColsError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| FitsColsError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract.chunk_size == 0 {
            return Err(FitsColsError::Config {
                message: "Chunk size must be at least 1 row".to_string(),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub chunk_size: Option<usize>,
    pub hdu: Option<usize>,
    pub progress: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_hdu(mut self, hdu: Option<usize>) -> Self {
        self.hdu = hdu;
        self
    }

    pub fn with_progress(mut self, progress: Option<bool>) -> Self {
        self.progress = progress;
        self
    }
}
