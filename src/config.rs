//! Pipeline configuration, loadable from TOML.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{assembler::DEFAULT_IDENTIFIER_TAG, Error, Result};

/// Layout of the input stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// A MARC XML document (`collection` or a lone `record`).
    #[default]
    Collection,
    /// One `key<TAB>xml` record per line.
    Delimited,
}

/// Watermarks, batching and parsing options for one pipeline.
///
/// ```toml
/// high_water = 2048
/// low_water = 512
/// format = "delimited"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Buffered records at which the consumer asks the producer to pause.
    pub high_water: usize,
    /// Buffered records at or below which a paused producer is resumed.
    pub low_water: usize,
    /// Records handed to the sink per write.
    pub batch_size: usize,
    /// Records allowed in flight beyond `high_water` after a pause was requested.
    pub overrun: usize,
    pub identifier_tag: String,
    /// Log progress every this many records; 0 turns progress logging off.
    pub progress_interval: u64,
    pub format: InputFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            high_water: 1024,
            low_water: 256,
            batch_size: 256,
            overrun: 64,
            identifier_tag: DEFAULT_IDENTIFIER_TAG.to_string(),
            progress_interval: 100_000,
            format: InputFormat::Collection,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.high_water == 0 {
            return Err(Error::Config("high_water must be positive".into()));
        }
        if self.low_water >= self.high_water {
            return Err(Error::Config(format!(
                "low_water ({}) must be below high_water ({})",
                self.low_water, self.high_water
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        if self.identifier_tag.is_empty() {
            return Err(Error::Config("identifier_tag must not be empty".into()));
        }
        Ok(())
    }

    /// Capacity of the in-process data channel.
    pub fn channel_capacity(&self) -> usize {
        self.high_water + self.overrun
    }
}
