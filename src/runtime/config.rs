//! Runtime configuration
//!
//! A [`RuntimeConfig`] is handed to [`Runtime::with_config`] once, at
//! startup. It can be built in code, or loaded from JSON:
//!
//! ```json
//! {
//!   "heap": { "policy": "bump", "chunk_size": 65536 },
//!   "panic": { "action": "abort", "echo_source": true, "source_root": "src" }
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.
//!
//! [`Runtime::with_config`]: super::Runtime::with_config

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, RuntimeError};
use super::heap::{AllocPolicy, HeapConfig};
use super::panic::PanicConfig;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub heap: HeapConfig,
    pub panic: PanicConfig,
}

impl RuntimeConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let bump = self.heap.policy == AllocPolicy::Bump;
        if bump && self.heap.chunk_size < HeapConfig::MIN_CHUNK_SIZE {
            return Err(RuntimeError::InvalidConfig(format!(
                "heap.chunk_size must be at least {} bytes, got {}",
                HeapConfig::MIN_CHUNK_SIZE,
                self.heap.chunk_size
            )));
        }
        if let Some(root) = &self.panic.source_root {
            if root.as_os_str().is_empty() {
                return Err(RuntimeError::InvalidConfig(
                    "panic.source_root must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
