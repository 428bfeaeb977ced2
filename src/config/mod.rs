// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine Configuration
//!
//! Limits and identity for an [`crate::Engine`], from defaults, environment
//! variables or a TOML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use uuid::Uuid;

/// Default maximum number of live keys
pub const DEFAULT_MAX_KEYS: usize = 256;
/// Default bound on the input an AEAD session may accumulate (1 MiB)
pub const DEFAULT_MAX_SESSION_BUFFER: usize = 1024 * 1024;
/// RSA modulus sizes accepted by default
pub const DEFAULT_RSA_MODULUS_BITS: [usize; 4] = [1024, 2048, 3072, 4096];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of live keys in the registry
    pub max_keys: usize,

    /// Maximum bytes an AEAD session may buffer before `process_last`
    pub max_session_buffer: usize,

    /// Identity checked against each key's `allowed_callers`
    pub caller_id: Uuid,

    /// RSA modulus sizes, in bits, accepted on import
    pub rsa_modulus_bits: Vec<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_keys: DEFAULT_MAX_KEYS,
            max_session_buffer: DEFAULT_MAX_SESSION_BUFFER,
            caller_id: Uuid::nil(),
            rsa_modulus_bits: DEFAULT_RSA_MODULUS_BITS.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `KEYGUARD_MAX_KEYS`: maximum live keys (default: 256)
    /// - `KEYGUARD_MAX_SESSION_BUFFER`: AEAD session buffer bound in bytes (default: 1 MiB)
    /// - `KEYGUARD_CALLER_ID`: caller UUID (default: nil)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_keys: env::var("KEYGUARD_MAX_KEYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_keys),
            max_session_buffer: env::var("KEYGUARD_MAX_SESSION_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_session_buffer),
            caller_id: env::var("KEYGUARD_CALLER_ID")
                .ok()
                .and_then(|s| Uuid::parse_str(&s).ok())
                .unwrap_or(defaults.caller_id),
            rsa_modulus_bits: defaults.rsa_modulus_bits,
        }
    }

    /// Load configuration from a TOML file. Missing fields take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config in {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_keys == 0 {
            return Err("max_keys must be > 0".to_string());
        }

        if self.max_keys > u32::MAX as usize {
            return Err("max_keys too large (max u32::MAX)".to_string());
        }

        if self.max_session_buffer == 0 {
            return Err("max_session_buffer must be > 0".to_string());
        }

        if self.rsa_modulus_bits.is_empty() {
            return Err("rsa_modulus_bits must not be empty".to_string());
        }

        if let Some(bits) = self
            .rsa_modulus_bits
            .iter()
            .find(|bits| **bits < 1024 || **bits % 8 != 0)
        {
            return Err(format!("unsupported RSA modulus size {} bits", bits));
        }

        Ok(())
    }
}
