// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine context
//!
//! An [`Engine`] owns one key registry together with the crypto provider,
//! clock and configuration used to serve it. Engines are independent: a
//! handle minted by one is rejected by every other. Dropping an engine (or
//! calling [`Engine::shutdown`]) releases and zeroizes all of its keys.
//!
//! `Engine` is `Send + Sync`; share it behind an `Arc` for concurrent callers.
//!
//! # Example
//!
//! ```
//! use keyguard_engine::{CipherAlgorithm, CipherMode, CipherParameters, Engine, EngineConfig};
//! use keyguard_engine::cipher::AeadParameters;
//! use keyguard_engine::keys::KeyType;
//! use keyguard_engine::rights::Rights;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let key = engine
//!     .key_import(Some(&Rights::allow_all()), KeyType::Symmetric, None, &[7u8; 32])
//!     .unwrap();
//!
//! let parameters = CipherParameters::AesGcm(AeadParameters {
//!     iv: Some(vec![0u8; 12]),
//!     aad: Some(Vec::new()),
//! });
//! let mut session = engine
//!     .cipher_init(CipherAlgorithm::AesGcm, CipherMode::Encrypt, Some(key), Some(&parameters))
//!     .unwrap();
//!
//! let mut ciphertext = [0u8; 5];
//! let mut tag = [0u8; 16];
//! let written = session
//!     .process_last(b"hello", &mut ciphertext, Some(&mut tag))
//!     .unwrap();
//! assert_eq!(written, 5);
//! ```

use crate::cipher::{session, CipherAlgorithm, CipherMode, CipherParameters, CipherSession};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::keys::{
    EcCurve, KeyEntry, KeyHandle, KeyHeader, KeyRegistry, KeyType, KeyTypeParameters,
    SYM_MAX_KEY_SIZE, SYM_MIN_KEY_SIZE,
};
use crate::provider::{CryptoProvider, SoftwareProvider};
use crate::rights::{self, AuthorizationError, Clock, Rights, SystemClock, Usage};
use crate::unwrap::{self, UnwrapRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Attempts at drawing a valid P-256 scalar before giving up
const EC_GENERATE_ATTEMPTS: usize = 16;

/// What [`Engine::key_generate`] should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenerateParameters {
    /// Random symmetric key of `size` bytes
    Symmetric { size: usize },
    /// Random private scalar on `curve`
    Ec { curve: EcCurve },
    /// RSA key of `modulus_bits` (not supported by this engine)
    Rsa { modulus_bits: usize },
}

/// Key rights and cipher session engine
pub struct Engine {
    config: EngineConfig,
    registry: KeyRegistry,
    provider: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("live_keys", &self.registry.len())
            .finish()
    }
}

impl Engine {
    /// Engine with the software provider and the system clock
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_provider_and_clock(config, Arc::new(SoftwareProvider::new()), Arc::new(SystemClock))
    }

    /// Engine with an explicit provider and time source
    ///
    /// # Errors
    ///
    /// - `BadParameter` if `config` does not validate
    pub fn with_provider_and_clock(
        config: EngineConfig,
        provider: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::BadParameter(format!("invalid engine config: {}", e)))?;

        let registry = KeyRegistry::new(config.max_keys, config.rsa_modulus_bits.clone());
        info!(
            "🚀 Engine started (provider: {}, max keys: {}, caller: {})",
            provider.name(),
            config.max_keys,
            config.caller_id
        );

        Ok(Self {
            config,
            registry,
            provider,
            clock,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub(crate) fn provider(&self) -> &Arc<dyn CryptoProvider> {
        &self.provider
    }

    /// Check `usage` against the key's rights at the current time, then the
    /// caller scope against this engine's caller id
    pub(crate) fn authorize(&self, entry: &KeyEntry, usage: Usage) -> EngineResult<()> {
        let now = self.clock.now();
        rights::authorize(entry.rights(), usage, now).map_err(|e| {
            debug!("Authorization for {} refused: {}", usage, e);
            EngineError::from(e)
        })?;
        if !entry.rights().allows_caller(&self.config.caller_id) {
            return Err(AuthorizationError::CallerNotAllowed(self.config.caller_id).into());
        }
        Ok(())
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        self.registry.len()
    }

    /// Register caller-supplied key material
    ///
    /// # Errors
    ///
    /// - `NullParameter` if `rights` is absent, `material` empty, or an EC key has no curve
    /// - `InvalidParameter` if the material or constraints do not fit `key_type`
    /// - `ResourceExhausted` if the registry is full
    pub fn key_import(
        &self,
        rights: Option<&Rights>,
        key_type: KeyType,
        type_parameters: Option<KeyTypeParameters>,
        material: &[u8],
    ) -> EngineResult<KeyHandle> {
        self.registry.create(material, key_type, rights, type_parameters)
    }

    /// Generate a fresh key from provider randomness
    ///
    /// # Errors
    ///
    /// - `NullParameter` if `rights` is absent
    /// - `BadParameter` for a symmetric size outside 16..=512 bytes
    /// - `OperationNotSupported` for RSA
    /// - `ResourceExhausted` if the registry is full
    pub fn key_generate(
        &self,
        rights: Option<&Rights>,
        parameters: KeyGenerateParameters,
    ) -> EngineResult<KeyHandle> {
        let rights = rights.ok_or(EngineError::NullParameter("rights"))?;

        match parameters {
            KeyGenerateParameters::Symmetric { size } => {
                if !(SYM_MIN_KEY_SIZE..=SYM_MAX_KEY_SIZE).contains(&size) {
                    return Err(EngineError::BadParameter(format!(
                        "symmetric key size {} outside {}..={}",
                        size, SYM_MIN_KEY_SIZE, SYM_MAX_KEY_SIZE
                    )));
                }
                let mut material = Zeroizing::new(vec![0u8; size]);
                self.provider.random_bytes(&mut material)?;
                self.registry
                    .create(&material, KeyType::Symmetric, Some(rights), None)
            }
            KeyGenerateParameters::Ec { curve } => {
                let scalar = self.random_scalar(curve)?;
                self.registry.create(
                    &scalar,
                    KeyType::Ec,
                    Some(rights),
                    Some(KeyTypeParameters::Ec { curve }),
                )
            }
            KeyGenerateParameters::Rsa { modulus_bits } => {
                Err(EngineError::OperationNotSupported(format!(
                    "RSA-{} key generation; import a PKCS#8 key instead",
                    modulus_bits
                )))
            }
        }
    }

    fn random_scalar(&self, curve: EcCurve) -> EngineResult<Zeroizing<Vec<u8>>> {
        let mut scalar = Zeroizing::new(vec![0u8; curve.key_size()]);
        match curve {
            EcCurve::Ed25519 => {
                self.provider.random_bytes(&mut scalar)?;
                Ok(scalar)
            }
            EcCurve::NistP256 => {
                for _ in 0..EC_GENERATE_ATTEMPTS {
                    self.provider.random_bytes(&mut scalar)?;
                    if p256::SecretKey::from_slice(&scalar).is_ok() {
                        return Ok(scalar);
                    }
                }
                warn!("No valid P-256 scalar after {} attempts", EC_GENERATE_ATTEMPTS);
                Err(EngineError::Internal(
                    "could not draw a valid P-256 scalar".to_string(),
                ))
            }
        }
    }

    /// Type, size, curve and rights of a key
    pub fn key_header(&self, handle: Option<KeyHandle>) -> EngineResult<KeyHeader> {
        self.registry.header(handle)
    }

    /// Public half of an asymmetric key.
    ///
    /// RSA keys export SubjectPublicKeyInfo DER, P-256 keys the uncompressed
    /// SEC1 point, Ed25519 keys the 32-byte verifying key.
    ///
    /// # Errors
    ///
    /// - `NullParameter` / `BadParameter` if the handle is absent or unknown
    /// - `BadKeyType` for symmetric keys
    pub fn key_get_public(&self, handle: Option<KeyHandle>) -> EngineResult<Vec<u8>> {
        let entry = self.registry.lookup(handle)?;
        entry.material().public_key()
    }

    /// Release a key. Releasing twice is a no-op.
    pub fn key_release(&self, handle: KeyHandle) -> EngineResult<()> {
        self.registry.release(handle)
    }

    /// Open a cipher session on `key`
    ///
    /// # Errors
    ///
    /// In precedence order:
    /// - `NullParameter` if parameters (or their IV/AAD) or the key handle are absent
    /// - `BadParameter` if parameters do not match `algorithm` or have the wrong IV length
    /// - `BadParameter` if the key handle does not resolve
    /// - `OperationNotAllowed` if the key rights refuse the mode's usage
    /// - `BadKeyType` if the key does not fit `algorithm`
    /// - `OperationNotSupported` for RSA encryption or unsupported digests
    pub fn cipher_init(
        &self,
        algorithm: CipherAlgorithm,
        mode: CipherMode,
        key: Option<KeyHandle>,
        parameters: Option<&CipherParameters>,
    ) -> EngineResult<CipherSession> {
        session::init(self, algorithm, mode, key, parameters)
    }

    /// Recover a wrapped key and register it under the request's rights
    pub fn unwrap(&self, request: &UnwrapRequest) -> EngineResult<KeyHandle> {
        let result = unwrap::unwrap_key(self, request);
        if let Err(e) = &result {
            debug!("Unwrap with {} refused: {}", request.algorithm, e);
        }
        result
    }

    /// Release every key. The engine remains usable afterwards.
    pub fn shutdown(&self) -> usize {
        let released = self.registry.clear();
        info!("🛑 Engine shut down ({} keys released)", released);
        released
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            self.registry.clear();
        }
    }
}
