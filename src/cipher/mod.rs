// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cipher Algorithms and Sessions
//!
//! A [`CipherSession`] is created by [`crate::Engine::cipher_init`] and bound
//! to one key, one algorithm and one mode for its whole life.
//!
//! ## Algorithms
//!
//! | Algorithm | Key | Parameters |
//! |---|---|---|
//! | `AesGcm` | symmetric, 16 or 32 bytes | [`AeadParameters`] (12-byte IV, AAD) |
//! | `ChaCha20Poly1305` | symmetric, 32 bytes | [`AeadParameters`] (12-byte IV, AAD) |
//! | `RsaOaep` | RSA | [`OaepParameters`] (digest, MGF1 digest, label) |
//! | `RsaPkcs1v15` | RSA | none |
//!
//! The same algorithm catalogue is used by key unwrap.
//!
//! ## Validation order
//!
//! 1. Required parameters present (`NullParameter`)
//! 2. Parameter structure: variant, IV length, digests (`BadParameter`)
//! 3. Key handle resolves (`BadParameter`)
//! 4. Key rights permit the mode's usage (`OperationNotAllowed`)
//! 5. Key type and size fit the algorithm (`BadKeyType`)
//! 6. Provider implements the combination (`OperationNotSupported`)

pub mod session;

pub use session::{CipherSession, SessionState};

use crate::error::{EngineError, EngineResult};
use crate::keys::{KeyEntry, KeyType, SYM_128_KEY_SIZE, SYM_256_KEY_SIZE};
use crate::provider::{AeadAlgorithm, DigestAlgorithm, RsaPadding, AEAD_NONCE_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cipher algorithm catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    AesGcm,
    ChaCha20Poly1305,
    RsaOaep,
    RsaPkcs1v15,
}

impl CipherAlgorithm {
    /// AEAD primitive behind this algorithm, if it is an AEAD
    pub fn aead(&self) -> Option<AeadAlgorithm> {
        match self {
            CipherAlgorithm::AesGcm => Some(AeadAlgorithm::AesGcm),
            CipherAlgorithm::ChaCha20Poly1305 => Some(AeadAlgorithm::ChaCha20Poly1305),
            CipherAlgorithm::RsaOaep | CipherAlgorithm::RsaPkcs1v15 => None,
        }
    }

    /// Whether the algorithm needs a parameter struct
    pub fn requires_parameters(&self) -> bool {
        !matches!(self, CipherAlgorithm::RsaPkcs1v15)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherAlgorithm::AesGcm => f.write_str("aes-gcm"),
            CipherAlgorithm::ChaCha20Poly1305 => f.write_str("chacha20-poly1305"),
            CipherAlgorithm::RsaOaep => f.write_str("rsa-oaep"),
            CipherAlgorithm::RsaPkcs1v15 => f.write_str("rsa-pkcs1v15"),
        }
    }
}

/// Direction of a cipher session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Encrypt => f.write_str("encrypt"),
            CipherMode::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// AES-GCM / ChaCha20-Poly1305 session parameters.
///
/// An empty AAD is `Some(vec![])`; `None` means the field was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AeadParameters {
    pub iv: Option<Vec<u8>>,
    pub aad: Option<Vec<u8>>,
}

/// RSA-OAEP parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaepParameters {
    pub digest: Option<DigestAlgorithm>,
    pub mgf1_digest: Option<DigestAlgorithm>,
    /// `None` and an empty label are equivalent
    pub label: Option<Vec<u8>>,
}

impl OaepParameters {
    /// OAEP with the same digest for hashing and MGF1, no label
    pub fn new(digest: DigestAlgorithm) -> Self {
        Self {
            digest: Some(digest),
            mgf1_digest: Some(digest),
            label: None,
        }
    }

    pub(crate) fn padding(&self) -> EngineResult<RsaPadding> {
        let digest = self
            .digest
            .ok_or_else(|| EngineError::BadParameter("OAEP digest not specified".to_string()))?;
        let mgf1_digest = self.mgf1_digest.ok_or_else(|| {
            EngineError::BadParameter("OAEP MGF1 digest not specified".to_string())
        })?;
        Ok(RsaPadding::Oaep {
            digest,
            mgf1_digest,
            label: self.label.clone().unwrap_or_default(),
        })
    }
}

/// Algorithm-specific parameters for [`crate::Engine::cipher_init`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherParameters {
    AesGcm(AeadParameters),
    ChaCha20Poly1305(AeadParameters),
    RsaOaep(OaepParameters),
}

impl CipherParameters {
    pub fn algorithm(&self) -> CipherAlgorithm {
        match self {
            CipherParameters::AesGcm(_) => CipherAlgorithm::AesGcm,
            CipherParameters::ChaCha20Poly1305(_) => CipherAlgorithm::ChaCha20Poly1305,
            CipherParameters::RsaOaep(_) => CipherAlgorithm::RsaOaep,
        }
    }
}

pub(crate) fn check_iv_length(iv: &[u8]) -> EngineResult<()> {
    if iv.len() != AEAD_NONCE_LENGTH {
        return Err(EngineError::BadParameter(format!(
            "iv length {}, expected {}",
            iv.len(),
            AEAD_NONCE_LENGTH
        )));
    }
    Ok(())
}

pub(crate) fn parameter_mismatch(algorithm: CipherAlgorithm, supplied: CipherAlgorithm) -> EngineError {
    EngineError::BadParameter(format!(
        "{} parameters supplied for {}",
        supplied, algorithm
    ))
}

/// Check that `entry` has the type and size `algorithm` needs
pub(crate) fn check_key_for(algorithm: CipherAlgorithm, entry: &KeyEntry) -> EngineResult<()> {
    let key_type = entry.key_type();
    let size = entry.size();
    let fits = match algorithm {
        CipherAlgorithm::AesGcm => {
            key_type == KeyType::Symmetric && (size == SYM_128_KEY_SIZE || size == SYM_256_KEY_SIZE)
        }
        CipherAlgorithm::ChaCha20Poly1305 => {
            key_type == KeyType::Symmetric && size == SYM_256_KEY_SIZE
        }
        CipherAlgorithm::RsaOaep | CipherAlgorithm::RsaPkcs1v15 => key_type == KeyType::Rsa,
    };
    if !fits {
        return Err(EngineError::BadKeyType(format!(
            "{} cannot use a {}-byte {} key",
            algorithm, size, key_type
        )));
    }
    Ok(())
}
