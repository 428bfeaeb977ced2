// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cryptographic Primitive Provider
//!
//! The engine never performs primitive operations itself. It validates
//! requests and hands the actual transformation to a [`CryptoProvider`]:
//!
//! - **AEAD**: AES-GCM (128/256) and ChaCha20-Poly1305 with detached 16-byte tags
//! - **RSA**: OAEP and PKCS#1 v1.5 decryption
//! - **Randomness**: OS-backed random bytes for key generation
//!
//! [`SoftwareProvider`] implements the trait with RustCrypto crates. A
//! hardware-backed provider would implement the same trait.

pub mod aead;
pub mod asymmetric;

use rsa::RsaPrivateKey;
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Nonce length shared by AES-GCM and ChaCha20-Poly1305
pub const AEAD_NONCE_LENGTH: usize = 12;
/// Authentication tag length shared by AES-GCM and ChaCha20-Poly1305
pub const AEAD_TAG_LENGTH: usize = 16;

/// Failure reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Tag, padding or integrity check rejected the input
    #[error("authentication failed during {operation}")]
    AuthenticationFailed { operation: String },

    /// The provider does not implement the requested variant
    #[error("{0}")]
    Unsupported(String),

    /// Anything else (bad key length reaching the provider, RNG failure)
    #[error("provider failure: {0}")]
    Failure(String),
}

/// AEAD primitive selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    AesGcm,
    ChaCha20Poly1305,
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AeadAlgorithm::AesGcm => f.write_str("aes-gcm"),
            AeadAlgorithm::ChaCha20Poly1305 => f.write_str("chacha20-poly1305"),
        }
    }
}

/// Digest algorithms selectable for OAEP and MGF1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Digest output length in bytes
    pub fn output_length(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha1 => f.write_str("sha1"),
            DigestAlgorithm::Sha256 => f.write_str("sha256"),
            DigestAlgorithm::Sha384 => f.write_str("sha384"),
            DigestAlgorithm::Sha512 => f.write_str("sha512"),
        }
    }
}

/// RSA decryption padding with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsaPadding {
    Pkcs1v15,
    Oaep {
        digest: DigestAlgorithm,
        mgf1_digest: DigestAlgorithm,
        label: Vec<u8>,
    },
}

/// Primitive operations the engine delegates
pub trait CryptoProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Whether an RSA padding configuration can be executed.
    /// Called after all engine-side validation, just before the operation.
    fn check_rsa_padding(&self, padding: &RsaPadding) -> Result<(), ProviderError>;

    /// Encrypt and authenticate, returning ciphertext and detached tag
    fn aead_seal(
        &self,
        algorithm: AeadAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; AEAD_TAG_LENGTH]), ProviderError>;

    /// Verify the detached tag and decrypt
    fn aead_open(
        &self,
        algorithm: AeadAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError>;

    /// RSA private-key decryption
    fn rsa_decrypt(
        &self,
        key: &RsaPrivateKey,
        padding: &RsaPadding,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError>;

    /// Fill `out` with cryptographically secure random bytes
    fn random_bytes(&self, out: &mut [u8]) -> Result<(), ProviderError>;
}

/// Provider backed by RustCrypto implementations and the OS RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareProvider;

impl SoftwareProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for SoftwareProvider {
    fn name(&self) -> &str {
        "software"
    }

    fn check_rsa_padding(&self, padding: &RsaPadding) -> Result<(), ProviderError> {
        asymmetric::check_padding(padding)
    }

    fn aead_seal(
        &self,
        algorithm: AeadAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; AEAD_TAG_LENGTH]), ProviderError> {
        aead::seal(algorithm, key, nonce, aad, plaintext)
    }

    fn aead_open(
        &self,
        algorithm: AeadAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
        aead::open(algorithm, key, nonce, aad, ciphertext, tag)
    }

    fn rsa_decrypt(
        &self,
        key: &RsaPrivateKey,
        padding: &RsaPadding,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
        asymmetric::decrypt(key, padding, ciphertext)
    }

    fn random_bytes(&self, out: &mut [u8]) -> Result<(), ProviderError> {
        OsRng
            .try_fill_bytes(out)
            .map_err(|e| ProviderError::Failure(format!("OS RNG unavailable: {}", e)))
    }
}
