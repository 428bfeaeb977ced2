// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM and ChaCha20-Poly1305 with detached tags
//!
//! **Format**: ciphertext has the same length as the plaintext; the 16-byte
//! authentication tag travels separately, as the cipher and unwrap
//! parameter structs carry it in its own field.
//!
//! - Nonce: 12 bytes for both algorithms
//! - AES-GCM key: 16 bytes (AES-128) or 32 bytes (AES-256)
//! - ChaCha20-Poly1305 key: 32 bytes

use super::{AeadAlgorithm, ProviderError, AEAD_NONCE_LENGTH, AEAD_TAG_LENGTH};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroizing;

fn check_sizes(algorithm: AeadAlgorithm, key: &[u8], nonce: &[u8]) -> Result<(), ProviderError> {
    if nonce.len() != AEAD_NONCE_LENGTH {
        return Err(ProviderError::Failure(format!(
            "{} nonce must be {} bytes, got {}",
            algorithm,
            AEAD_NONCE_LENGTH,
            nonce.len()
        )));
    }

    let key_ok = match algorithm {
        AeadAlgorithm::AesGcm => key.len() == 16 || key.len() == 32,
        AeadAlgorithm::ChaCha20Poly1305 => key.len() == 32,
    };
    if !key_ok {
        return Err(ProviderError::Failure(format!(
            "{} cannot use a {}-byte key",
            algorithm,
            key.len()
        )));
    }
    Ok(())
}

fn cipher_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Failure(format!("failed to create cipher: {}", e))
}

/// Encrypt `plaintext`, returning ciphertext and the detached tag
pub fn seal(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; AEAD_TAG_LENGTH]), ProviderError> {
    check_sizes(algorithm, key, nonce)?;

    let mut buffer = plaintext.to_vec();
    let tag = match (algorithm, key.len()) {
        (AeadAlgorithm::AesGcm, 16) => Aes128Gcm::new_from_slice(key)
            .map_err(cipher_error)?
            .encrypt_in_place_detached(aes_gcm::Nonce::from_slice(nonce), aad, &mut buffer),
        (AeadAlgorithm::AesGcm, _) => Aes256Gcm::new_from_slice(key)
            .map_err(cipher_error)?
            .encrypt_in_place_detached(aes_gcm::Nonce::from_slice(nonce), aad, &mut buffer),
        (AeadAlgorithm::ChaCha20Poly1305, _) => ChaCha20Poly1305::new_from_slice(key)
            .map_err(cipher_error)?
            .encrypt_in_place_detached(chacha20poly1305::Nonce::from_slice(nonce), aad, &mut buffer),
    }
    .map_err(|e| ProviderError::Failure(format!("{} encryption failed: {}", algorithm, e)))?;

    let mut tag_bytes = [0u8; AEAD_TAG_LENGTH];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buffer, tag_bytes))
}

/// Verify `tag` over `ciphertext`/`aad` and decrypt
pub fn open(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
    check_sizes(algorithm, key, nonce)?;
    if tag.len() != AEAD_TAG_LENGTH {
        return Err(ProviderError::Failure(format!(
            "tag must be {} bytes, got {}",
            AEAD_TAG_LENGTH,
            tag.len()
        )));
    }

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    match (algorithm, key.len()) {
        (AeadAlgorithm::AesGcm, 16) => Aes128Gcm::new_from_slice(key)
            .map_err(cipher_error)?
            .decrypt_in_place_detached(
                aes_gcm::Nonce::from_slice(nonce),
                aad,
                &mut *buffer,
                aes_gcm::Tag::from_slice(tag),
            ),
        (AeadAlgorithm::AesGcm, _) => Aes256Gcm::new_from_slice(key)
            .map_err(cipher_error)?
            .decrypt_in_place_detached(
                aes_gcm::Nonce::from_slice(nonce),
                aad,
                &mut *buffer,
                aes_gcm::Tag::from_slice(tag),
            ),
        (AeadAlgorithm::ChaCha20Poly1305, _) => ChaCha20Poly1305::new_from_slice(key)
            .map_err(cipher_error)?
            .decrypt_in_place_detached(
                chacha20poly1305::Nonce::from_slice(nonce),
                aad,
                &mut *buffer,
                chacha20poly1305::Tag::from_slice(tag),
            ),
    }
    .map_err(|_| ProviderError::AuthenticationFailed {
        operation: format!("{} open", algorithm),
    })?;

    Ok(buffer)
}
