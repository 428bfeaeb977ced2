// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cipher session state machine
//!
//! A session only exists as the result of a successful init, so it starts
//! `Initialized`. `process` moves it to `Processing`; `process_last` and any
//! failed call move it to `Finalized`, after which every call is rejected
//! with `InvalidState`.
//!
//! AEAD sessions accumulate input and run the provider once in
//! `process_last`; the accumulated size is bounded by
//! `EngineConfig::max_session_buffer`.

use super::{
    check_iv_length, check_key_for, parameter_mismatch, CipherAlgorithm, CipherMode,
    CipherParameters,
};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::keys::{KeyEntry, KeyHandle};
use crate::provider::{AeadAlgorithm, CryptoProvider, RsaPadding, AEAD_TAG_LENGTH};
use crate::rights::Usage;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Lifecycle state of a [`CipherSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Processing,
    Finalized,
}

enum Transform {
    Aead {
        algorithm: AeadAlgorithm,
        iv: Vec<u8>,
        aad: Vec<u8>,
        buffer: Zeroizing<Vec<u8>>,
    },
    Rsa {
        padding: RsaPadding,
    },
}

/// One encrypt or decrypt operation bound to a key snapshot
pub struct CipherSession {
    algorithm: CipherAlgorithm,
    mode: CipherMode,
    handle: KeyHandle,
    key: Arc<KeyEntry>,
    provider: Arc<dyn CryptoProvider>,
    transform: Transform,
    max_buffer: usize,
    state: SessionState,
}

impl fmt::Debug for CipherSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSession")
            .field("algorithm", &self.algorithm)
            .field("mode", &self.mode)
            .field("handle", &self.handle)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

pub(crate) fn init(
    engine: &Engine,
    algorithm: CipherAlgorithm,
    mode: CipherMode,
    key: Option<KeyHandle>,
    parameters: Option<&CipherParameters>,
) -> EngineResult<CipherSession> {
    // Null checks
    let aead_inputs = match parameters {
        None if algorithm.requires_parameters() => {
            return Err(EngineError::NullParameter("parameters"))
        }
        Some(CipherParameters::AesGcm(p) | CipherParameters::ChaCha20Poly1305(p)) => Some((
            p.iv.as_deref().ok_or(EngineError::NullParameter("iv"))?,
            p.aad.as_deref().ok_or(EngineError::NullParameter("aad"))?,
        )),
        _ => None,
    };
    let handle = key.ok_or(EngineError::NullParameter("key handle"))?;

    // Structural checks
    if let Some(supplied) = parameters {
        if supplied.algorithm() != algorithm {
            return Err(parameter_mismatch(algorithm, supplied.algorithm()));
        }
    }
    let transform = match (algorithm.aead(), aead_inputs, parameters) {
        (Some(aead), Some((iv, aad)), _) => {
            check_iv_length(iv)?;
            Transform::Aead {
                algorithm: aead,
                iv: iv.to_vec(),
                aad: aad.to_vec(),
                buffer: Zeroizing::new(Vec::new()),
            }
        }
        (None, _, Some(CipherParameters::RsaOaep(p))) => Transform::Rsa {
            padding: p.padding()?,
        },
        (None, _, None) => Transform::Rsa {
            padding: RsaPadding::Pkcs1v15,
        },
        _ => {
            return Err(EngineError::BadParameter(format!(
                "parameters do not describe {}",
                algorithm
            )))
        }
    };

    let entry = engine.registry().lookup(Some(handle))?;

    let usage = match mode {
        CipherMode::Encrypt => Usage::Encrypt,
        CipherMode::Decrypt => Usage::Decrypt,
    };
    engine.authorize(&entry, usage)?;

    check_key_for(algorithm, &entry)?;

    if let Transform::Rsa { padding } = &transform {
        if mode == CipherMode::Encrypt {
            return Err(EngineError::OperationNotSupported(
                "RSA encryption is done with the exported public key".to_string(),
            ));
        }
        engine.provider().check_rsa_padding(padding)?;
    }

    tracing::debug!("Cipher session opened: {} {} on {}", algorithm, mode, handle);

    Ok(CipherSession {
        algorithm,
        mode,
        handle,
        key: entry,
        provider: Arc::clone(engine.provider()),
        transform,
        max_buffer: engine.config().max_session_buffer,
        state: SessionState::Initialized,
    })
}

/// AEAD output must be exactly as long as its input
fn check_provider_length(produced: usize, expected: usize) -> EngineResult<()> {
    if produced != expected {
        return Err(EngineError::Internal(format!(
            "provider returned {} bytes for {} bytes of input",
            produced, expected
        )));
    }
    Ok(())
}

fn append_bounded(buffer: &mut Zeroizing<Vec<u8>>, input: &[u8], max: usize) -> EngineResult<()> {
    let total = buffer.len().saturating_add(input.len());
    if total > max {
        return Err(EngineError::BadParameter(format!(
            "session input of {} bytes exceeds limit of {}",
            total, max
        )));
    }
    buffer.extend_from_slice(input);
    Ok(())
}

impl CipherSession {
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Handle of the key the session was initialized with
    pub fn key_handle(&self) -> KeyHandle {
        self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.state == SessionState::Finalized {
            return Err(EngineError::InvalidState(format!(
                "{} session already finalized",
                self.algorithm
            )));
        }
        Ok(())
    }

    /// Output buffer size a `process_last` call with `input_len` more bytes needs.
    ///
    /// For RSA decryption this is the largest plaintext the padding admits.
    pub fn required_output_length(&self, input_len: usize) -> usize {
        match &self.transform {
            Transform::Aead { buffer, .. } => buffer.len().saturating_add(input_len),
            Transform::Rsa { padding } => {
                let overhead = match padding {
                    RsaPadding::Pkcs1v15 => 11,
                    RsaPadding::Oaep { digest, .. } => 2 * digest.output_length() + 2,
                };
                self.key.size().saturating_sub(overhead)
            }
        }
    }

    /// Feed intermediate input. Returns the number of bytes written to
    /// `_output`, which is always zero: AEAD output is produced by
    /// [`process_last`](Self::process_last).
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the session is finalized
    /// - `OperationNotSupported` for RSA sessions
    /// - `BadParameter` if the accumulated input exceeds the session limit
    ///
    /// Any error finalizes the session.
    pub fn process(&mut self, input: &[u8], _output: &mut [u8]) -> EngineResult<usize> {
        self.ensure_open()?;

        let result = match &mut self.transform {
            Transform::Aead { buffer, .. } => append_bounded(buffer, input, self.max_buffer),
            Transform::Rsa { .. } => Err(EngineError::OperationNotSupported(format!(
                "{} does not support intermediate processing",
                self.algorithm
            ))),
        };

        match result {
            Ok(()) => {
                self.state = SessionState::Processing;
                Ok(0)
            }
            Err(e) => {
                self.state = SessionState::Finalized;
                tracing::debug!("Cipher session on {} failed in process: {}", self.handle, e);
                Err(e)
            }
        }
    }

    /// Finish the operation and write the result into `output`.
    ///
    /// AEAD sessions require `tag` (16 bytes): it receives the tag when
    /// encrypting and supplies it when decrypting. RSA sessions take no tag.
    /// Returns the number of bytes written. The session is finalized whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the session is already finalized
    /// - `NullParameter` if an AEAD session gets no tag
    /// - `BadParameter` for a tag of the wrong length
    /// - `InvalidParameter` if `input` or `output` has the wrong size for the key
    /// - `VerificationFailed` if the tag or padding does not verify
    /// - `Internal` if the provider returns output of the wrong length
    pub fn process_last(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        tag: Option<&mut [u8]>,
    ) -> EngineResult<usize> {
        self.ensure_open()?;
        self.state = SessionState::Finalized;

        let result = self.finish(input, output, tag);
        match &result {
            Ok(written) => tracing::debug!(
                "Cipher session on {} finalized ({} bytes)",
                self.handle,
                written
            ),
            Err(e) => tracing::debug!("Cipher session on {} failed: {}", self.handle, e),
        }
        result
    }

    fn finish(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        tag: Option<&mut [u8]>,
    ) -> EngineResult<usize> {
        match &mut self.transform {
            Transform::Aead {
                algorithm,
                iv,
                aad,
                buffer,
            } => {
                let tag = tag.ok_or(EngineError::NullParameter("tag"))?;
                if tag.len() != AEAD_TAG_LENGTH {
                    return Err(EngineError::BadParameter(format!(
                        "tag length {}, expected {}",
                        tag.len(),
                        AEAD_TAG_LENGTH
                    )));
                }
                append_bounded(buffer, input, self.max_buffer)?;
                if output.len() < buffer.len() {
                    return Err(EngineError::InvalidParameter(format!(
                        "output of {} bytes cannot hold {} bytes",
                        output.len(),
                        buffer.len()
                    )));
                }

                let key = self.key.material().symmetric().ok_or_else(|| {
                    EngineError::Internal("AEAD session bound to a non-symmetric key".to_string())
                })?;

                match self.mode {
                    CipherMode::Encrypt => {
                        let (ciphertext, computed) =
                            self.provider.aead_seal(*algorithm, key, iv, aad, buffer)?;
                        check_provider_length(ciphertext.len(), buffer.len())?;
                        output[..ciphertext.len()].copy_from_slice(&ciphertext);
                        tag.copy_from_slice(&computed);
                        Ok(ciphertext.len())
                    }
                    CipherMode::Decrypt => {
                        let plaintext =
                            self.provider.aead_open(*algorithm, key, iv, aad, buffer, tag)?;
                        check_provider_length(plaintext.len(), buffer.len())?;
                        output[..plaintext.len()].copy_from_slice(&plaintext);
                        Ok(plaintext.len())
                    }
                }
            }
            Transform::Rsa { padding } => {
                if tag.is_some() {
                    return Err(EngineError::BadParameter(
                        "RSA sessions take no tag".to_string(),
                    ));
                }
                let modulus_len = self.key.size();
                if input.len() != modulus_len {
                    return Err(EngineError::InvalidParameter(format!(
                        "RSA input of {} bytes, modulus is {} bytes",
                        input.len(),
                        modulus_len
                    )));
                }

                let key = self.key.material().rsa().ok_or_else(|| {
                    EngineError::Internal("RSA session bound to a non-RSA key".to_string())
                })?;
                let plaintext = self.provider.rsa_decrypt(key, padding, input)?;
                if output.len() < plaintext.len() {
                    return Err(EngineError::InvalidParameter(format!(
                        "output of {} bytes cannot hold {} bytes of plaintext",
                        output.len(),
                        plaintext.len()
                    )));
                }
                output[..plaintext.len()].copy_from_slice(&plaintext);
                Ok(plaintext.len())
            }
        }
    }
}
