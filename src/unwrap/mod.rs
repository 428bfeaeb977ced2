// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Unwrap
//!
//! Recovers a wrapped key with a registered wrapping key and registers the
//! result as a new key. Every check is a hard gate evaluated in this order:
//!
//! 1. Required fields present: rights, the curve of an EC target, wrapped
//!    bytes, parameters (and the IV, AAD and tag for AEAD), wrapping key
//!    handle → `NullParameter`
//! 2. Parameter structure: variant, IV length, tag length, digests → `BadParameter`
//! 3. Wrapping key resolves → `BadParameter`
//! 4. Wrapping key rights permit `Unwrap` now, for this caller → `OperationNotAllowed`
//! 5. Wrapping key type and size fit the algorithm → `BadKeyType`
//! 6. Provider implements the padding → `OperationNotSupported`
//! 7. Authenticated decryption → `VerificationFailed`
//! 8. Registration of the recovered material under the target rights
//!
//! A failure at any gate leaves the registry untouched.

use crate::cipher::{
    check_iv_length, check_key_for, parameter_mismatch, CipherAlgorithm, OaepParameters,
};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::keys::{KeyHandle, KeyType, KeyTypeParameters};
use crate::provider::{RsaPadding, AEAD_TAG_LENGTH};
use crate::rights::{Rights, Usage};
use zeroize::Zeroizing;

/// AEAD unwrap parameters. The tag travels separately from the wrapped bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AeadUnwrapParameters {
    pub iv: Option<Vec<u8>>,
    pub aad: Option<Vec<u8>>,
    pub tag: Option<Vec<u8>>,
}

/// Algorithm-specific unwrap parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnwrapParameters {
    AesGcm(AeadUnwrapParameters),
    ChaCha20Poly1305(AeadUnwrapParameters),
    RsaOaep(OaepParameters),
}

impl UnwrapParameters {
    pub fn algorithm(&self) -> CipherAlgorithm {
        match self {
            UnwrapParameters::AesGcm(_) => CipherAlgorithm::AesGcm,
            UnwrapParameters::ChaCha20Poly1305(_) => CipherAlgorithm::ChaCha20Poly1305,
            UnwrapParameters::RsaOaep(_) => CipherAlgorithm::RsaOaep,
        }
    }
}

/// Everything an unwrap needs. Absent fields are `None`.
#[derive(Debug, Clone)]
pub struct UnwrapRequest {
    /// Rights bound to the recovered key
    pub rights: Option<Rights>,
    /// Type of the recovered key
    pub key_type: KeyType,
    /// Type constraints of the recovered key (EC curve)
    pub type_parameters: Option<KeyTypeParameters>,
    pub algorithm: CipherAlgorithm,
    pub parameters: Option<UnwrapParameters>,
    pub wrapping_key: Option<KeyHandle>,
    pub wrapped: Option<Vec<u8>>,
}

enum Unwrapper<'a> {
    Aead {
        iv: &'a [u8],
        aad: &'a [u8],
        tag: &'a [u8],
    },
    Rsa(RsaPadding),
}

pub(crate) fn unwrap_key(engine: &Engine, request: &UnwrapRequest) -> EngineResult<KeyHandle> {
    let algorithm = request.algorithm;

    // Gate 1: required fields
    let rights = request
        .rights
        .as_ref()
        .ok_or(EngineError::NullParameter("rights"))?;
    if request.key_type == KeyType::Ec && request.type_parameters.is_none() {
        return Err(EngineError::NullParameter("type parameters"));
    }
    let wrapped = request
        .wrapped
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or(EngineError::NullParameter("wrapped key"))?;
    let aead_inputs = match &request.parameters {
        None if algorithm.requires_parameters() => {
            return Err(EngineError::NullParameter("parameters"))
        }
        Some(UnwrapParameters::AesGcm(p) | UnwrapParameters::ChaCha20Poly1305(p)) => Some((
            p.iv.as_deref().ok_or(EngineError::NullParameter("iv"))?,
            p.aad.as_deref().ok_or(EngineError::NullParameter("aad"))?,
            p.tag.as_deref().ok_or(EngineError::NullParameter("tag"))?,
        )),
        _ => None,
    };
    let wrapping_handle = request
        .wrapping_key
        .ok_or(EngineError::NullParameter("wrapping key"))?;

    // Gate 2: parameter structure
    if let Some(supplied) = &request.parameters {
        if supplied.algorithm() != algorithm {
            return Err(parameter_mismatch(algorithm, supplied.algorithm()));
        }
    }
    let unwrapper = match (algorithm.aead(), aead_inputs, &request.parameters) {
        (Some(_), Some((iv, aad, tag)), _) => {
            check_iv_length(iv)?;
            if tag.len() != AEAD_TAG_LENGTH {
                return Err(EngineError::BadParameter(format!(
                    "tag length {}, expected {}",
                    tag.len(),
                    AEAD_TAG_LENGTH
                )));
            }
            Unwrapper::Aead { iv, aad, tag }
        }
        (None, _, Some(UnwrapParameters::RsaOaep(p))) => Unwrapper::Rsa(p.padding()?),
        (None, _, None) => Unwrapper::Rsa(RsaPadding::Pkcs1v15),
        _ => {
            return Err(EngineError::BadParameter(format!(
                "parameters do not describe {}",
                algorithm
            )))
        }
    };

    // Gate 3: wrapping key resolution
    let wrapping_key = engine.registry().lookup(Some(wrapping_handle))?;

    // Gate 4: authorization
    engine.authorize(&wrapping_key, Usage::Unwrap)?;

    // Gate 5: wrapping key type and size
    check_key_for(algorithm, &wrapping_key)?;

    // Gates 6 and 7: provider support, then the cryptographic unwrap
    let provider = engine.provider();
    let material: Zeroizing<Vec<u8>> = match (&unwrapper, algorithm.aead()) {
        (Unwrapper::Aead { iv, aad, tag }, Some(aead)) => {
            let key = wrapping_key.material().symmetric().ok_or_else(|| {
                EngineError::Internal("AEAD wrapping key is not symmetric".to_string())
            })?;
            provider.aead_open(aead, key, iv, aad, wrapped, tag)?
        }
        (Unwrapper::Rsa(padding), None) => {
            provider.check_rsa_padding(padding)?;
            let key = wrapping_key.material().rsa().ok_or_else(|| {
                EngineError::Internal("RSA wrapping key has no private key".to_string())
            })?;
            provider.rsa_decrypt(key, padding, wrapped)?
        }
        _ => {
            return Err(EngineError::Internal(format!(
                "unwrapper does not match {}",
                algorithm
            )))
        }
    };

    // Gate 8: registration
    let handle = engine.registry().create(
        &material,
        request.key_type,
        Some(rights),
        request.type_parameters,
    )?;

    tracing::info!(
        "🔓 Unwrapped {} key {} with {} key {}",
        request.key_type,
        handle,
        algorithm,
        wrapping_handle
    );
    Ok(handle)
}
