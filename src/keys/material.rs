// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key material parsing and validation.
//!
//! Material is validated once, when it enters the registry. Secret bytes are
//! held in `Zeroizing` buffers (RSA keys zeroize themselves on drop).

use super::{EcCurve, KeyType, KeyTypeParameters, SYM_MAX_KEY_SIZE, SYM_MIN_KEY_SIZE};
use crate::error::{EngineError, EngineResult};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::fmt;
use zeroize::Zeroizing;

/// Validated secret material owned by a registry entry
pub(crate) enum KeyMaterial {
    Symmetric(Zeroizing<Vec<u8>>),
    Rsa(Box<RsaPrivateKey>),
    Ec {
        curve: EcCurve,
        scalar: Zeroizing<Vec<u8>>,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Symmetric(bytes) => write!(f, "Symmetric({} bytes, redacted)", bytes.len()),
            KeyMaterial::Rsa(key) => write!(f, "Rsa({} bits, redacted)", key.n().bits()),
            KeyMaterial::Ec { curve, .. } => write!(f, "Ec({}, redacted)", curve),
        }
    }
}

impl KeyMaterial {
    /// Parse `bytes` as material of `key_type`
    ///
    /// # Errors
    ///
    /// - `NullParameter` if `bytes` is empty, or an EC key comes without a curve
    /// - `InvalidParameter` if the material does not fit the key type or constraints
    pub(crate) fn parse(
        key_type: KeyType,
        constraints: Option<&KeyTypeParameters>,
        bytes: &[u8],
        rsa_modulus_bits: &[usize],
    ) -> EngineResult<Self> {
        if bytes.is_empty() {
            return Err(EngineError::NullParameter("key material"));
        }

        if key_type != KeyType::Ec {
            if let Some(constraints) = constraints {
                return Err(EngineError::InvalidParameter(format!(
                    "{:?} constraints do not apply to {} keys",
                    constraints, key_type
                )));
            }
        }

        match key_type {
            KeyType::Symmetric => {
                if !(SYM_MIN_KEY_SIZE..=SYM_MAX_KEY_SIZE).contains(&bytes.len()) {
                    return Err(EngineError::InvalidParameter(format!(
                        "symmetric key length {} outside {}..={}",
                        bytes.len(),
                        SYM_MIN_KEY_SIZE,
                        SYM_MAX_KEY_SIZE
                    )));
                }
                Ok(KeyMaterial::Symmetric(Zeroizing::new(bytes.to_vec())))
            }
            KeyType::Rsa => {
                let key = RsaPrivateKey::from_pkcs8_der(bytes).map_err(|e| {
                    EngineError::InvalidParameter(format!("RSA key is not PKCS#8 DER: {}", e))
                })?;
                let bits = key.n().bits();
                if !rsa_modulus_bits.contains(&bits) {
                    return Err(EngineError::InvalidParameter(format!(
                        "RSA modulus of {} bits not accepted",
                        bits
                    )));
                }
                Ok(KeyMaterial::Rsa(Box::new(key)))
            }
            KeyType::Ec => {
                let curve = match constraints {
                    Some(KeyTypeParameters::Ec { curve }) => *curve,
                    None => return Err(EngineError::NullParameter("type parameters")),
                };
                if bytes.len() != curve.key_size() {
                    return Err(EngineError::InvalidParameter(format!(
                        "{} private key must be {} bytes, got {}",
                        curve,
                        curve.key_size(),
                        bytes.len()
                    )));
                }
                if curve == EcCurve::NistP256 {
                    p256::SecretKey::from_slice(bytes).map_err(|_| {
                        EngineError::InvalidParameter("not a valid P-256 scalar".to_string())
                    })?;
                }
                Ok(KeyMaterial::Ec {
                    curve,
                    scalar: Zeroizing::new(bytes.to_vec()),
                })
            }
        }
    }

    pub(crate) fn key_type(&self) -> KeyType {
        match self {
            KeyMaterial::Symmetric(_) => KeyType::Symmetric,
            KeyMaterial::Rsa(_) => KeyType::Rsa,
            KeyMaterial::Ec { .. } => KeyType::Ec,
        }
    }

    /// Length in bytes (RSA: modulus length)
    pub(crate) fn size(&self) -> usize {
        match self {
            KeyMaterial::Symmetric(bytes) => bytes.len(),
            KeyMaterial::Rsa(key) => key.size(),
            KeyMaterial::Ec { curve, .. } => curve.key_size(),
        }
    }

    pub(crate) fn curve(&self) -> Option<EcCurve> {
        match self {
            KeyMaterial::Ec { curve, .. } => Some(*curve),
            _ => None,
        }
    }

    /// Public half of an asymmetric key.
    ///
    /// RSA: SubjectPublicKeyInfo DER. P-256: uncompressed SEC1 point.
    /// Ed25519: 32-byte verifying key.
    pub(crate) fn public_key(&self) -> EngineResult<Vec<u8>> {
        match self {
            KeyMaterial::Symmetric(_) => Err(EngineError::BadKeyType(
                "symmetric keys have no public component".to_string(),
            )),
            KeyMaterial::Rsa(key) => {
                let der = key
                    .to_public_key()
                    .to_public_key_der()
                    .map_err(|e| EngineError::Internal(format!("SPKI encoding failed: {}", e)))?;
                Ok(der.as_bytes().to_vec())
            }
            KeyMaterial::Ec {
                curve: EcCurve::NistP256,
                scalar,
            } => {
                let secret = p256::SecretKey::from_slice(scalar)
                    .map_err(|e| EngineError::Internal(format!("P-256 scalar rejected: {}", e)))?;
                Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec())
            }
            KeyMaterial::Ec {
                curve: EcCurve::Ed25519,
                scalar,
            } => {
                let seed: [u8; 32] = scalar
                    .as_slice()
                    .try_into()
                    .map_err(|_| EngineError::Internal("Ed25519 seed length".to_string()))?;
                let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
                Ok(signing.verifying_key().to_bytes().to_vec())
            }
        }
    }

    /// Raw symmetric bytes, if this is a symmetric key
    pub(crate) fn symmetric(&self) -> Option<&[u8]> {
        match self {
            KeyMaterial::Symmetric(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// RSA private key, if this is an RSA key
    pub(crate) fn rsa(&self) -> Option<&RsaPrivateKey> {
        match self {
            KeyMaterial::Rsa(key) => Some(&**key),
            _ => None,
        }
    }
}
