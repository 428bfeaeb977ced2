// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RSA decryption (OAEP and PKCS#1 v1.5)

use super::{DigestAlgorithm, ProviderError, RsaPadding};
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey};
use sha2::digest::DynDigest;
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

type BoxedDigest = Box<dyn DynDigest + Send + Sync>;

fn boxed_digest(digest: DigestAlgorithm) -> Result<BoxedDigest, ProviderError> {
    match digest {
        DigestAlgorithm::Sha256 => Ok(Box::new(Sha256::new())),
        DigestAlgorithm::Sha384 => Ok(Box::new(Sha384::new())),
        DigestAlgorithm::Sha512 => Ok(Box::new(Sha512::new())),
        DigestAlgorithm::Sha1 => Err(ProviderError::Unsupported(
            "SHA-1 is not available in the software provider".to_string(),
        )),
    }
}

fn oaep_label(label: &[u8]) -> Result<Option<String>, ProviderError> {
    if label.is_empty() {
        return Ok(None);
    }
    String::from_utf8(label.to_vec())
        .map(Some)
        .map_err(|_| ProviderError::Unsupported("OAEP label must be UTF-8".to_string()))
}

/// Reject padding configurations this provider cannot execute
pub fn check_padding(padding: &RsaPadding) -> Result<(), ProviderError> {
    match padding {
        RsaPadding::Pkcs1v15 => Ok(()),
        RsaPadding::Oaep {
            digest,
            mgf1_digest,
            label,
        } => {
            boxed_digest(*digest)?;
            boxed_digest(*mgf1_digest)?;
            oaep_label(label)?;
            Ok(())
        }
    }
}

/// Decrypt `ciphertext` with `key` under `padding`
pub fn decrypt(
    key: &RsaPrivateKey,
    padding: &RsaPadding,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
    let result = match padding {
        RsaPadding::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, ciphertext),
        RsaPadding::Oaep {
            digest,
            mgf1_digest,
            label,
        } => {
            let scheme = Oaep {
                digest: boxed_digest(*digest)?,
                mgf_digest: boxed_digest(*mgf1_digest)?,
                label: oaep_label(label)?,
            };
            key.decrypt(scheme, ciphertext)
        }
    };

    result
        .map(Zeroizing::new)
        .map_err(|e| match e {
            rsa::Error::Decryption => ProviderError::AuthenticationFailed {
                operation: "rsa decrypt".to_string(),
            },
            other => ProviderError::Failure(format!("RSA decryption failed: {}", other)),
        })
}
