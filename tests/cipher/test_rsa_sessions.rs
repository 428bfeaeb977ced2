// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RSA-OAEP and RSA PKCS#1 v1.5 decrypt sessions

use crate::common;
use keyguard_engine::cipher::OaepParameters;
use keyguard_engine::rights::Rights;
use keyguard_engine::{
    CipherAlgorithm, CipherMode, CipherParameters, DigestAlgorithm, Engine, KeyHandle,
    SessionState, Status,
};
use rand::rngs::OsRng;
use sha2::{Sha256, Sha384, Sha512};
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPublicKey};

fn oaep_sha256() -> CipherParameters {
    CipherParameters::RsaOaep(OaepParameters::new(DigestAlgorithm::Sha256))
}

fn rsa_engine() -> (Engine, KeyHandle) {
    let engine = common::engine();
    let handle = common::import_sample_rsa(&engine, &Rights::allow_all());
    (engine, handle)
}

fn public_key() -> RsaPublicKey {
    RsaPublicKey::from(common::sample_rsa_2048())
}

#[test]
fn test_oaep_output_size_mismatch() {
    let (engine, handle) = rsa_engine();
    let mut session = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap();

    let input = common::random_bytes(33);
    let mut output = [0u8; 33];
    let err = session.process_last(&input, &mut output, None).unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
    assert_eq!(session.state(), SessionState::Finalized);
}

#[test]
fn test_oaep_decrypt_roundtrip() {
    let (engine, handle) = rsa_engine();
    let secret = common::random_bytes(32);
    let ciphertext = public_key()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &secret)
        .unwrap();

    let mut session = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap();
    assert_eq!(session.required_output_length(0), 256 - 2 * 32 - 2);

    let mut output = vec![0u8; 256];
    let written = session.process_last(&ciphertext, &mut output, None).unwrap();
    assert_eq!(&output[..written], &secret[..]);
}

#[test]
fn test_oaep_output_too_small_for_plaintext() {
    let (engine, handle) = rsa_engine();
    let ciphertext = public_key()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &[7u8; 32])
        .unwrap();

    let mut session = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap();
    let mut output = [0u8; 16];
    let err = session.process_last(&ciphertext, &mut output, None).unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
}

#[test]
fn test_oaep_label_and_digest_must_match() {
    let (engine, handle) = rsa_engine();
    let ciphertext = public_key()
        .encrypt(&mut OsRng, Oaep::new_with_label::<Sha256, _>("wrapping"), b"key bytes")
        .unwrap();

    let labelled = CipherParameters::RsaOaep(OaepParameters {
        label: Some(b"wrapping".to_vec()),
        ..OaepParameters::new(DigestAlgorithm::Sha256)
    });
    let mut session = engine
        .cipher_init(CipherAlgorithm::RsaOaep, CipherMode::Decrypt, Some(handle), Some(&labelled))
        .unwrap();
    let mut output = [0u8; 256];
    let written = session.process_last(&ciphertext, &mut output, None).unwrap();
    assert_eq!(&output[..written], b"key bytes");

    let mut unlabelled = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap();
    let err = unlabelled
        .process_last(&ciphertext, &mut output, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::VerificationFailed);
}

#[test]
fn test_pkcs1v15_roundtrip() {
    let (engine, handle) = rsa_engine();
    let ciphertext = public_key()
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, b"legacy")
        .unwrap();

    let mut session = engine
        .cipher_init(CipherAlgorithm::RsaPkcs1v15, CipherMode::Decrypt, Some(handle), None)
        .unwrap();
    assert_eq!(session.required_output_length(0), 245);
    let mut output = [0u8; 245];
    let written = session.process_last(&ciphertext, &mut output, None).unwrap();
    assert_eq!(&output[..written], b"legacy");
}

#[test]
fn test_rsa_is_not_streaming() {
    let (engine, handle) = rsa_engine();
    let mut session = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap();
    let mut output = [0u8; 256];
    let err = session.process(&[0u8; 256], &mut output).unwrap_err();
    assert_eq!(err.status(), Status::OperationNotSupported);
    assert_eq!(session.state(), SessionState::Finalized);
}

#[test]
fn test_rsa_rejects_tag_buffer() {
    let (engine, handle) = rsa_engine();
    let mut session = engine
        .cipher_init(CipherAlgorithm::RsaPkcs1v15, CipherMode::Decrypt, Some(handle), None)
        .unwrap();
    let mut output = [0u8; 256];
    let mut tag = [0u8; 16];
    let err = session
        .process_last(&[0u8; 256], &mut output, Some(&mut tag))
        .unwrap_err();
    assert_eq!(err.status(), Status::BadParameter);
}

#[test]
fn test_unsupported_combinations() {
    let (engine, handle) = rsa_engine();

    let err = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Encrypt,
            Some(handle),
            Some(&oaep_sha256()),
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::OperationNotSupported);

    let sha1 = CipherParameters::RsaOaep(OaepParameters::new(DigestAlgorithm::Sha1));
    let err = engine
        .cipher_init(CipherAlgorithm::RsaOaep, CipherMode::Decrypt, Some(handle), Some(&sha1))
        .unwrap_err();
    assert_eq!(err.status(), Status::OperationNotSupported);

    let binary_label = CipherParameters::RsaOaep(OaepParameters {
        label: Some(vec![0xC3, 0x28]),
        ..OaepParameters::new(DigestAlgorithm::Sha256)
    });
    let err = engine
        .cipher_init(
            CipherAlgorithm::RsaOaep,
            CipherMode::Decrypt,
            Some(handle),
            Some(&binary_label),
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::OperationNotSupported);
}

#[test]
fn test_sha384_and_sha512_digests() {
    let (engine, handle) = rsa_engine();
    for digest in [DigestAlgorithm::Sha384, DigestAlgorithm::Sha512] {
        let ciphertext = match digest {
            DigestAlgorithm::Sha384 => public_key()
                .encrypt(&mut OsRng, Oaep::new::<Sha384>(), b"k")
                .unwrap(),
            _ => public_key()
                .encrypt(&mut OsRng, Oaep::new::<Sha512>(), b"k")
                .unwrap(),
        };
        let parameters = CipherParameters::RsaOaep(OaepParameters::new(digest));
        let mut session = engine
            .cipher_init(CipherAlgorithm::RsaOaep, CipherMode::Decrypt, Some(handle), Some(&parameters))
            .unwrap();
        let mut output = [0u8; 256];
        let written = session.process_last(&ciphertext, &mut output, None).unwrap();
        assert_eq!(&output[..written], b"k", "{}", digest);
    }
}
