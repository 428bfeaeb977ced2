// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM and ChaCha20-Poly1305 sessions

use crate::common;
use chrono::Utc;
use keyguard_engine::cipher::AeadParameters;
use keyguard_engine::rights::Rights;
use keyguard_engine::{
    CipherAlgorithm, CipherMode, CipherParameters, EngineConfig, SessionState, Status,
};

fn aead(algorithm: CipherAlgorithm, iv: &[u8], aad: &[u8]) -> CipherParameters {
    let parameters = AeadParameters {
        iv: Some(iv.to_vec()),
        aad: Some(aad.to_vec()),
    };
    match algorithm {
        CipherAlgorithm::AesGcm => CipherParameters::AesGcm(parameters),
        CipherAlgorithm::ChaCha20Poly1305 => CipherParameters::ChaCha20Poly1305(parameters),
        other => panic!("{} is not an AEAD", other),
    }
}

#[test]
fn test_aes_gcm_encrypt_matches_reference() {
    let engine = common::engine();
    let key = common::random_bytes(16);
    let iv = common::random_bytes(12);
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &key);

    let mut session = engine
        .cipher_init(
            CipherAlgorithm::AesGcm,
            CipherMode::Encrypt,
            Some(handle),
            Some(&aead(CipherAlgorithm::AesGcm, &iv, b"header")),
        )
        .unwrap();
    assert_eq!(session.state(), SessionState::Initialized);

    let mut scratch = [0u8; 0];
    assert_eq!(session.process(b"streamed ", &mut scratch).unwrap(), 0);
    assert_eq!(session.state(), SessionState::Processing);
    assert_eq!(session.required_output_length(7), 16);

    let mut output = vec![0u8; 16];
    let mut tag = [0u8; 16];
    let written = session
        .process_last(b"message", &mut output, Some(&mut tag))
        .unwrap();
    assert_eq!(written, 16);
    assert_eq!(session.state(), SessionState::Finalized);

    let (expected, expected_tag) = common::aes_gcm_wrap(&key, &iv, b"header", b"streamed message");
    assert_eq!(output, expected);
    assert_eq!(tag.to_vec(), expected_tag);
}

#[test]
fn test_encrypt_then_decrypt_both_algorithms() {
    let engine = common::engine();
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &common::random_bytes(32));
    let iv = common::random_bytes(12);
    let plaintext = b"The quick brown fox jumps over the lazy dog";

    for algorithm in [CipherAlgorithm::AesGcm, CipherAlgorithm::ChaCha20Poly1305] {
        let parameters = aead(algorithm, &iv, b"aad");

        let mut encrypt = engine
            .cipher_init(algorithm, CipherMode::Encrypt, Some(handle), Some(&parameters))
            .unwrap();
        let mut ciphertext = vec![0u8; plaintext.len()];
        let mut tag = [0u8; 16];
        encrypt
            .process_last(plaintext, &mut ciphertext, Some(&mut tag))
            .unwrap();
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let mut decrypt = engine
            .cipher_init(algorithm, CipherMode::Decrypt, Some(handle), Some(&parameters))
            .unwrap();
        let mut recovered = vec![0u8; plaintext.len() + 8];
        let written = decrypt
            .process_last(&ciphertext, &mut recovered, Some(&mut tag))
            .unwrap();
        assert_eq!(&recovered[..written], &plaintext[..], "{} round trip", algorithm);
    }
}

#[test]
fn test_tampered_tag_fails_and_finalizes() {
    let engine = common::engine();
    let key = [6u8; 32];
    let iv = [1u8; 12];
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &key);
    let (ciphertext, mut tag) = common::aes_gcm_wrap(&key, &iv, b"", b"secret");
    tag[0] ^= 0x80;

    let mut session = engine
        .cipher_init(
            CipherAlgorithm::AesGcm,
            CipherMode::Decrypt,
            Some(handle),
            Some(&aead(CipherAlgorithm::AesGcm, &iv, b"")),
        )
        .unwrap();
    let mut output = [0u8; 6];
    let err = session
        .process_last(&ciphertext, &mut output, Some(&mut tag))
        .unwrap_err();
    assert_eq!(err.status(), Status::VerificationFailed);
    assert_eq!(output, [0u8; 6]);

    let err = session
        .process_last(&ciphertext, &mut output, Some(&mut tag))
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidState);
}

#[test]
fn test_process_last_argument_errors() {
    let engine = common::engine();
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 16]);
    let parameters = aead(CipherAlgorithm::AesGcm, &[0u8; 12], b"");
    let open = || {
        engine
            .cipher_init(CipherAlgorithm::AesGcm, CipherMode::Encrypt, Some(handle), Some(&parameters))
            .unwrap()
    };

    let mut output = [0u8; 8];

    let err = open().process_last(b"12345678", &mut output, None).unwrap_err();
    assert_eq!(err.status(), Status::NullParameter);

    let mut short_tag = [0u8; 15];
    let err = open()
        .process_last(b"12345678", &mut output, Some(&mut short_tag))
        .unwrap_err();
    assert_eq!(err.status(), Status::BadParameter);

    let mut tag = [0u8; 16];
    let err = open()
        .process_last(b"123456789", &mut output, Some(&mut tag))
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
}

#[test]
fn test_session_buffer_limit() {
    let config = EngineConfig {
        max_session_buffer: 32,
        ..EngineConfig::default()
    };
    let (engine, _clock) = common::engine_with_config_at(config, Utc::now());
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 32]);
    let mut session = engine
        .cipher_init(
            CipherAlgorithm::ChaCha20Poly1305,
            CipherMode::Encrypt,
            Some(handle),
            Some(&aead(CipherAlgorithm::ChaCha20Poly1305, &[0u8; 12], b"")),
        )
        .unwrap();

    let mut scratch = [0u8; 0];
    session.process(&[0u8; 20], &mut scratch).unwrap();
    let err = session.process(&[0u8; 20], &mut scratch).unwrap_err();
    assert_eq!(err.status(), Status::BadParameter);
    assert_eq!(session.state(), SessionState::Finalized);

    let err = session.process(&[0u8; 1], &mut scratch).unwrap_err();
    assert_eq!(err.status(), Status::InvalidState);
}

#[test]
fn test_finalized_after_success() {
    let engine = common::engine();
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 16]);
    let mut session = engine
        .cipher_init(
            CipherAlgorithm::AesGcm,
            CipherMode::Encrypt,
            Some(handle),
            Some(&aead(CipherAlgorithm::AesGcm, &[0u8; 12], b"")),
        )
        .unwrap();

    let mut output = [0u8; 4];
    let mut tag = [0u8; 16];
    session.process_last(b"once", &mut output, Some(&mut tag)).unwrap();

    let mut scratch = [0u8; 0];
    assert_eq!(
        session.process(b"again", &mut scratch).unwrap_err().status(),
        Status::InvalidState
    );
    assert_eq!(
        session
            .process_last(b"again", &mut output, Some(&mut tag))
            .unwrap_err()
            .status(),
        Status::InvalidState
    );
}

#[test]
fn test_aes_gcm_known_answer() {
    // GCM test case 2: zero key, zero IV, one zero block
    let engine = common::engine();
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &[0u8; 16]);
    let mut session = engine
        .cipher_init(
            CipherAlgorithm::AesGcm,
            CipherMode::Encrypt,
            Some(handle),
            Some(&aead(CipherAlgorithm::AesGcm, &[0u8; 12], b"")),
        )
        .unwrap();

    let mut output = [0u8; 16];
    let mut tag = [0u8; 16];
    session
        .process_last(&[0u8; 16], &mut output, Some(&mut tag))
        .unwrap();
    assert_eq!(hex::encode(output), "0388dace60b6a392f328c2b971b2fe78");
    assert_eq!(hex::encode(tag), "ab6e47d42cec13bdf53a67b21257bddf");
}
