// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Handle lifecycle: release, aliasing, capacity, teardown

use crate::common;
use chrono::Utc;
use keyguard_engine::cipher::AeadParameters;
use keyguard_engine::rights::Rights;
use keyguard_engine::{
    CipherAlgorithm, CipherMode, CipherParameters, EngineConfig, Status,
};

#[test]
fn test_release_idempotent_and_isolated() {
    let engine = common::engine();
    let a = common::import_symmetric(&engine, &Rights::allow_all(), &[1u8; 16]);
    let b = common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 16]);

    engine.key_release(a).unwrap();
    engine.key_release(a).unwrap();

    assert_eq!(engine.key_count(), 1);
    assert_eq!(engine.key_header(Some(a)).unwrap_err().status(), Status::BadParameter);
    assert!(engine.key_header(Some(b)).is_ok());
}

#[test]
fn test_released_handle_does_not_alias_new_key() {
    let engine = common::engine();
    let old = common::import_symmetric(&engine, &Rights::allow_all(), &[1u8; 16]);
    engine.key_release(old).unwrap();

    let new = common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 32]);
    assert_ne!(old, new);
    assert_eq!(engine.key_header(Some(old)).unwrap_err().status(), Status::BadParameter);
    assert_eq!(engine.key_header(Some(new)).unwrap().size, 32);
}

#[test]
fn test_handles_do_not_cross_engines() {
    let first = common::engine();
    let second = common::engine();
    let handle = common::import_symmetric(&first, &Rights::allow_all(), &[1u8; 16]);

    assert_eq!(second.key_header(Some(handle)).unwrap_err().status(), Status::BadParameter);
    assert_eq!(second.key_release(handle).unwrap_err().status(), Status::BadParameter);
    assert!(first.key_header(Some(handle)).is_ok());
}

#[test]
fn test_capacity_is_a_distinct_error() {
    let config = EngineConfig {
        max_keys: 2,
        ..EngineConfig::default()
    };
    let (engine, _clock) = common::engine_with_config_at(config, Utc::now());
    common::import_symmetric(&engine, &Rights::allow_all(), &[1u8; 16]);
    common::import_symmetric(&engine, &Rights::allow_all(), &[2u8; 16]);

    let err = engine
        .key_import(Some(&Rights::allow_all()), keyguard_engine::KeyType::Symmetric, None, &[3u8; 16])
        .unwrap_err();
    assert_eq!(err.status(), Status::ResourceExhausted);
}

#[test]
fn test_session_survives_key_release() {
    let engine = common::engine();
    let key = [9u8; 32];
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &key);
    let parameters = CipherParameters::AesGcm(AeadParameters {
        iv: Some(vec![4u8; 12]),
        aad: Some(Vec::new()),
    });
    let mut session = engine
        .cipher_init(CipherAlgorithm::AesGcm, CipherMode::Encrypt, Some(handle), Some(&parameters))
        .unwrap();

    engine.key_release(handle).unwrap();

    let mut output = [0u8; 4];
    let mut tag = [0u8; 16];
    assert_eq!(session.process_last(b"data", &mut output, Some(&mut tag)).unwrap(), 4);

    let (expected, expected_tag) = common::aes_gcm_wrap(&key, &[4u8; 12], b"", b"data");
    assert_eq!(output.to_vec(), expected);
    assert_eq!(tag.to_vec(), expected_tag);
}

#[test]
fn test_shutdown_and_reuse() {
    let engine = common::engine();
    let handle = common::import_symmetric(&engine, &Rights::allow_all(), &[1u8; 16]);
    common::import_sample_rsa(&engine, &Rights::allow_all());

    assert_eq!(engine.shutdown(), 2);
    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.key_header(Some(handle)).unwrap_err().status(), Status::BadParameter);

    // Still usable after teardown
    common::import_symmetric(&engine, &Rights::allow_all(), &[1u8; 16]);
    assert_eq!(engine.key_count(), 1);
}
