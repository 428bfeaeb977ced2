// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key rights evaluation, opaque key registry, cipher sessions and key unwrap.
//!
//! Modules, leaf first:
//!
//! - [`rights`]: usage flags, validity windows and the `authorize` check
//! - [`keys`]: the generation-tagged key registry behind opaque handles
//! - [`provider`]: the primitive crypto operations the engine delegates
//! - [`cipher`]: algorithm parameters and the cipher session state machine
//! - [`unwrap`]: authenticated key unwrap into a new registry entry
//! - [`engine`]: the context object tying them together

pub mod cipher;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod provider;
pub mod rights;
pub mod unwrap;

pub use cipher::{CipherAlgorithm, CipherMode, CipherParameters, CipherSession, SessionState};
pub use config::EngineConfig;
pub use engine::{Engine, KeyGenerateParameters};
pub use error::{EngineError, EngineResult, Status};
pub use keys::{EcCurve, KeyHandle, KeyHeader, KeyType, KeyTypeParameters};
pub use provider::{CryptoProvider, DigestAlgorithm, SoftwareProvider};
pub use rights::{Rights, Usage, UsageFlags};
pub use unwrap::{UnwrapParameters, UnwrapRequest};
