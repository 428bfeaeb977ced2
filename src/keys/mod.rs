// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Registry
//!
//! Keys live inside a [`KeyRegistry`] and are only ever referred to through
//! opaque [`KeyHandle`] values. Raw material never leaves the crate: callers
//! see a [`KeyHeader`] (type, size, curve, rights) and, for asymmetric keys,
//! the public half.
//!
//! ## Accepted material
//!
//! | Key type | Encoding | Accepted sizes |
//! |---|---|---|
//! | Symmetric | raw bytes | 16..=512 bytes |
//! | RSA | PKCS#8 DER private key | configured modulus sizes (1024..4096 bits) |
//! | EC | raw private scalar | 32 bytes (P-256, Ed25519) |
//!
//! Symmetric keys of any accepted length can be registered; whether a given
//! length suits an algorithm (e.g. AES) is decided when the key is used.

pub mod material;
pub mod registry;

pub use registry::{KeyEntry, KeyRegistry};

use crate::rights::Rights;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted symmetric key
pub const SYM_MIN_KEY_SIZE: usize = 16;
/// Largest accepted symmetric key
pub const SYM_MAX_KEY_SIZE: usize = 512;
/// AES-128 key length
pub const SYM_128_KEY_SIZE: usize = 16;
/// AES-256 key length
pub const SYM_256_KEY_SIZE: usize = 32;

/// Family of a registered key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Symmetric,
    Rsa,
    Ec,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Symmetric => f.write_str("symmetric"),
            KeyType::Rsa => f.write_str("rsa"),
            KeyType::Ec => f.write_str("ec"),
        }
    }
}

/// Elliptic curves accepted for EC keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    NistP256,
    Ed25519,
}

impl EcCurve {
    /// Private scalar length in bytes
    pub fn key_size(&self) -> usize {
        match self {
            EcCurve::NistP256 => 32,
            EcCurve::Ed25519 => 32,
        }
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcCurve::NistP256 => f.write_str("nist-p256"),
            EcCurve::Ed25519 => f.write_str("ed25519"),
        }
    }
}

/// Type-specific constraints supplied alongside key material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTypeParameters {
    Ec { curve: EcCurve },
}

/// Opaque reference to a registered key.
///
/// A handle names one slot of one registry at one generation. Releasing the
/// key bumps the slot generation, so an old handle never resolves to a key
/// created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    registry: u32,
    index: u32,
    generation: u32,
}

impl KeyHandle {
    pub(crate) fn new(registry: u32, index: u32, generation: u32) -> Self {
        Self {
            registry,
            index,
            generation,
        }
    }

    pub(crate) fn registry(&self) -> u32 {
        self.registry
    }

    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:{}:{}:{}", self.registry, self.index, self.generation)
    }
}

/// Public metadata of a registered key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHeader {
    pub key_type: KeyType,
    /// Key length in bytes (RSA: modulus length)
    pub size: usize,
    pub curve: Option<EcCurve>,
    pub rights: Rights,
}
