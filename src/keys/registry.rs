// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation-tagged key arena
//!
//! Slots are allocated under a write lock and published as `Arc<KeyEntry>`.
//! Entries are immutable once published, so readers clone the `Arc` under a
//! short read lock and work on it without holding any lock.

use super::material::KeyMaterial;
use super::{EcCurve, KeyHandle, KeyHeader, KeyType, KeyTypeParameters};
use crate::error::{EngineError, EngineResult};
use crate::rights::Rights;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

/// A published registry entry: rights and metadata plus the secret material
#[derive(Debug)]
pub struct KeyEntry {
    rights: Rights,
    material: KeyMaterial,
}

impl KeyEntry {
    pub fn key_type(&self) -> KeyType {
        self.material.key_type()
    }

    /// Key length in bytes (RSA: modulus length)
    pub fn size(&self) -> usize {
        self.material.size()
    }

    pub fn curve(&self) -> Option<EcCurve> {
        self.material.curve()
    }

    pub fn rights(&self) -> &Rights {
        &self.rights
    }

    pub fn header(&self) -> KeyHeader {
        KeyHeader {
            key_type: self.key_type(),
            size: self.size(),
            curve: self.curve(),
            rights: self.rights.clone(),
        }
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.material
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Arc<KeyEntry>>,
}

#[derive(Debug, Default)]
struct Slots {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

/// Thread-safe registry mapping opaque handles to keys
///
/// # Example
///
/// ```
/// use keyguard_engine::keys::{KeyRegistry, KeyType};
/// use keyguard_engine::rights::Rights;
///
/// let registry = KeyRegistry::new(16, vec![2048]);
/// let handle = registry
///     .create(&[0u8; 16], KeyType::Symmetric, Some(&Rights::allow_all()), None)
///     .unwrap();
/// assert_eq!(registry.lookup(Some(handle)).unwrap().size(), 16);
/// registry.release(handle).unwrap();
/// assert!(registry.lookup(Some(handle)).is_err());
/// ```
#[derive(Debug)]
pub struct KeyRegistry {
    id: u32,
    capacity: usize,
    rsa_modulus_bits: Vec<usize>,
    inner: RwLock<Slots>,
}

impl KeyRegistry {
    /// Create an empty registry holding at most `capacity` live keys
    pub fn new(capacity: usize, rsa_modulus_bits: Vec<usize>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            rsa_modulus_bits,
            inner: RwLock::new(Slots::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Validate `material` and register it under `rights`
    ///
    /// # Errors
    ///
    /// - `NullParameter` if `rights` is absent or `material` empty
    /// - `InvalidParameter` if the material does not fit `key_type`/`constraints`
    /// - `ResourceExhausted` if the registry is full
    pub fn create(
        &self,
        material: &[u8],
        key_type: KeyType,
        rights: Option<&Rights>,
        constraints: Option<KeyTypeParameters>,
    ) -> EngineResult<KeyHandle> {
        let rights = rights.ok_or(EngineError::NullParameter("rights"))?;
        let material =
            KeyMaterial::parse(key_type, constraints.as_ref(), material, &self.rsa_modulus_bits)?;

        let entry = Arc::new(KeyEntry {
            rights: rights.clone(),
            material,
        });

        let mut slots = self.write();
        if slots.live >= self.capacity {
            tracing::warn!(
                "Key registry {} full ({} live keys), rejecting {} key",
                self.id,
                slots.live,
                key_type
            );
            return Err(EngineError::ResourceExhausted {
                capacity: self.capacity,
            });
        }

        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(slots.slots.len()).map_err(|_| {
                    EngineError::ResourceExhausted {
                        capacity: self.capacity,
                    }
                })?;
                slots.slots.push(Slot::default());
                index
            }
        };

        let slot = &mut slots.slots[index as usize];
        slot.entry = Some(entry);
        let handle = KeyHandle::new(self.id, index, slot.generation);
        slots.live += 1;

        tracing::debug!(
            "🔑 Key registered: {} ({}, live keys: {})",
            handle,
            key_type,
            slots.live
        );
        Ok(handle)
    }

    /// Resolve a handle to its entry
    ///
    /// # Errors
    ///
    /// - `NullParameter` if `handle` is absent
    /// - `BadParameter` if the handle is unknown, released, or from another registry
    pub fn lookup(&self, handle: Option<KeyHandle>) -> EngineResult<Arc<KeyEntry>> {
        let handle = handle.ok_or(EngineError::NullParameter("key handle"))?;
        if handle.registry() != self.id {
            return Err(EngineError::BadParameter(format!(
                "{} does not belong to this engine",
                handle
            )));
        }

        let slots = self.read();
        slots
            .slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.clone())
            .ok_or_else(|| EngineError::BadParameter(format!("unknown key handle {}", handle)))
    }

    /// Public metadata for a handle
    pub fn header(&self, handle: Option<KeyHandle>) -> EngineResult<KeyHeader> {
        Ok(self.lookup(handle)?.header())
    }

    /// Release a key. Releasing an already-released handle is a no-op.
    ///
    /// # Errors
    ///
    /// - `BadParameter` if the handle was minted by another registry
    pub fn release(&self, handle: KeyHandle) -> EngineResult<()> {
        if handle.registry() != self.id {
            return Err(EngineError::BadParameter(format!(
                "{} does not belong to this engine",
                handle
            )));
        }

        let mut slots = self.write();
        let index = handle.index();
        let reusable = match slots.slots.get_mut(index as usize) {
            Some(slot) if slot.generation == handle.generation() && slot.entry.is_some() => {
                slot.entry = None;
                // A slot whose generation cannot advance is retired for good
                if let Some(next) = slot.generation.checked_add(1) {
                    slot.generation = next;
                    true
                } else {
                    false
                }
            }
            _ => {
                tracing::debug!("Release of inactive handle {} ignored", handle);
                return Ok(());
            }
        };

        if reusable {
            slots.free.push(index);
        }
        slots.live -= 1;
        tracing::debug!("🗑️  Key released: {} (remaining: {})", handle, slots.live);
        Ok(())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.read().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Release every key, returning how many were live
    pub fn clear(&self) -> usize {
        let mut slots = self.write();
        let count = slots.live;
        let mut freed = Vec::new();
        for (index, slot) in slots.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                if let Some(next) = slot.generation.checked_add(1) {
                    slot.generation = next;
                    freed.push(index as u32);
                }
            }
        }
        slots.free.extend(freed);
        slots.live = 0;
        tracing::info!("🗑️  Cleared key registry {} (count: {})", self.id, count);
        count
    }
}
