// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Rights Evaluation
//!
//! A [`Rights`] record is bound to every key at creation and never changes
//! afterwards. A usage is permitted only when its flag is present in the
//! record AND the current time lies in `[not_before, not_on_or_after)`.
//!
//! [`authorize`] is a pure function of the record, the requested usage and the
//! supplied time. Caller scoping (`allowed_callers`) is a separate check,
//! [`Rights::allows_caller`], so that `authorize` depends on nothing else.

pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Wildcard caller id admitting every caller
pub const ANY_CALLER: Uuid = Uuid::from_u128(u128::MAX);

/// A single permission that a rights record can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Usage {
    KeyExchange,
    Derive,
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    Wrap,
    Unwrap,
    Export,
}

impl Usage {
    /// Every defined usage
    pub const ALL: [Usage; 9] = [
        Usage::KeyExchange,
        Usage::Derive,
        Usage::Encrypt,
        Usage::Decrypt,
        Usage::Sign,
        Usage::Verify,
        Usage::Wrap,
        Usage::Unwrap,
        Usage::Export,
    ];
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Usage::KeyExchange => "key_exchange",
            Usage::Derive => "derive",
            Usage::Encrypt => "encrypt",
            Usage::Decrypt => "decrypt",
            Usage::Sign => "sign",
            Usage::Verify => "verify",
            Usage::Wrap => "wrap",
            Usage::Unwrap => "unwrap",
            Usage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Set of granted usages.
///
/// Backed by a `BTreeSet` so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFlags(BTreeSet<Usage>);

impl UsageFlags {
    /// No usages granted
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Every usage granted
    pub fn all() -> Self {
        Self(Usage::ALL.into_iter().collect())
    }

    pub fn contains(&self, usage: Usage) -> bool {
        self.0.contains(&usage)
    }

    pub fn insert(&mut self, usage: Usage) {
        self.0.insert(usage);
    }

    pub fn remove(&mut self, usage: Usage) {
        self.0.remove(&usage);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Usage> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Usage> for UsageFlags {
    fn from_iter<I: IntoIterator<Item = Usage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Usage; N]> for UsageFlags {
    fn from(usages: [Usage; N]) -> Self {
        usages.into_iter().collect()
    }
}

/// Authorization record bound to a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rights {
    /// Free-form identifier chosen by the key's owner
    pub id: String,
    /// First instant at which the key may be used
    pub not_before: DateTime<Utc>,
    /// First instant at which the key may no longer be used
    pub not_on_or_after: DateTime<Utc>,
    /// Granted usages
    pub usage: UsageFlags,
    /// Callers admitted to use the key; [`ANY_CALLER`] admits everyone
    pub allowed_callers: Vec<Uuid>,
}

impl Rights {
    /// Unrestricted rights: unbounded window, every usage, any caller
    pub fn allow_all() -> Self {
        Self {
            id: String::new(),
            not_before: DateTime::<Utc>::MIN_UTC,
            not_on_or_after: DateTime::<Utc>::MAX_UTC,
            usage: UsageFlags::all(),
            allowed_callers: vec![ANY_CALLER],
        }
    }

    /// Same record with `usage` removed
    pub fn without_usage(mut self, usage: Usage) -> Self {
        self.usage.remove(usage);
        self
    }

    /// Same record restricted to exactly `usages`
    pub fn with_usages(mut self, usages: impl Into<UsageFlags>) -> Self {
        self.usage = usages.into();
        self
    }

    /// Same record with a new validity window
    pub fn valid_between(mut self, not_before: DateTime<Utc>, not_on_or_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_on_or_after = not_on_or_after;
        self
    }

    /// Same record restricted to the given callers
    pub fn with_callers(mut self, callers: Vec<Uuid>) -> Self {
        self.allowed_callers = callers;
        self
    }

    /// Whether `now` lies inside `[not_before, not_on_or_after)`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.not_before && now < self.not_on_or_after
    }

    /// Whether `caller` is admitted by the caller scope
    pub fn allows_caller(&self, caller: &Uuid) -> bool {
        self.allowed_callers
            .iter()
            .any(|allowed| *allowed == ANY_CALLER || allowed == caller)
    }
}

/// Reason a rights record rejected a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("key not valid before {not_before}")]
    NotYetValid { not_before: DateTime<Utc> },

    #[error("key expired at {not_on_or_after}")]
    Expired { not_on_or_after: DateTime<Utc> },

    #[error("usage '{0}' not permitted by key rights")]
    UsageNotPermitted(Usage),

    #[error("caller {0} not admitted by key rights")]
    CallerNotAllowed(Uuid),
}

/// Decide whether `rights` permit `requested` at `now`
pub fn authorize(
    rights: &Rights,
    requested: Usage,
    now: DateTime<Utc>,
) -> Result<(), AuthorizationError> {
    if now < rights.not_before {
        return Err(AuthorizationError::NotYetValid {
            not_before: rights.not_before,
        });
    }

    if now >= rights.not_on_or_after {
        return Err(AuthorizationError::Expired {
            not_on_or_after: rights.not_on_or_after,
        });
    }

    if !rights.usage.contains(requested) {
        return Err(AuthorizationError::UsageNotPermitted(requested));
    }

    Ok(())
}
