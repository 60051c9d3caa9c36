//! Session identity and inactivity-based rollover.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A session expires after this much inactivity.
pub const SESSION_TIMEOUT: TimeDelta = TimeDelta::hours(1);

/// Multiplier that shifts the epoch seconds above the random suffix.
const SUFFIX_SPAN: u64 = 100_000_000;

/// Largest random suffix (inclusive).
const SUFFIX_MAX: u64 = SUFFIX_SPAN - 1;

/// Identifier of a session.
///
/// Encodes `epoch_seconds * 10^8 + suffix` where `suffix` is uniform in
/// `[0, 99_999_999]`. The high digits order ids coarsely by creation time;
/// the low digits keep ids minted in the same second apart. Two ids from the
/// same second collide with probability 1 in 10^8.
///
/// Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(u64);

impl SessionId {
    /// Mints a new id for the given instant.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = rand::thread_rng().gen_range(0..=SUFFIX_MAX);
        Self::from_parts(now, suffix)
    }

    fn from_parts(now: DateTime<Utc>, suffix: u64) -> Self {
        let seconds = u64::try_from(now.timestamp()).unwrap_or(0);
        Self(seconds.saturating_mul(SUFFIX_SPAN).saturating_add(suffix))
    }

    /// Wraps a raw id value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Epoch seconds the id was minted in.
    #[must_use]
    pub const fn epoch_seconds(&self) -> u64 {
        self.0 / SUFFIX_SPAN
    }

    /// The random low-order part of the id.
    #[must_use]
    pub const fn suffix(&self) -> u64 {
        self.0 % SUFFIX_SPAN
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

/// Tracks the current session and when it was last used.
///
/// Not synchronized; the client keeps it behind a mutex so that a touch and
/// its rollover decision happen as one step.
#[derive(Debug, Clone)]
pub struct SessionManager {
    current: SessionId,
    last_activity: DateTime<Utc>,
}

impl SessionManager {
    /// Starts a fresh session at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current: SessionId::generate(now),
            last_activity: now,
        }
    }

    /// Records activity at `now` and returns the session it belongs to.
    ///
    /// Mints a new session when more than [`SESSION_TIMEOUT`] has passed
    /// since the last activity. The activity timestamp is refreshed either way.
    pub fn touch(&mut self, now: DateTime<Utc>) -> SessionId {
        if now.signed_duration_since(self.last_activity) > SESSION_TIMEOUT {
            let previous = self.current;
            self.current = SessionId::generate(now);
            tracing::debug!(
                previous = %previous,
                current = %self.current,
                idle_secs = now.signed_duration_since(self.last_activity).num_seconds(),
                "session expired, starting new session"
            );
        }
        self.last_activity = now;
        self.current
    }

    /// The current session, without recording activity.
    pub const fn current(&self) -> SessionId {
        self.current
    }

    /// When the session last saw activity.
    pub const fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }
}
