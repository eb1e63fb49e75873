use std::time::{Duration, Instant};

/// Upper bound on a TTL, ~100 years. Keeps `Instant` arithmetic from overflowing.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// A stored record: who it belongs to, the opaque payload, and when it stops being visible.
///
/// Entries are immutable once built. Replacing a key always means inserting a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    username: String,
    userdata: String,
    expires_at: Instant,
}

impl Entry {
    /// Creates an entry that expires `ttl_seconds` from now.
    ///
    /// TTLs above [`MAX_TTL_SECONDS`] are capped. A TTL of zero or below yields an entry
    /// that is already expired (or expires this very instant).
    pub fn new(username: impl Into<String>, userdata: impl Into<String>, ttl_seconds: i64) -> Self {
        let now = Instant::now();
        let expires_at = if ttl_seconds > 0 {
            now + Duration::from_secs(ttl_seconds.unsigned_abs().min(MAX_TTL_SECONDS))
        } else {
            now.checked_sub(Duration::from_secs(ttl_seconds.unsigned_abs()))
                .unwrap_or(now)
        };

        Self::with_expiry(username, userdata, expires_at)
    }

    /// Creates an entry with an explicit expiration instant
    pub fn with_expiry(
        username: impl Into<String>,
        userdata: impl Into<String>,
        expires_at: Instant,
    ) -> Self {
        Self {
            username: username.into(),
            userdata: userdata.into(),
            expires_at,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn userdata(&self) -> &str {
        &self.userdata
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Checks expiration against a caller-supplied instant.
    ///
    /// This is the one predicate both the read path and the sweep rely on.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    /// Checks if this entry has expired as of now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Exact, case-sensitive match on both fields
    pub fn matches(&self, username: &str, userdata: &str) -> bool {
        self.username == username && self.userdata == userdata
    }

    /// Time left until expiry, zero once expired
    pub fn remaining_ttl(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}
