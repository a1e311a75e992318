//! One-time login challenges with a time-to-live.
//!
//! A challenge is a random nonce issued to an identity. It can be consumed
//! exactly once, and only before it expires. The cache is owned by whoever
//! constructs it and injected where needed; there is no global state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use rand::RngCore;

use custody_core::IdentityId;

use crate::error::{Result, StoreError};

/// Length of a challenge nonce.
pub const CHALLENGE_NONCE_LEN: usize = 32;

/// An issued challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: [u8; CHALLENGE_NONCE_LEN],
    pub expires_at: SystemTime,
}

impl Challenge {
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce)
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("nonce", &&self.nonce_hex()[..16])
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

struct Pending {
    identity_id: IdentityId,
    deadline: Instant,
}

/// TTL cache of outstanding challenges, keyed by nonce.
pub struct ChallengeCache {
    ttl: Duration,
    pending: Mutex<HashMap<[u8; CHALLENGE_NONCE_LEN], Pending>>,
}

impl ChallengeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh challenge for an identity.
    ///
    /// Expired challenges are dropped first, so challenges that are never
    /// consumed do not accumulate.
    pub fn issue(&self, identity_id: &IdentityId) -> Result<Challenge> {
        let mut nonce = [0u8; CHALLENGE_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let now = Instant::now();
        let mut pending = self.lock()?;
        pending.retain(|_, entry| now < entry.deadline);
        pending.insert(
            nonce,
            Pending {
                identity_id: identity_id.clone(),
                deadline: now + self.ttl,
            },
        );

        Ok(Challenge {
            nonce,
            expires_at: SystemTime::now() + self.ttl,
        })
    }

    /// Consume a challenge.
    ///
    /// Returns true only if the nonce was issued to this identity and has not
    /// expired. The nonce is removed either way, so a second call returns false.
    pub fn consume(&self, identity_id: &IdentityId, nonce: &[u8]) -> Result<bool> {
        let Ok(nonce) = <[u8; CHALLENGE_NONCE_LEN]>::try_from(nonce) else {
            return Ok(false);
        };

        let mut pending = self.lock()?;
        match pending.remove(&nonce) {
            Some(entry) => {
                Ok(&entry.identity_id == identity_id && Instant::now() < entry.deadline)
            }
            None => Ok(false),
        }
    }

    /// Drop expired challenges. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut pending = self.lock()?;
        let before = pending.len();
        pending.retain(|_, entry| now < entry.deadline);
        Ok(before - pending.len())
    }

    /// Number of outstanding challenges, expired or not.
    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<[u8; CHALLENGE_NONCE_LEN], Pending>>> {
        self.pending
            .lock()
            .map_err(|_| StoreError::Unavailable("challenge cache lock poisoned".into()))
    }
}

impl Default for ChallengeCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_once() {
        let cache = ChallengeCache::default();
        let alice = IdentityId::new("alice");

        let challenge = cache.issue(&alice).unwrap();
        assert!(cache.consume(&alice, &challenge.nonce).unwrap());
        assert!(!cache.consume(&alice, &challenge.nonce).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_wrong_identity_burns_nonce() {
        let cache = ChallengeCache::default();
        let challenge = cache.issue(&IdentityId::new("alice")).unwrap();

        assert!(!cache
            .consume(&IdentityId::new("mallory"), &challenge.nonce)
            .unwrap());
        assert!(!cache
            .consume(&IdentityId::new("alice"), &challenge.nonce)
            .unwrap());
    }

    #[test]
    fn test_expired_challenge_rejected() {
        let cache = ChallengeCache::new(Duration::ZERO);
        let alice = IdentityId::new("alice");

        let challenge = cache.issue(&alice).unwrap();
        assert!(!cache.consume(&alice, &challenge.nonce).unwrap());
    }

    #[test]
    fn test_purge_expired() {
        let cache = ChallengeCache::new(Duration::ZERO);
        cache.issue(&IdentityId::new("a")).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unconsumed_challenges_stay_bounded() {
        let cache = ChallengeCache::new(Duration::ZERO);
        let alice = IdentityId::new("alice");
        for _ in 0..10_000 {
            cache.issue(&alice).unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_issue_keeps_live_challenges() {
        let cache = ChallengeCache::default();
        let alice = IdentityId::new("alice");
        let first = cache.issue(&alice).unwrap();
        cache.issue(&alice).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.consume(&alice, &first.nonce).unwrap());
    }

    #[test]
    fn test_malformed_nonce() {
        let cache = ChallengeCache::default();
        assert!(!cache.consume(&IdentityId::new("alice"), b"short").unwrap());
    }

    #[test]
    fn test_nonces_are_unique() {
        let cache = ChallengeCache::default();
        let alice = IdentityId::new("alice");
        let a = cache.issue(&alice).unwrap();
        let b = cache.issue(&alice).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }
}
