//! Per-user session naming — maps a cloud identity to a deterministic
//! instance-name prefix and matches existing gateways against it.
//!
//! The convention: `kgate-<key>-<digits>` where `<key>` is the first 12 hex
//! characters of the SHA-1 digest of the identity string. There is no
//! persisted index; matching is always a live scan of the provider's
//! instance listing. Two identities hashing to the same key would share a
//! gateway — accepted, not a correctness violation.

use regex::Regex;
use sha1::{Digest, Sha1};

/// Length of the session key in hex characters.
pub const SESSION_KEY_LEN: usize = 12;

/// Leading component of every gateway instance name.
const NAME_STEM: &str = "kgate";

/// Derives the session key for an identity string: the first 12 lowercase
/// hex characters of its SHA-1 digest. Deterministic — same identity, same
/// key.
#[must_use]
pub fn session_key(identity: &str) -> String {
    let digest = Sha1::digest(identity.as_bytes());
    let mut key = String::with_capacity(SESSION_KEY_LEN);
    for byte in digest.iter().take(SESSION_KEY_LEN.div_ceil(2)) {
        key.push_str(&format!("{byte:02x}"));
    }
    key.truncate(SESSION_KEY_LEN);
    key
}

/// Instance-name prefix for an identity, e.g. `kgate-2bb80d537b1d`.
#[must_use]
pub fn instance_prefix(identity: &str) -> String {
    format!("{NAME_STEM}-{}", session_key(identity))
}

/// Regex matching instance names owned by `prefix`: `^<prefix>-[0-9]+$`.
///
/// # Panics
///
/// Panics if `prefix` contains regex metacharacters. Prefixes produced by
/// [`instance_prefix`] are hex-and-hyphen only and cannot panic.
#[must_use]
pub fn name_pattern(prefix: &str) -> Regex {
    #[allow(clippy::expect_used)]
    Regex::new(&format!("^{prefix}-[0-9]+$")).expect("valid instance name pattern")
}

/// Returns the first name in `names` that belongs to `prefix`, in listing
/// order. No recency ordering — the provider decides which row comes first.
#[must_use]
pub fn first_match<'a>(prefix: &str, names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let pattern = name_pattern(prefix);
    names
        .into_iter()
        .find(|name| pattern.is_match(name))
        .map(str::to_string)
}

/// Synthesizes a fresh instance name under `prefix` with a random digit
/// suffix, so the next `connect` for the same identity finds it by scan.
///
/// Entropy sources: nanosecond timestamp and two independent `RandomState`
/// hashes (no dedicated RNG dependency needed at this collision budget).
#[must_use]
pub fn generate_instance_name(prefix: &str) -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("{prefix}-{:05}", hasher.finish() % 100_000)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Same identity always yields the same key.
        #[test]
        fn prop_session_key_deterministic(identity in ".{0,64}") {
            prop_assert_eq!(session_key(&identity), session_key(&identity));
        }

        /// Keys are always 12 lowercase hex characters, whatever the input.
        #[test]
        fn prop_session_key_always_twelve_hex(identity in ".{0,64}") {
            let key = session_key(&identity);
            prop_assert_eq!(key.len(), SESSION_KEY_LEN);
            prop_assert!(key.chars().all(|c| "0123456789abcdef".contains(c)));
        }

        /// A synthesized name is always found again by a scan for its prefix.
        #[test]
        fn prop_generated_name_round_trips_through_scan(identity in "[a-z0-9@.]{1,40}") {
            let prefix = instance_prefix(&identity);
            let name = generate_instance_name(&prefix);
            prop_assert_eq!(first_match(&prefix, [name.as_str()]), Some(name));
        }

        /// Names under a different identity's prefix never match.
        #[test]
        fn prop_prefixes_partition_names(a in "[a-z]{1,20}", b in "[a-z]{1,20}") {
            prop_assume!(session_key(&a) != session_key(&b));
            let name = generate_instance_name(&instance_prefix(&a));
            prop_assert_eq!(first_match(&instance_prefix(&b), [name.as_str()]), None);
        }
    }
}
