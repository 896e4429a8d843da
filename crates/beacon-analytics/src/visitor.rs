//! Visitor identifiers and the legacy `__utma` session token.

use rand::Rng;
use md5::{Digest, Md5};

/// Marker prepended to hashed legacy visitor ids
pub const HASHED_VISITOR_PREFIX: &str = "0x";
const HASHED_VISITOR_HEX_LEN: usize = 16;

/// Mixing rounds allowed per character before the domain hash gives up
const MAX_ROUNDS_PER_CHAR: usize = 16;
const HASH_MASK: u64 = 0x0fff_ffff;
const GUARD_MASK: u64 = 0x0fe0_0000;

/// Pick the visitor id for a hit.
///
/// An existing cookie is always reused. Otherwise the measurement-protocol
/// format gets a random UUID, and the legacy format gets a short hash of the
/// device id and account (stable per device) or of the user agent and a
/// random UUID when no device id is known.
pub fn visitor_id(
    device_id: Option<&str>,
    account: &str,
    user_agent: &str,
    cookie: Option<&str>,
    random_on_miss: bool,
) -> String {
    if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
        return cookie.to_string();
    }
    if random_on_miss {
        return beacon_core::generate_id().to_string();
    }

    let message = match device_id.filter(|d| !d.is_empty()) {
        Some(device_id) => format!("{}{}", device_id, account),
        None => format!("{}{}", user_agent, beacon_core::generate_id()),
    };
    let digest = hex::encode(Md5::digest(message.as_bytes()));
    format!(
        "{}{}",
        HASHED_VISITOR_PREFIX,
        &digest[..HASHED_VISITOR_HEX_LEN]
    )
}

/// Fold a domain name into the legacy collector's 28-bit domain hash.
///
/// Characters are consumed from the end. Each one is mixed in until the
/// guard bits trip, at which point the high bits are folded back in and the
/// next character is taken. Returns `None` when a character never trips
/// the guard (a NUL byte, for instance).
pub fn domain_hash(domain: &str) -> Option<u64> {
    let mut hash: u64 = 0;
    for c in domain.chars().rev() {
        let c = c as u64;
        let mut tripped = false;
        for _ in 0..MAX_ROUNDS_PER_CHAR {
            hash = ((hash << 6) & HASH_MASK) + c + (c << 14);
            let guard = hash & GUARD_MASK;
            if guard != 0 {
                hash ^= guard >> 21;
                tripped = true;
                break;
            }
        }
        if !tripped {
            return None;
        }
    }
    Some(hash)
}

/// Build the `__utma` token embedded in legacy `utmcc`.
///
/// Empty for an empty domain or one that never trips the hash guard.
pub fn gen_utma(domain: &str) -> String {
    let random = rand::thread_rng().gen_range(1_147_483_647u64..=2_147_483_647);
    let timestamp = chrono::Utc::now().timestamp();
    gen_utma_with(domain, random, timestamp)
}

pub fn gen_utma_with(domain: &str, random: u64, timestamp: i64) -> String {
    if domain.is_empty() {
        return String::new();
    }
    match domain_hash(domain) {
        Some(hash) => format!(
            "{}.{}.{}.{}.{}.{}",
            hash, random, timestamp, timestamp, timestamp, 1
        ),
        None => {
            tracing::debug!("Domain hash did not converge for {:?}", domain);
            String::new()
        }
    }
}
