// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Auth tokens for the notary signing service.

The notary service authenticates requests with a token derived from a shared
secret. The secret itself is never transmitted. Instead, a 16 byte key is
derived from it with PBKDF2-HMAC-SHA1 and that key is used to HMAC-SHA1 the
current local time. The token is the hex digest followed directly by the
timestamp string that was digested, which lets the service recompute the
digest and judge freshness.

The PBKDF2 salt is the byte-reversed password. This is weak, but it is what
the service expects, so it must not change.
*/

use {
    ring::{hmac, pbkdf2},
    std::num::NonZeroU32,
};

/// Number of PBKDF2 rounds used to derive the HMAC key.
pub const PBKDF2_ITERATIONS: u32 = 1000;

/// Length in bytes of the derived HMAC key.
pub const DERIVED_KEY_LENGTH: usize = 16;

/// Derive the HMAC key for a shared secret.
pub fn derive_key(password: &str) -> [u8; DERIVED_KEY_LENGTH] {
    let salt = password.bytes().rev().collect::<Vec<_>>();

    let mut key = [0u8; DERIVED_KEY_LENGTH];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA1,
        NonZeroU32::new(PBKDF2_ITERATIONS).expect("iteration count is non-zero"),
        &salt,
        password.as_bytes(),
        &mut key,
    );

    key
}

/// Render the current local time the way it is embedded in tokens.
pub fn current_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Issues auth tokens for a shared secret.
///
/// The key is derived once per instance. Every call to [Self::new_token()]
/// digests a fresh timestamp, so tokens should not be cached or reused.
pub struct AuthTokenGenerator {
    key: hmac::Key,
}

impl AuthTokenGenerator {
    /// Construct an instance from the shared secret.
    pub fn new(password: &str) -> Self {
        let derived = derive_key(password);

        Self {
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, &derived),
        }
    }

    /// Compute the token for an explicit timestamp string.
    pub fn token_for_timestamp(&self, timestamp: &str) -> String {
        let tag = hmac::sign(&self.key, timestamp.as_bytes());

        format!("{}{}", hex::encode(tag.as_ref()), timestamp)
    }

    /// Mint a token for the current time.
    pub fn new_token(&self) -> String {
        self.token_for_timestamp(&current_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "correct horse battery staple";
    const TIMESTAMP: &str = "2022-06-14 09:30:00.000000";

    #[test]
    fn derive_key_uses_reversed_salt() {
        assert_eq!(
            hex::encode(derive_key(PASSWORD)),
            "02bc190e6fece6f69cc60716595b10c5"
        );
    }

    #[test]
    fn token_known_value() {
        let generator = AuthTokenGenerator::new(PASSWORD);

        assert_eq!(
            generator.token_for_timestamp(TIMESTAMP),
            "b68c2d70589a90626882058e548c797d53484fb82022-06-14 09:30:00.000000"
        );
    }

    #[test]
    fn token_is_deterministic() {
        let a = AuthTokenGenerator::new(PASSWORD).token_for_timestamp(TIMESTAMP);
        let b = AuthTokenGenerator::new(PASSWORD).token_for_timestamp(TIMESTAMP);

        assert_eq!(a, b);
    }

    #[test]
    fn token_layout() {
        let token = AuthTokenGenerator::new("hunter2").new_token();

        let (digest, timestamp) = token.split_at(40);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert!(
            chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%.f").is_ok(),
            "{} is a local timestamp",
            timestamp
        );
    }

    #[test]
    fn distinct_timestamps_distinct_tokens() {
        let generator = AuthTokenGenerator::new(PASSWORD);

        let first = generator.token_for_timestamp("2022-06-14 09:30:00.000000");
        let second = generator.token_for_timestamp("2022-06-14 09:30:00.000001");

        assert_ne!(first, second);
        assert_eq!(
            second,
            "eb18486ca6ab19c30608b493b6c28b679553c3452022-06-14 09:30:00.000001"
        );
    }

    #[test]
    fn distinct_passwords_distinct_tokens() {
        let a = AuthTokenGenerator::new("one").token_for_timestamp(TIMESTAMP);
        let b = AuthTokenGenerator::new("two").token_for_timestamp(TIMESTAMP);

        assert_ne!(a, b);
        assert!(a.ends_with(TIMESTAMP));
        assert!(b.ends_with(TIMESTAMP));
    }
}
