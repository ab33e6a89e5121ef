use chrono::{Duration, NaiveDateTime};
use tracing::debug;

/// Key-derivation context string; changing it invalidates every issued token.
const KEY_CONTEXT: &str = "lotbot 2026-08 session token v1";

/// Issued tokens are valid for one hour from issuance.
const SESSION_TTL_HOURS: i64 = 1;

/// Keyed-hash signer for session tokens.
///
/// Tokens are stateless: `{user_id}.{exp_unix}.{sig_hex}` where the signature
/// is a blake3 keyed hash over `"{user_id}\n{exp_unix}"`. There is no
/// server-side session table and no revocation; validity is purely
/// signature + expiry.
pub struct SessionKey {
    key: [u8; 32],
}

impl SessionKey {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        }
    }

    fn sign(&self, user_id: &str, exp: i64) -> blake3::Hash {
        let payload = format!("{}\n{}", user_id, exp);
        blake3::keyed_hash(&self.key, payload.as_bytes())
    }

    /// Issue a token for `user_id` expiring one hour after `now`. Repeated
    /// calls issue independent tokens; nothing is recorded server-side.
    pub fn create_session(&self, user_id: &str, now: NaiveDateTime) -> String {
        let exp = (now + Duration::hours(SESSION_TTL_HOURS)).and_utc().timestamp();
        let sig = self.sign(user_id, exp);
        debug!(user_id, exp, "session token issued");
        format!("{}.{}.{}", user_id, exp, sig.to_hex())
    }

    /// Check signature and expiry. Malformed, mis-signed, or expired tokens
    /// all yield false; this never errors to the caller.
    pub fn verify_session(&self, token: &str, now: NaiveDateTime) -> bool {
        // user_id may itself contain dots, so split from the right.
        let mut parts = token.rsplitn(3, '.');
        let (Some(sig_hex), Some(exp_str), Some(user_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        let Ok(exp) = exp_str.parse::<i64>() else {
            return false;
        };
        let Ok(sig) = blake3::Hash::from_hex(sig_hex) else {
            return false;
        };

        // blake3::Hash equality is constant-time.
        if self.sign(user_id, exp) != sig {
            return false;
        }

        now.and_utc().timestamp() < exp
    }
}
