//! HMAC signatures for time-limited local storage URLs.
//!
//! Signature = hex(HMAC-SHA256(secret, "{key}\n{expires_at}")), where `expires_at` is a
//! Unix timestamp in seconds.

use crate::traits::{StorageError, StorageResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, storage_key: &str, expires_at: u64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
        mac.update(storage_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        Ok(mac)
    }

    /// Expiry timestamp for a URL signed now and valid for `expires_in`.
    pub fn expiry_from_now(expires_in: Duration) -> u64 {
        unix_now().saturating_add(expires_in.as_secs())
    }

    pub fn sign(&self, storage_key: &str, expires_at: u64) -> StorageResult<String> {
        let tag = self.mac(storage_key, expires_at)?.finalize().into_bytes();
        Ok(hex::encode(tag))
    }

    /// Check a signature and its expiry.
    pub fn verify(&self, storage_key: &str, expires_at: u64, signature: &str) -> StorageResult<()> {
        let tag = hex::decode(signature)
            .map_err(|_| StorageError::SigningFailed("Malformed signature".to_string()))?;
        self.mac(storage_key, expires_at)?
            .verify_slice(&tag)
            .map_err(|_| StorageError::SigningFailed("Signature mismatch".to_string()))?;

        if unix_now() > expires_at {
            return Err(StorageError::SigningFailed(
                "Signed URL has expired".to_string(),
            ));
        }
        Ok(())
    }
}
