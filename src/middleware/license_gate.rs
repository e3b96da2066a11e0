//! Access gating on the installed license.
//!
//! The verdict is cached with a short TTL so board traffic does not pay for
//! a signature verification per request; the cache is invalidated whenever
//! the license row is replaced. Everything here is side-effect free apart
//! from the cache writes.

use crate::cache::TieredCache;
use crate::errors::AppError;
use crate::license::{today, LicenseVerifier};
use crate::models::license::Verdict;
use crate::store::postgres::PgStore;

/// Cache key for the current license verdict.
pub const VERDICT_CACHE_KEY: &str = "license:verdict";

/// Returns the current license verdict, from cache when fresh.
///
/// A cached `valid` verdict whose expiry date has since rolled past is
/// treated as stale and re-verified, so a license cannot outlive its expiry
/// by more than the cache TTL within one day boundary.
pub async fn current_verdict(
    db: &PgStore,
    cache: &TieredCache,
    verifier: &LicenseVerifier,
    ttl_secs: u64,
) -> Result<Verdict, AppError> {
    if let Some(cached) = cache.get::<Verdict>(VERDICT_CACHE_KEY).await {
        let rolled_past_expiry = cached.valid
            && cached
                .expiry
                .as_deref()
                .map(|e| e < today().as_str())
                .unwrap_or(false);
        if !rolled_past_expiry {
            return Ok(cached);
        }
        if let Err(e) = cache.invalidate(VERDICT_CACHE_KEY).await {
            tracing::warn!("failed to invalidate stale license verdict: {}", e);
        }
    }

    let Some(token) = db.get_license().await? else {
        return Err(AppError::LicenseMissing);
    };

    let verdict = verifier.verify(&token);
    if let Err(e) = cache.set(VERDICT_CACHE_KEY, &verdict, ttl_secs).await {
        tracing::warn!("failed to cache license verdict: {}", e);
    }
    Ok(verdict)
}

/// Gate check: passes only a currently-valid license through.
pub fn require_valid(verdict: &Verdict) -> Result<(), AppError> {
    if verdict.valid {
        Ok(())
    } else {
        Err(AppError::LicenseRejected(
            verdict
                .error
                .clone()
                .unwrap_or_else(|| "invalid license".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_valid_passes_a_valid_verdict() {
        let verdict = Verdict {
            valid: true,
            expiry: Some("2030-01-01".to_string()),
            customer: Some("Acme".to_string()),
            error: None,
        };
        assert!(require_valid(&verdict).is_ok());
    }

    #[test]
    fn require_valid_surfaces_the_verifier_error() {
        let verdict = Verdict::rejected("License Expired");
        match require_valid(&verdict) {
            Err(AppError::LicenseRejected(msg)) => assert_eq!(msg, "License Expired"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
