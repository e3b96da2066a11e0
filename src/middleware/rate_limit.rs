use crate::cache::TieredCache;
use crate::errors::AppError;

/// Redis-backed fixed-window limiter for license-install attempts.
///
/// Installing a license is the one endpoint a caller without a valid
/// license can hammer with forged tokens, so attempts are counted per
/// client within the configured window. `max_attempts` of 0 disables the
/// limit.
pub async fn check_install_limit(
    client: &str,
    max_attempts: u64,
    window_secs: u64,
    cache: &TieredCache,
) -> Result<(), AppError> {
    if max_attempts == 0 {
        return Ok(());
    }

    let key = format!("rate:license:{}:{}", client, window_secs);
    let count = cache
        .increment(&key, window_secs)
        .await
        .map_err(AppError::Internal)?;

    if count > max_attempts {
        tracing::warn!(
            client = client,
            limit = max_attempts,
            count = count,
            "license install rate limit exceeded"
        );
        return Err(AppError::RateLimitExceeded);
    }
    Ok(())
}
