//! Timeout enforcement.
//!
//! Every call to the remote service runs under a deadline. A call that
//! misses it is reported as [`TransportError::Timeout`], which the
//! classifier treats as transient.

use std::future::Future;
use std::time::Duration;

use crate::http::TransportError;

/// Run `fut` under `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    }
}
