//! Cancellation plumbing shared by every blocking step of a run.

use crate::error::{CcatError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`, returning `CcatError::Cancelled` if the token
/// fires first.
pub(crate) async fn cancellable<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CcatError::Cancelled),
        res = fut => res,
    }
}
