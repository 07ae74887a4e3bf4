use crate::{
    error::{FetchError, FetchResult},
    Provider,
};
use futures::{
    future::{self, BoxFuture},
    Future, FutureExt,
};
use log::{error, warn};

/// A provider call plus whatever normalization follows it, not yet started.
pub struct Attempt<'a, T> {
    pub provider: Provider,
    run: BoxFuture<'a, FetchResult<T>>,
}

impl<'a, T> Attempt<'a, T> {
    pub fn new<F>(provider: Provider, run: F) -> Self
    where
        F: Future<Output = FetchResult<T>> + Send + 'a,
    {
        Self {
            provider,
            run: run.boxed(),
        }
    }
}

/// Runs `attempts` one after another, in order, and returns the first success.
/// Later attempts are never polled once one succeeds.
pub async fn first_success<T>(what: &str, attempts: Vec<Attempt<'_, T>>) -> Option<(Provider, T)> {
    for attempt in attempts {
        match attempt.run.await {
            Ok(value) => return Some((attempt.provider, value)),
            Err(e) => warn!("{}: {} failed, trying next provider: {}", what, attempt.provider, e),
        }
    }
    error!("{}: every provider failed", what);
    None
}

/// Polls every attempt concurrently and reports each outcome; one failure
/// does not cancel the others.
pub async fn settle_all<T>(attempts: Vec<Attempt<'_, T>>) -> Vec<(Provider, FetchResult<T>)> {
    let providers: Vec<Provider> = attempts.iter().map(|a| a.provider).collect();
    let results = future::join_all(attempts.into_iter().map(|a| a.run)).await;
    providers.into_iter().zip(results).collect()
}

/// An empty list from a provider counts as a miss so the chain moves on.
pub fn non_empty<T>(provider: Provider, items: Vec<T>) -> FetchResult<Vec<T>> {
    if items.is_empty() {
        Err(FetchError::NotFound {
            provider,
            what: "any rows".to_owned(),
        })
    } else {
        Ok(items)
    }
}

/// Logs a failed settle-all branch and turns it into `None`.
pub fn settled<T>(what: &str, result: FetchResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} unavailable: {}", what, e);
            None
        }
    }
}
