//! Remote repository list and the git checkouts under the packages path.

mod list;
mod local;

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use std::future::Future;

pub use list::RepositoryList;
pub use local::{LocalRepositories, LocalRepository, delete_listed};

/// Repositories processed at the same time by batch operations.
pub const CONCURRENCY: usize = 3;

/// Result of one job in a batch, keyed by repository or package name.
#[derive(Debug)]
pub struct Outcome<T> {
    pub name: String,
    pub result: Result<T>,
}

/// Run `jobs` with at most [`CONCURRENCY`] in flight. A failing job does not
/// cancel the others. Outcomes are sorted by name.
pub async fn run_batched<T, Fut>(jobs: Vec<(String, Fut)>) -> Vec<Outcome<T>>
where
    Fut: Future<Output = Result<T>>,
{
    let mut outcomes: Vec<Outcome<T>> = stream::iter(jobs)
        .map(|(name, job)| async move {
            Outcome {
                name,
                result: job.await,
            }
        })
        .buffer_unordered(CONCURRENCY)
        .collect()
        .await;
    outcomes.sort_by(|a, b| a.name.cmp(&b.name));
    outcomes
}
