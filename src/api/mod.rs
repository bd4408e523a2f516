//! Evaluation backend access.
//!
//! [`EvaluationSource`] is the seam the poller fetches through;
//! [`ApiClient`] is its HTTP implementation.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiClientConfig, RunsQuery, SortOrder};
pub use error::FetchError;

use crate::models::RawPayload;
use async_trait::async_trait;

/// Anything that can fetch the raw evaluation document of a run.
///
/// Implementations must report a result that does not exist yet as
/// [`FetchError::NotFoundYet`] and every other failure as one of the
/// remaining variants.
#[async_trait]
pub trait EvaluationSource: Send + Sync {
    async fn fetch_evaluation(&self, run_id: &str) -> Result<RawPayload, FetchError>;
}
