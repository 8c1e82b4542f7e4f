//! Collaborators the report pipeline talks to: job discovery, the artifact
//! store holding run history, and the chat channel.

mod prow;
mod release_repo;
mod slack;

use async_trait::async_trait;

use crate::error::Result;
use crate::periodics::{Block, RunRecord};

pub use prow::ProwArtifacts;
pub use release_repo::{ReleaseRepoJobSource, StaticJobSource};
pub use slack::SlackWebhook;

/// Lists the names of the periodic jobs to report on.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn list_job_names(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: JobSource + ?Sized> JobSource for Box<T> {
    async fn list_job_names(&self) -> Result<Vec<String>> {
        (**self).list_job_names().await
    }
}

/// Read access to the run history of a job.
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Run identifiers, newest first.
    async fn list_run_ids(&self, job_name: &str) -> Result<Vec<String>>;

    /// Status of one run, or `None` if the store has none for it.
    async fn get_run_status(&self, job_name: &str, run_id: &str) -> Result<Option<RunRecord>>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, text: &str, blocks: Option<&[Block]>) -> Result<()>;
}
