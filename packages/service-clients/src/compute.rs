//! Compute cluster client interface

use async_trait::async_trait;

use crate::{ClientResult, JobId, JobSpec, JobStatus};

/// Distributed compute cluster (Spark semantics)
#[async_trait]
pub trait ComputeClusterClient: Send + Sync {
    /// Submit a job and return the id the cluster assigned
    async fn submit_job(&self, spec: JobSpec) -> ClientResult<JobId>;

    async fn job_status(&self, id: &JobId) -> ClientResult<JobStatus>;

    /// Request cancellation; `true` if the job was still running
    async fn cancel_job(&self, id: &JobId) -> ClientResult<bool>;
}
