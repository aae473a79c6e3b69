//! Recording compute cluster client

use async_trait::async_trait;
use atlas_service_clients::{ClientResult, ComputeClusterClient, JobId, JobSpec, JobStatus};
use serde_json::json;
use uuid::Uuid;

use crate::recorder::{CallRecorder, StubBuilder};

/// Recording stand-in for [`ComputeClusterClient`]
///
/// Unstubbed submissions get a fresh `job-<uuid>` id; status queries report
/// `Pending` and cancellation reports that nothing was running.
#[derive(Debug, Clone, Default)]
pub struct MockComputeClusterClient {
    recorder: CallRecorder,
}

impl MockComputeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn when(&self, method: &str) -> StubBuilder<'_> {
        self.recorder.when(method)
    }

    /// Specs passed to `submit_job`, in submission order
    pub fn submitted_jobs(&self) -> Vec<JobSpec> {
        self.recorder
            .calls_to("submit_job")
            .into_iter()
            .filter_map(|call| call.args.into_iter().next())
            .filter_map(|spec| serde_json::from_value(spec).ok())
            .collect()
    }
}

#[async_trait]
impl ComputeClusterClient for MockComputeClusterClient {
    async fn submit_job(&self, spec: JobSpec) -> ClientResult<JobId> {
        self.recorder.respond_or_else("submit_job", vec![json!(spec)], || {
            Ok(JobId::new(format!("job-{}", Uuid::new_v4())))
        })
    }

    async fn job_status(&self, id: &JobId) -> ClientResult<JobStatus> {
        self.recorder.respond("job_status", vec![json!(id)])
    }

    async fn cancel_job(&self, id: &JobId) -> ClientResult<bool> {
        self.recorder.respond("cancel_job", vec![json!(id)])
    }
}
