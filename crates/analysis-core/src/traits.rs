use async_trait::async_trait;

use crate::{AnalysisRequest, JobError, JobHandle, JobStatus};

/// Remote service that accepts analysis jobs and reports their status.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit a request. Implementations must reject invalid requests
    /// without touching the network.
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobHandle, JobError>;

    /// One status query for an accepted job.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, JobError>;

    fn backend_name(&self) -> &'static str;
}
