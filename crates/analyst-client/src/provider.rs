use analysis_core::{AnalysisRequest, JobError, JobHandle, JobService, JobStatus};
use async_trait::async_trait;

use crate::AnalystClient;

/// HTTP-backed implementation that delegates to `AnalystClient`.
pub struct HttpJobService {
    client: AnalystClient,
}

impl HttpJobService {
    pub fn new(client: AnalystClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AnalystClient {
        &self.client
    }
}

impl From<AnalystClient> for HttpJobService {
    fn from(client: AnalystClient) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobHandle, JobError> {
        Ok(self.client.submit(request).await?)
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        Ok(self.client.status(handle).await?)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
