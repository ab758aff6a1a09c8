use analysis_core::{AnalysisRequest, JobHandle, JobStatus};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};
use crate::ClientConfig;

#[derive(Debug, Clone, Deserialize)]
struct SubmitResponse {
    request_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PollResponse {
    status: Option<String>,
    report: Option<serde_json::Value>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the analysis job endpoints
#[derive(Clone)]
pub struct AnalystClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl AnalystClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base_url = reqwest::Url::parse(&config.base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("bad base url {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidRequest(format!(
                "bad base url {}",
                config.base_url
            )));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Start an analysis job. Invalid requests are rejected before any network call.
    pub async fn submit(&self, request: &AnalysisRequest) -> ClientResult<JobHandle> {
        request
            .validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .post(self.endpoint(&["analyze"]))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: SubmitResponse = serde_json::from_str(&body)?;
        match (parsed.request_id, parsed.error) {
            (Some(id), _) if !id.trim().is_empty() => {
                tracing::info!("Analysis job accepted for {}: {}", request.symbol, id);
                Ok(JobHandle::new(id))
            }
            (_, Some(error)) => Err(ClientError::Rejected(
                non_blank(error).unwrap_or_else(|| "Failed to start analysis".to_string()),
            )),
            _ => Err(ClientError::InvalidResponse(
                "service accepted the request but returned no identifier".to_string(),
            )),
        }
    }

    /// Query the status of an accepted job once.
    pub async fn status(&self, handle: &JobHandle) -> ClientResult<JobStatus> {
        let response = self
            .client
            .get(self.endpoint(&["analyze", &handle.request_id]))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: PollResponse = serde_json::from_str(&body)?;
        let job_status = match parsed.status.as_deref() {
            Some("completed") => {
                JobStatus::Completed(parsed.report.unwrap_or(serde_json::Value::Null))
            }
            Some("error") => JobStatus::Failed(
                parsed
                    .error
                    .and_then(non_blank)
                    .unwrap_or_else(|| "Analysis failed".to_string()),
            ),
            Some("processing") => JobStatus::Processing,
            other => {
                tracing::warn!(
                    "Unknown status {:?} for job {}, treating as processing",
                    other,
                    handle
                );
                JobStatus::Processing
            }
        };
        tracing::debug!("Job {} status: {:?}", handle, job_status);
        Ok(job_status)
    }

    /// Check service health
    pub async fn health(&self) -> ClientResult<bool> {
        let response = self
            .client
            .get(self.endpoint(&["health"]))
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn non_blank(message: String) -> Option<String> {
    Some(message).filter(|m| !m.trim().is_empty())
}

fn status_error(status: reqwest::StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(non_blank);
    tracing::warn!("Analysis service returned {}: {:?}", status, message);
    ClientError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Hits {
        submits: Arc<AtomicUsize>,
    }

    async fn spawn_server(app: Router) -> AnalystClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        AnalystClient::new(ClientConfig::new(
            format!("http://{}", addr),
            Duration::from_secs(5),
        ))
        .unwrap()
    }

    fn service(hits: Hits) -> Router {
        Router::new()
            .route(
                "/analyze",
                post(|State(hits): State<Hits>, Json(body): Json<Value>| async move {
                    hits.submits.fetch_add(1, Ordering::SeqCst);
                    match body["symbol"].as_str() {
                        Some("FAIL") => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "worker crashed", "success": false })),
                        ),
                        Some("NOID") => (StatusCode::OK, Json(json!({ "status": "processing" }))),
                        Some("REJECT") => (StatusCode::OK, Json(json!({ "error": "quota exceeded" }))),
                        Some("BLANK") => (StatusCode::OK, Json(json!({ "error": "  " }))),
                        _ => (
                            StatusCode::OK,
                            Json(json!({
                                "request_id": format!("{}_{}_1700000000", body["symbol"].as_str().unwrap_or(""), body["company_name"].as_str().unwrap_or("")),
                                "status": "processing",
                                "message": "Analysis started in background"
                            })),
                        ),
                    }
                }),
            )
            .route(
                "/analyze/:request_id",
                get(|Path(request_id): Path<String>| async move {
                    let key = request_id.clone();
                    match key.as_str() {
                        "done" => (
                            StatusCode::OK,
                            Json(json!({ "request_id": request_id, "status": "completed", "success": true, "report": { "executive_summary": "Fine." } })),
                        ),
                        "broken" => (
                            StatusCode::OK,
                            Json(json!({ "request_id": request_id, "status": "error", "success": false, "error": "An error occurred during the agent run: boom" })),
                        ),
                        "odd" => (StatusCode::OK, Json(json!({ "status": "queued" }))),
                        "silent" => (
                            StatusCode::OK,
                            Json(json!({ "request_id": request_id, "status": "error", "success": false, "error": "" })),
                        ),
                        "TSLA_Tesla Inc._1700000000" => (
                            StatusCode::OK,
                            Json(json!({ "request_id": request_id, "status": "processing", "message": "Analysis still in progress" })),
                        ),
                        _ => (StatusCode::NOT_FOUND, Json(json!({ "error": "Request ID not found" }))),
                    }
                }),
            )
            .route(
                "/health",
                get(|| async { Json(json!({ "status": "healthy" })) }),
            )
            .with_state(hits)
    }

    #[tokio::test]
    async fn test_submit_returns_handle() {
        let client = spawn_server(service(Hits::default())).await;
        let handle = client
            .submit(&AnalysisRequest::new("tsla", "Tesla Inc."))
            .await
            .unwrap();
        assert_eq!(handle.request_id, "TSLA_Tesla Inc._1700000000");

        // ids with spaces survive the round trip through the path
        let status = client.status(&handle).await.unwrap();
        assert_eq!(status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_invalid_request_never_hits_network() {
        let hits = Hits::default();
        let client = spawn_server(service(hits.clone())).await;
        let err = client
            .submit(&AnalysisRequest::new("", "Tesla Inc."))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert_eq!(hits.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_failures() {
        let client = spawn_server(service(Hits::default())).await;

        let err = client
            .submit(&AnalysisRequest::new("FAIL", "Broken Co"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status, message: Some(ref m) }
                if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR && m == "worker crashed"
        ));

        let err = client
            .submit(&AnalysisRequest::new("NOID", "No Id Co"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));

        let err = client
            .submit(&AnalysisRequest::new("REJECT", "Rejected Co"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "quota exceeded"));

        let err = client
            .submit(&AnalysisRequest::new("BLANK", "Blank Co"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "Failed to start analysis"));
    }

    #[tokio::test]
    async fn test_status_variants() {
        let client = spawn_server(service(Hits::default())).await;

        let done = client.status(&JobHandle::new("done")).await.unwrap();
        assert_eq!(
            done,
            JobStatus::Completed(json!({ "executive_summary": "Fine." }))
        );

        let broken = client.status(&JobHandle::new("broken")).await.unwrap();
        assert_eq!(
            broken,
            JobStatus::Failed("An error occurred during the agent run: boom".to_string())
        );

        let silent = client.status(&JobHandle::new("silent")).await.unwrap();
        assert_eq!(silent, JobStatus::Failed("Analysis failed".to_string()));

        let odd = client.status(&JobHandle::new("odd")).await.unwrap();
        assert_eq!(odd, JobStatus::Processing);

        let missing = client.status(&JobHandle::new("missing")).await.unwrap_err();
        assert!(matches!(
            missing,
            ClientError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_health() {
        let client = spawn_server(service(Hits::default())).await;
        assert!(client.health().await.unwrap());
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let err = AnalystClient::new(ClientConfig::new("not a url", Duration::from_secs(1)));
        assert!(matches!(err, Err(ClientError::InvalidRequest(_))));
    }
}
