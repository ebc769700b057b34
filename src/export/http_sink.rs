//! JSON-over-HTTP sink.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::config::ExporterConfig;
use crate::export::batch::ExportBatch;
use crate::export::sink::{SinkError, TelemetrySink};

/// Path the batch is posted to on the collector.
pub const EXPORT_PATH: &str = "/v1/telemetry";

/// Posts each batch as a JSON document to the collector.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(config: &ExporterConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cart-telemetry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SinkError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: export_url(&config.endpoint, config.insecure),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `http://` when insecure, `https://` otherwise. An endpoint that already
/// carries a scheme is kept as given.
pub fn export_url(endpoint: &str, insecure: bool) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return format!("{}{}", endpoint, EXPORT_PATH);
    }
    let scheme = if insecure { "http" } else { "https" };
    format!("{}://{}{}", scheme, endpoint, EXPORT_PATH)
}

impl TelemetrySink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn export<'a>(&'a self, batch: &'a ExportBatch) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let body = serde_json::to_vec(batch)?;
            let response = self
                .client
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| SinkError::Unavailable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SinkError::Rejected {
                    status: status.as_u16(),
                });
            }
            tracing::debug!(url = %self.url, status = %status, "Batch accepted by collector");
            Ok(())
        })
    }
}
