//! Moonraker HTTP client: the fetch capability behind each module.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::api::{
    ApiResponse, DirectoryInfo, JobQueueStatus, MachineSystemInfo, PrinterObjects, ProcStats,
    SystemInfo,
};

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors reaching a Moonraker endpoint. Always module-scoped: a failed
/// fetch skips that module for the current pass and nothing else.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport or decode failure.
    #[error("Moonraker request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from Moonraker.
    #[error("Moonraker returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Query string selecting every printer object the `printer_objects`
/// module maps. Bare `temperature_sensor`/`temperature_fan`/`output_pin`
/// entries make Moonraker return all named instances of each.
const PRINTER_OBJECTS_QUERY: &str = "/printer/objects/query?gcode_move&toolhead&extruder\
     &heater_bed&fan&idle_timeout&virtual_sdcard&print_stats&display_status\
     &temperature_sensor&temperature_fan&output_pin";

/// Fetch capability for a Moonraker instance, one operation per upstream
/// endpoint category.
///
/// [`HttpClient`] implements this over HTTP; tests substitute a fake so
/// the dispatcher and mappers run without a printer. The temperature
/// store has no fixed schema, so that operation returns a generic JSON
/// tree for the mapper to walk with explicit shape checks.
pub trait MoonrakerApi {
    fn proc_stats(&self, target: &str) -> impl Future<Output = Result<ProcStats>> + Send;
    fn directory_info(&self, target: &str) -> impl Future<Output = Result<DirectoryInfo>> + Send;
    fn job_queue(&self, target: &str) -> impl Future<Output = Result<JobQueueStatus>> + Send;
    fn system_info(&self, target: &str) -> impl Future<Output = Result<SystemInfo>> + Send;
    fn temperature_store(&self, target: &str) -> impl Future<Output = Result<Value>> + Send;
    fn printer_objects(&self, target: &str) -> impl Future<Output = Result<PrinterObjects>> + Send;
}

/// Shared reqwest-backed Moonraker client.
///
/// One long-lived instance serves every scrape pass; cloning is cheap and
/// shares the underlying connection pool. The per-request timeout lives
/// here, not in the dispatcher.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn get_json<T: DeserializeOwned>(&self, target: &str, path_and_query: &str) -> Result<T> {
        let url = format!("{}{}", base_url(target), path_and_query);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { status, url });
        }

        let body: ApiResponse<T> = response.json().await?;
        Ok(body.result)
    }
}

impl MoonrakerApi for HttpClient {
    async fn proc_stats(&self, target: &str) -> Result<ProcStats> {
        self.get_json(target, "/machine/proc_stats").await
    }

    async fn directory_info(&self, target: &str) -> Result<DirectoryInfo> {
        self.get_json(target, "/server/files/directory?path=gcodes&extended=true")
            .await
    }

    async fn job_queue(&self, target: &str) -> Result<JobQueueStatus> {
        self.get_json(target, "/server/job_queue/status").await
    }

    async fn system_info(&self, target: &str) -> Result<SystemInfo> {
        let info: MachineSystemInfo = self.get_json(target, "/machine/system_info").await?;
        Ok(info.system_info)
    }

    async fn temperature_store(&self, target: &str) -> Result<Value> {
        self.get_json(target, "/server/temperature_store").await
    }

    async fn printer_objects(&self, target: &str) -> Result<PrinterObjects> {
        self.get_json(target, PRINTER_OBJECTS_QUERY).await
    }
}

/// Build the base URL for a target, prefixing bare `host[:port]` forms
/// with `http://`. Explicit `http://`/`https://` targets pass through.
fn base_url(target: &str) -> String {
    let trimmed = target.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
