//! Module dispatcher: one collection pass over the enabled modules.
//!
//! Modules are independent units of work. Each enabled module performs
//! exactly one fetch per pass; a fetch failure skips that module's
//! mapping and never blocks the remaining modules. `process_stats` and
//! `network_stats` share one upstream fetch with independently gated
//! sub-mapping, so enabling either (or both) costs a single request.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::client::MoonrakerApi;
use crate::mapping;
use crate::metrics::Sample;

/// The module names the dispatcher recognizes. Configured names outside
/// this set are silently ignored.
pub const KNOWN_MODULES: [&str; 7] = [
    "process_stats",
    "network_stats",
    "directory_info",
    "job_queue",
    "system_info",
    "temperature",
    "printer_objects",
];

/// Drives one collection pass per scrape against a Moonraker target.
///
/// The fetch client and the enabled module set are fixed at construction;
/// the collector itself holds no mutable state, so a single instance can
/// serve any number of passes.
pub struct Collector<C> {
    client: C,
    modules: HashSet<String>,
}

impl<C: MoonrakerApi> Collector<C> {
    /// Create a collector over `client` with the given enabled modules.
    pub fn new(client: C, modules: impl IntoIterator<Item = String>) -> Self {
        Self {
            client,
            modules: modules.into_iter().collect(),
        }
    }

    fn enabled(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Run one collection pass, emitting samples into `sink`.
    ///
    /// Fetch failures are logged at debug level and skip only the failed
    /// module; the pass always runs to completion.
    pub async fn collect_into(&self, target: &str, sink: &mut Vec<Sample>) {
        // process_stats and network_stats share the proc_stats fetch.
        if self.enabled("process_stats") || self.enabled("network_stats") {
            info!(%target, "collecting process_stats");
            match self.client.proc_stats(target).await {
                Ok(stats) => {
                    if self.enabled("process_stats") {
                        mapping::map_process_stats(&stats, sink);
                    }
                    if self.enabled("network_stats") {
                        mapping::map_network_stats(&stats, sink);
                    }
                }
                Err(e) => debug!(%target, error = %e, "skipping process_stats"),
            }
        }

        if self.enabled("directory_info") {
            info!(%target, "collecting directory_info");
            match self.client.directory_info(target).await {
                Ok(dir_info) => mapping::map_directory_info(&dir_info, sink),
                Err(e) => debug!(%target, error = %e, "skipping directory_info"),
            }
        }

        if self.enabled("job_queue") {
            info!(%target, "collecting job_queue");
            match self.client.job_queue(target).await {
                Ok(queue) => mapping::map_job_queue(&queue, sink),
                Err(e) => debug!(%target, error = %e, "skipping job_queue"),
            }
        }

        if self.enabled("system_info") {
            info!(%target, "collecting system_info");
            match self.client.system_info(target).await {
                Ok(sys_info) => mapping::map_system_info(&sys_info, sink),
                Err(e) => debug!(%target, error = %e, "skipping system_info"),
            }
        }

        if self.enabled("temperature") {
            info!(%target, "collecting temperature");
            match self.client.temperature_store(target).await {
                Ok(store) => mapping::map_temperature_store(&store, sink),
                Err(e) => debug!(%target, error = %e, "skipping temperature"),
            }
        }

        if self.enabled("printer_objects") {
            info!(%target, "collecting printer_objects");
            match self.client.printer_objects(target).await {
                Ok(objects) => mapping::map_printer_objects(&objects.status, sink),
                Err(e) => debug!(%target, error = %e, "skipping printer_objects"),
            }
        }
    }

    /// Run one collection pass and return the emitted samples.
    pub async fn collect(&self, target: &str) -> Vec<Sample> {
        let mut sink = Vec::new();
        self.collect_into(target, &mut sink).await;
        sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::api::{
        DirectoryInfo, JobQueueStatus, MoonrakerStatEntry, PrinterObjects, ProcStats, SystemInfo,
    };
    use crate::client::{ClientError, Result};

    /// Fake fetch collaborator counting upstream requests.
    #[derive(Clone, Default)]
    struct FakeApi {
        proc_calls: Arc<AtomicUsize>,
        queue_calls: Arc<AtomicUsize>,
        fail_proc_stats: bool,
    }

    fn unreachable_error() -> ClientError {
        ClientError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            url: "http://printer/machine/proc_stats".to_string(),
        }
    }

    impl MoonrakerApi for FakeApi {
        async fn proc_stats(&self, _target: &str) -> Result<ProcStats> {
            self.proc_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_proc_stats {
                return Err(unreachable_error());
            }
            Ok(ProcStats {
                moonraker_stats: vec![MoonrakerStatEntry {
                    time: 1.0,
                    cpu_usage: 2.0,
                    memory: 1000,
                    mem_units: "kB".to_string(),
                }],
                ..ProcStats::default()
            })
        }

        async fn directory_info(&self, _target: &str) -> Result<DirectoryInfo> {
            Ok(DirectoryInfo::default())
        }

        async fn job_queue(&self, _target: &str) -> Result<JobQueueStatus> {
            self.queue_calls.fetch_add(1, Ordering::Relaxed);
            Ok(JobQueueStatus::default())
        }

        async fn system_info(&self, _target: &str) -> Result<SystemInfo> {
            Ok(SystemInfo::default())
        }

        async fn temperature_store(&self, _target: &str) -> Result<serde_json::Value> {
            Ok(json!({"extruder": {"temperatures": [20.0]}}))
        }

        async fn printer_objects(&self, _target: &str) -> Result<PrinterObjects> {
            Ok(PrinterObjects::default())
        }
    }

    fn modules(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_modules_no_fetches() {
        let api = FakeApi::default();
        let collector = Collector::new(api.clone(), modules(&[]));

        let samples = collector.collect("printer").await;

        assert!(samples.is_empty());
        assert_eq!(api.proc_calls.load(Ordering::Relaxed), 0);
        assert_eq!(api.queue_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_unknown_module_silently_ignored() {
        let api = FakeApi::default();
        let collector = Collector::new(api.clone(), modules(&["history", "job_queue"]));

        let samples = collector.collect("printer").await;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "klipper_job_queue_length");
    }

    #[tokio::test]
    async fn test_shared_fetch_performed_once_for_both_modules() {
        let api = FakeApi::default();
        let collector = Collector::new(api.clone(), modules(&["process_stats", "network_stats"]));

        collector.collect("printer").await;

        assert_eq!(api.proc_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_network_stats_alone_still_fetches_once() {
        let api = FakeApi::default();
        let collector = Collector::new(api.clone(), modules(&["network_stats"]));

        let samples = collector.collect("printer").await;

        assert_eq!(api.proc_calls.load(Ordering::Relaxed), 1);
        // No interfaces in the fixture and no process_stats samples.
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_module_but_not_siblings() {
        let api = FakeApi {
            fail_proc_stats: true,
            ..FakeApi::default()
        };
        let collector = Collector::new(api.clone(), modules(&["process_stats", "job_queue"]));

        let samples = collector.collect("printer").await;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "klipper_job_queue_length");
        assert_eq!(api.proc_calls.load(Ordering::Relaxed), 1);
        assert_eq!(api.queue_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_duplicate_module_names_fetch_once() {
        let api = FakeApi::default();
        let collector = Collector::new(api.clone(), modules(&["job_queue", "job_queue"]));

        collector.collect("printer").await;

        assert_eq!(api.queue_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_known_modules_complete() {
        assert_eq!(KNOWN_MODULES.len(), 7);
        assert!(KNOWN_MODULES.contains(&"temperature"));
        assert!(KNOWN_MODULES.contains(&"printer_objects"));
    }
}
