//! Typed models of Moonraker API responses.
//!
//! Every Moonraker payload arrives wrapped in a `{"result": ...}` envelope.
//! Fields default when absent so a partial response from an older or
//! reduced Moonraker install still decodes. Values Moonraker reports as
//! `null` (CPU temperature without a sensor, fan RPM without a tachometer)
//! are modelled as `Option` rather than failing the whole document.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// The `{"result": ...}` envelope around every Moonraker response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
}

/// One entry of the `moonraker_stats` time series, ordered oldest to
/// newest; the last entry is the current reading.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoonrakerStatEntry {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub mem_units: String,
}

/// Host CPU usage map; only the aggregate `cpu` entry is exported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemCpuUsage {
    #[serde(default)]
    pub cpu: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemMemory {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub available: u64,
    #[serde(default)]
    pub used: u64,
}

/// Per-interface counters from `/machine/proc_stats`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkInterfaceStats {
    #[serde(default)]
    pub rx_bytes: u64,
    #[serde(default)]
    pub tx_bytes: u64,
    #[serde(default)]
    pub rx_packets: u64,
    #[serde(default)]
    pub tx_packets: u64,
    #[serde(default)]
    pub rx_errs: u64,
    #[serde(default)]
    pub tx_errs: u64,
    #[serde(default)]
    pub rx_drop: u64,
    #[serde(default)]
    pub tx_drop: u64,
    /// Instantaneous bandwidth estimate, bytes per second.
    #[serde(default)]
    pub bandwidth: f64,
}

/// Payload of `/machine/proc_stats`, shared by the `process_stats` and
/// `network_stats` modules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcStats {
    #[serde(default)]
    pub moonraker_stats: Vec<MoonrakerStatEntry>,
    #[serde(default)]
    pub cpu_temp: Option<f64>,
    #[serde(default)]
    pub network: HashMap<String, NetworkInterfaceStats>,
    #[serde(default)]
    pub system_cpu_usage: SystemCpuUsage,
    #[serde(default)]
    pub system_memory: SystemMemory,
    #[serde(default)]
    pub system_uptime: f64,
    #[serde(default)]
    pub websocket_connections: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskUsage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
}

/// Payload of `/server/files/directory` with `extended=true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryInfo {
    #[serde(default)]
    pub disk_usage: DiskUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueuedJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub filename: String,
}

/// Payload of `/server/job_queue/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQueueStatus {
    #[serde(default)]
    pub queued_jobs: Vec<QueuedJob>,
    #[serde(default)]
    pub queue_state: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuInfo {
    #[serde(default)]
    pub cpu_count: Option<u64>,
}

/// Payload of `/machine/system_info` (inner `system_info` object).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub cpu_info: CpuInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MachineSystemInfo {
    #[serde(default)]
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcodeMove {
    #[serde(default)]
    pub speed_factor: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub extrude_factor: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Toolhead {
    #[serde(default)]
    pub print_time: f64,
    #[serde(default)]
    pub estimated_print_time: f64,
    #[serde(default)]
    pub max_velocity: f64,
    #[serde(default)]
    pub max_accel: f64,
    #[serde(default)]
    pub max_accel_to_decel: f64,
    #[serde(default)]
    pub square_corner_velocity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extruder {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub target: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub pressure_advance: f64,
    #[serde(default)]
    pub smooth_time: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeaterBed {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub target: f64,
    #[serde(default)]
    pub power: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fan {
    #[serde(default)]
    pub speed: f64,
    /// `null` when the fan has no tachometer pin.
    #[serde(default)]
    pub rpm: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdleTimeout {
    #[serde(default)]
    pub printing_time: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualSdCard {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub file_position: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrintStats {
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub print_duration: f64,
    #[serde(default)]
    pub filament_used: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayStatus {
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemperatureSensor {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub measured_min_temp: f64,
    #[serde(default)]
    pub measured_max_temp: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemperatureFan {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub target: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputPin {
    #[serde(default)]
    pub value: f64,
}

/// The `status` object of `/printer/objects/query`.
///
/// The fixed sub-objects are keyed by their literal names. Named entities
/// arrive as `"temperature_sensor <name>"`, `"temperature_fan <name>"` and
/// `"output_pin <name>"` keys; decoding splits them into per-kind maps
/// indexed by the raw entity name. Entries whose payload does not match the
/// expected shape are dropped rather than failing the document.
#[derive(Debug, Clone, Default)]
pub struct PrinterStatus {
    pub gcode_move: GcodeMove,
    pub toolhead: Toolhead,
    pub extruder: Extruder,
    pub heater_bed: HeaterBed,
    pub fan: Fan,
    pub idle_timeout: IdleTimeout,
    pub virtual_sdcard: VirtualSdCard,
    pub print_stats: PrintStats,
    pub display_status: DisplayStatus,
    pub temperature_sensors: HashMap<String, TemperatureSensor>,
    pub temperature_fans: HashMap<String, TemperatureFan>,
    pub output_pins: HashMap<String, OutputPin>,
}

#[derive(Deserialize)]
struct RawPrinterStatus {
    #[serde(default)]
    gcode_move: GcodeMove,
    #[serde(default)]
    toolhead: Toolhead,
    #[serde(default)]
    extruder: Extruder,
    #[serde(default)]
    heater_bed: HeaterBed,
    #[serde(default)]
    fan: Fan,
    #[serde(default)]
    idle_timeout: IdleTimeout,
    #[serde(default)]
    virtual_sdcard: VirtualSdCard,
    #[serde(default)]
    print_stats: PrintStats,
    #[serde(default)]
    display_status: DisplayStatus,
    #[serde(flatten)]
    named: HashMap<String, Value>,
}

impl<'de> Deserialize<'de> for PrinterStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPrinterStatus::deserialize(deserializer)?;

        let mut status = PrinterStatus {
            gcode_move: raw.gcode_move,
            toolhead: raw.toolhead,
            extruder: raw.extruder,
            heater_bed: raw.heater_bed,
            fan: raw.fan,
            idle_timeout: raw.idle_timeout,
            virtual_sdcard: raw.virtual_sdcard,
            print_stats: raw.print_stats,
            display_status: raw.display_status,
            ..PrinterStatus::default()
        };

        for (key, value) in raw.named {
            if let Some(name) = key.strip_prefix("temperature_sensor ") {
                if let Ok(sensor) = serde_json::from_value::<TemperatureSensor>(value) {
                    status.temperature_sensors.insert(name.to_string(), sensor);
                }
            } else if let Some(name) = key.strip_prefix("temperature_fan ") {
                if let Ok(fan) = serde_json::from_value::<TemperatureFan>(value) {
                    status.temperature_fans.insert(name.to_string(), fan);
                }
            } else if let Some(name) = key.strip_prefix("output_pin ") {
                if let Ok(pin) = serde_json::from_value::<OutputPin>(value) {
                    status.output_pins.insert(name.to_string(), pin);
                }
            }
            // Any other status object was not requested; ignore it.
        }

        Ok(status)
    }
}

/// Payload of `/printer/objects/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrinterObjects {
    #[serde(default)]
    pub eventtime: f64,
    #[serde(default)]
    pub status: PrinterStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_proc_stats() {
        let json = r#"{
            "result": {
                "moonraker_stats": [
                    {"time": 1000.0, "cpu_usage": 1.5, "memory": 20000, "mem_units": "kB"},
                    {"time": 1001.0, "cpu_usage": 2.5, "memory": 21000, "mem_units": "kB"}
                ],
                "cpu_temp": 45.0,
                "network": {
                    "eth0": {
                        "rx_bytes": 100, "tx_bytes": 200,
                        "rx_packets": 3, "tx_packets": 4,
                        "rx_errs": 0, "tx_errs": 0,
                        "rx_drop": 0, "tx_drop": 0,
                        "bandwidth": 1.25
                    }
                },
                "system_cpu_usage": {"cpu": 2.5, "cpu0": 1.0},
                "system_memory": {"total": 1000, "available": 600, "used": 400},
                "system_uptime": 12345.6,
                "websocket_connections": 4
            }
        }"#;

        let resp: ApiResponse<ProcStats> = serde_json::from_str(json).unwrap();
        let stats = resp.result;

        assert_eq!(stats.moonraker_stats.len(), 2);
        assert_eq!(stats.moonraker_stats[1].memory, 21000);
        assert_eq!(stats.cpu_temp, Some(45.0));
        assert_eq!(stats.network["eth0"].bandwidth, 1.25);
        assert_eq!(stats.system_cpu_usage.cpu, 2.5);
        assert_eq!(stats.websocket_connections, 4);
    }

    #[test]
    fn test_decode_proc_stats_null_cpu_temp() {
        let json = r#"{"result": {"cpu_temp": null}}"#;
        let resp: ApiResponse<ProcStats> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.cpu_temp, None);
    }

    #[test]
    fn test_decode_directory_info() {
        let json = r#"{
            "result": {
                "dirs": [],
                "files": [],
                "disk_usage": {"total": 1000, "used": 400, "free": 600}
            }
        }"#;

        let resp: ApiResponse<DirectoryInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.disk_usage.total, 1000);
        assert_eq!(resp.result.disk_usage.free, 600);
    }

    #[test]
    fn test_decode_job_queue() {
        let json = r#"{
            "result": {
                "queued_jobs": [
                    {"job_id": "0001", "filename": "a.gcode"},
                    {"job_id": "0002", "filename": "b.gcode"}
                ],
                "queue_state": "ready"
            }
        }"#;

        let resp: ApiResponse<JobQueueStatus> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.queued_jobs.len(), 2);
        assert_eq!(resp.result.queue_state, "ready");
    }

    #[test]
    fn test_decode_system_info_null_cpu_count() {
        let json = r#"{"result": {"system_info": {"cpu_info": {"cpu_count": null}}}}"#;
        let resp: ApiResponse<MachineSystemInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.system_info.cpu_info.cpu_count, None);
    }

    #[test]
    fn test_decode_printer_status_named_entities() {
        let json = r#"{
            "gcode_move": {"speed_factor": 1.0, "speed": 1500.0, "extrude_factor": 1.0},
            "toolhead": {"print_time": 10.0, "max_velocity": 300.0},
            "extruder": {"temperature": 210.0, "target": 215.0},
            "heater_bed": {"temperature": 60.0, "target": 60.0, "power": 0.4},
            "fan": {"speed": 0.5, "rpm": null},
            "idle_timeout": {"state": "Printing", "printing_time": 500.0},
            "virtual_sdcard": {"progress": 0.25, "file_position": 4096},
            "print_stats": {"total_duration": 600.0, "print_duration": 500.0, "filament_used": 42.5},
            "display_status": {"progress": 0.26, "message": null},
            "temperature_sensor chamber": {
                "temperature": 35.0, "measured_min_temp": 20.0, "measured_max_temp": 40.0
            },
            "temperature_fan exhaust-fan": {"speed": 0.8, "temperature": 41.0, "target": 45.0},
            "output_pin caselight": {"value": 1.0}
        }"#;

        let status: PrinterStatus = serde_json::from_str(json).unwrap();

        assert_eq!(status.gcode_move.speed, 1500.0);
        assert_eq!(status.fan.rpm, None);
        assert_eq!(status.temperature_sensors["chamber"].temperature, 35.0);
        assert_eq!(status.temperature_fans["exhaust-fan"].target, 45.0);
        assert_eq!(status.output_pins["caselight"].value, 1.0);
    }

    #[test]
    fn test_decode_printer_status_malformed_entity_dropped() {
        let json = r#"{
            "extruder": {"temperature": 210.0},
            "temperature_sensor broken": "not an object",
            "output_pin ok": {"value": 0.0}
        }"#;

        let status: PrinterStatus = serde_json::from_str(json).unwrap();

        assert!(status.temperature_sensors.is_empty());
        assert_eq!(status.output_pins.len(), 1);
        assert_eq!(status.extruder.temperature, 210.0);
    }

    #[test]
    fn test_decode_printer_objects_missing_fields_default() {
        let json = r#"{"result": {"eventtime": 100.0, "status": {}}}"#;
        let resp: ApiResponse<PrinterObjects> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.result.status.toolhead.max_velocity, 0.0);
        assert!(resp.result.status.output_pins.is_empty());
    }
}
