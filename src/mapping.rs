//! Mapping from Moonraker responses to metric samples.
//!
//! Fixed-schema modules enumerate a statically known list of samples.
//! The temperature store has no fixed schema and is walked as a generic
//! JSON tree with explicit shape checks; upstream-supplied entity names
//! pass through [`sanitize_name`] before becoming metric-name fragments.

use serde_json::Value;
use tracing::{error, warn};

use crate::api::{DirectoryInfo, JobQueueStatus, PrinterStatus, ProcStats, SystemInfo};
use crate::metrics::Sample;

/// Memory unit Moonraker is expected to report its own usage in.
const EXPECTED_MEM_UNITS: &str = "kB";

/// Sanitize an upstream-supplied name into a metric-name fragment.
///
/// Hyphens become underscores; every other character outside
/// `[A-Za-z0-9_]` is deleted. The transform is idempotent and may yield
/// an empty fragment. It is not injective: `"Bed!"` and `"Bed?"` both
/// collapse to `"Bed"`, and the resulting metric-name collision is
/// resolved by the sink, not here.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Map the Moonraker process stats portion of `/machine/proc_stats`.
///
/// Memory and CPU figures come from the last (current) entry of the
/// reported time series. A memory unit other than `kB` skips only the
/// memory sample; an empty series skips both series-derived samples.
/// The remaining host-level samples always emit.
pub fn map_process_stats(stats: &ProcStats, sink: &mut Vec<Sample>) {
    match stats.moonraker_stats.last() {
        Some(current) => {
            if current.mem_units != EXPECTED_MEM_UNITS {
                error!(
                    units = %current.mem_units,
                    "unexpected units for Moonraker memory usage"
                );
            } else {
                sink.push(Sample::gauge(
                    "klipper_moonraker_memory_kb",
                    current.memory as f64,
                    "Moonraker memory usage in Kb.",
                ));
            }

            sink.push(Sample::gauge(
                "klipper_moonraker_cpu_usage",
                current.cpu_usage,
                "Moonraker CPU usage.",
            ));
        }
        None => error!("moonraker_stats series is empty"),
    }

    sink.push(Sample::gauge(
        "klipper_moonraker_websocket_connections",
        stats.websocket_connections as f64,
        "Moonraker Websocket connection count.",
    ));
    sink.push(Sample::gauge(
        "klipper_system_cpu_temp",
        stats.cpu_temp.unwrap_or(0.0),
        "Klipper system CPU temperature in celsius.",
    ));
    sink.push(Sample::gauge(
        "klipper_system_cpu",
        stats.system_cpu_usage.cpu,
        "Klipper system CPU usage.",
    ));
    sink.push(Sample::gauge(
        "klipper_system_memory_total",
        stats.system_memory.total as f64,
        "Klipper system total memory.",
    ));
    sink.push(Sample::gauge(
        "klipper_system_memory_available",
        stats.system_memory.available as f64,
        "Klipper system available memory.",
    ));
    sink.push(Sample::gauge(
        "klipper_system_memory_used",
        stats.system_memory.used as f64,
        "Klipper system used memory.",
    ));
    sink.push(Sample::counter(
        "klipper_system_uptime",
        stats.system_uptime,
        "Klipper system uptime.",
    ));
}

/// Map the per-interface network portion of `/machine/proc_stats`.
///
/// The interface name is embedded in each metric name; iteration order
/// is not significant since no aggregation occurs.
pub fn map_network_stats(stats: &ProcStats, sink: &mut Vec<Sample>) {
    for (interface, counters) in &stats.network {
        let iface = sanitize_name(interface);

        sink.push(Sample::counter(
            format!("klipper_network_{iface}_rx_bytes"),
            counters.rx_bytes as f64,
            "Klipper network received bytes.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_tx_bytes"),
            counters.tx_bytes as f64,
            "Klipper network transmitted bytes.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_rx_packets"),
            counters.rx_packets as f64,
            "Klipper network received packets.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_tx_packets"),
            counters.tx_packets as f64,
            "Klipper network transmitted packets.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_rx_errs"),
            counters.rx_errs as f64,
            "Klipper network received errored packets.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_tx_errs"),
            counters.tx_errs as f64,
            "Klipper network transmitted errored packets.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_rx_drop"),
            counters.rx_drop as f64,
            "Klipper network received dropped packets.",
        ));
        sink.push(Sample::counter(
            format!("klipper_network_{iface}_tx_drop"),
            counters.tx_drop as f64,
            "Klipper network transmitted dropped packets.",
        ));
        sink.push(Sample::gauge(
            format!("klipper_network_{iface}_bandwidth"),
            counters.bandwidth,
            "Klipper network bandwidth.",
        ));
    }
}

/// Map `/server/files/directory` disk usage.
pub fn map_directory_info(info: &DirectoryInfo, sink: &mut Vec<Sample>) {
    sink.push(Sample::gauge(
        "klipper_disk_usage_total",
        info.disk_usage.total as f64,
        "Klipper total disk space.",
    ));
    sink.push(Sample::gauge(
        "klipper_disk_usage_used",
        info.disk_usage.used as f64,
        "Klipper used disk space.",
    ));
    sink.push(Sample::gauge(
        "klipper_disk_usage_available",
        info.disk_usage.free as f64,
        "Klipper available disk space.",
    ));
}

/// Map `/server/job_queue/status` to the queue depth gauge.
pub fn map_job_queue(queue: &JobQueueStatus, sink: &mut Vec<Sample>) {
    sink.push(Sample::gauge(
        "klipper_job_queue_length",
        queue.queued_jobs.len() as f64,
        "Klipper job queue length.",
    ));
}

/// Map `/machine/system_info` to the CPU count gauge.
pub fn map_system_info(info: &SystemInfo, sink: &mut Vec<Sample>) {
    sink.push(Sample::gauge(
        "klipper_system_cpu_count",
        info.cpu_info.cpu_count.unwrap_or(0) as f64,
        "Klipper system CPU count.",
    ));
}

/// Map the temperature store: object name -> series name -> samples.
///
/// Both names are free-form. The metric name derives from the object
/// name and the series name with its trailing plural character stripped,
/// spaces replaced by underscores; the current reading is the last value
/// of the series. Entries that do not match the expected shape are
/// skipped, and an empty series is an upstream defect reported at error
/// level rather than silently emitted as zero.
pub fn map_temperature_store(store: &Value, sink: &mut Vec<Sample>) {
    let Some(objects) = store.as_object() else {
        warn!("temperature store is not an object, skipping module");
        return;
    };

    for (object_name, series_map) in objects {
        let Some(series_map) = series_map.as_object() else {
            warn!(object = %object_name, "temperature store entry is not an object, skipping");
            continue;
        };

        let item = sanitize_name(&object_name.replace(' ', "_"));

        for (series_name, values) in series_map {
            let Some(values) = values.as_array() else {
                warn!(
                    object = %object_name,
                    series = %series_name,
                    "temperature series is not an array, skipping"
                );
                continue;
            };

            // Series names are plural ("temperatures", "targets", "powers").
            let mut singular = series_name.clone();
            if singular.pop().is_none() {
                warn!(object = %object_name, "empty series name, skipping");
                continue;
            }
            let label = sanitize_name(&singular.replace(' ', "_"));

            let Some(last) = values.last() else {
                error!(
                    object = %object_name,
                    series = %series_name,
                    "temperature series is empty"
                );
                continue;
            };
            let Some(value) = last.as_f64() else {
                warn!(
                    object = %object_name,
                    series = %series_name,
                    "temperature series value is not numeric, skipping"
                );
                continue;
            };

            sink.push(Sample::gauge(
                format!("klipper_{item}_{label}"),
                value,
                format!("Klipper {object_name} {label}"),
            ));
        }
    }
}

/// Map the `/printer/objects/query` status: the fixed sub-objects plus
/// the dynamically-named temperature sensors, temperature fans and
/// output pins. Raw entity names are sanitized into the metric name and
/// embedded verbatim in the help text.
pub fn map_printer_objects(status: &PrinterStatus, sink: &mut Vec<Sample>) {
    // gcode_move
    sink.push(Sample::gauge(
        "klipper_gcode_speed_factor",
        status.gcode_move.speed_factor,
        "Klipper gcode speed factor.",
    ));
    sink.push(Sample::gauge(
        "klipper_gcode_speed",
        status.gcode_move.speed,
        "Klipper gcode speed.",
    ));
    sink.push(Sample::gauge(
        "klipper_gcode_extrude_factor",
        status.gcode_move.extrude_factor,
        "Klipper gcode extrude factor.",
    ));

    // toolhead
    sink.push(Sample::gauge(
        "klipper_toolhead_print_time",
        status.toolhead.print_time,
        "Klipper toolhead print time.",
    ));
    sink.push(Sample::gauge(
        "klipper_toolhead_estimated_print_time",
        status.toolhead.estimated_print_time,
        "Klipper estimated print time.",
    ));
    sink.push(Sample::gauge(
        "klipper_toolhead_max_velocity",
        status.toolhead.max_velocity,
        "Klipper toolhead max velocity.",
    ));
    sink.push(Sample::gauge(
        "klipper_toolhead_max_accel",
        status.toolhead.max_accel,
        "Klipper toolhead max acceleration.",
    ));
    sink.push(Sample::gauge(
        "klipper_toolhead_max_accel_to_decel",
        status.toolhead.max_accel_to_decel,
        "Klipper toolhead max acceleration to deceleration.",
    ));
    sink.push(Sample::gauge(
        "klipper_toolhead_square_corner_velocity",
        status.toolhead.square_corner_velocity,
        "Klipper toolhead square corner velocity.",
    ));

    // extruder
    sink.push(Sample::gauge(
        "klipper_extruder_temperature",
        status.extruder.temperature,
        "Klipper extruder temperature.",
    ));
    sink.push(Sample::gauge(
        "klipper_extruder_target",
        status.extruder.target,
        "Klipper extruder target.",
    ));
    sink.push(Sample::gauge(
        "klipper_extruder_power",
        status.extruder.power,
        "Klipper extruder power.",
    ));
    sink.push(Sample::gauge(
        "klipper_extruder_pressure_advance",
        status.extruder.pressure_advance,
        "Klipper extruder pressure advance.",
    ));
    sink.push(Sample::gauge(
        "klipper_extruder_smooth_time",
        status.extruder.smooth_time,
        "Klipper extruder smooth time.",
    ));

    // heater_bed
    sink.push(Sample::gauge(
        "klipper_heater_bed_temperature",
        status.heater_bed.temperature,
        "Klipper heater bed temperature.",
    ));
    sink.push(Sample::gauge(
        "klipper_heater_bed_target",
        status.heater_bed.target,
        "Klipper heater bed target.",
    ));
    sink.push(Sample::gauge(
        "klipper_heater_bed_power",
        status.heater_bed.power,
        "Klipper heater bed power.",
    ));

    // fan
    sink.push(Sample::gauge(
        "klipper_fan_speed",
        status.fan.speed,
        "Klipper fan speed.",
    ));
    sink.push(Sample::gauge(
        "klipper_fan_rpm",
        status.fan.rpm.unwrap_or(0.0),
        "Klipper fan rpm.",
    ));

    // idle_timeout
    sink.push(Sample::counter(
        "klipper_printing_time",
        status.idle_timeout.printing_time,
        "The amount of time the printer has been in the Printing state.",
    ));

    // virtual_sdcard
    sink.push(Sample::counter(
        "klipper_print_file_progress",
        status.virtual_sdcard.progress,
        "The print progress reported as a percentage of the file read.",
    ));
    sink.push(Sample::counter(
        "klipper_print_file_position",
        status.virtual_sdcard.file_position,
        "The current file position in bytes.",
    ));

    // print_stats
    sink.push(Sample::counter(
        "klipper_print_total_duration",
        status.print_stats.total_duration,
        "The total time (in seconds) elapsed since a print has started.",
    ));
    sink.push(Sample::counter(
        "klipper_print_print_duration",
        status.print_stats.print_duration,
        "The total time spent printing (in seconds).",
    ));
    sink.push(Sample::counter(
        "klipper_print_filament_used",
        status.print_stats.filament_used,
        "The amount of filament used during the current print (in mm).",
    ));

    // display_status
    sink.push(Sample::counter(
        "klipper_print_gcode_progress",
        status.display_status.progress,
        "The percentage of print progress, as reported by M73.",
    ));

    // temperature_sensor <name>
    for (raw, sensor) in &status.temperature_sensors {
        let name = sanitize_name(raw);
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_temperature"),
            sensor.temperature,
            format!("The temperature of the {raw} temperature sensor"),
        ));
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_measured_min_temp"),
            sensor.measured_min_temp,
            format!("The measured minimum temperature of the {raw} temperature sensor"),
        ));
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_measured_max_temp"),
            sensor.measured_max_temp,
            format!("The measured maximum temperature of the {raw} temperature sensor"),
        ));
    }

    // temperature_fan <name>
    for (raw, fan) in &status.temperature_fans {
        let name = sanitize_name(raw);
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_speed"),
            fan.speed,
            format!("The speed of the {raw} temperature fan"),
        ));
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_temperature"),
            fan.temperature,
            format!("The temperature of the {raw} temperature fan"),
        ));
        sink.push(Sample::gauge(
            format!("klipper_temperature_sensor_{name}_target"),
            fan.target,
            format!("The target temperature for the {raw} temperature fan"),
        ));
    }

    // output_pin <name>
    for (raw, pin) in &status.output_pins {
        let name = sanitize_name(raw);
        sink.push(Sample::gauge(
            format!("klipper_output_pin_{name}_value"),
            pin.value,
            format!("The value of the {raw} output pin"),
        ));
    }
}
