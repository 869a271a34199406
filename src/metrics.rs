//! Metric sample types and Prometheus text exposition rendering.

use std::collections::HashSet;
use std::io::Write;

/// Kind of an emitted metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single metric sample produced by one collection pass.
///
/// Samples carry no labels: per-entity identity (sensor name, interface
/// name) is encoded into the metric name itself, which is what existing
/// dashboards built against this exporter expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Full metric name, always matching `[A-Za-z0-9_]+`.
    pub name: String,
    /// Gauge or counter.
    pub kind: MetricKind,
    /// The measured value.
    pub value: f64,
    /// Human-readable help text. May embed raw upstream identifiers.
    pub help: String,
}

impl Sample {
    /// Create a gauge sample.
    pub fn gauge(name: impl Into<String>, value: f64, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Gauge,
            value,
            help: help.into(),
        }
    }

    /// Create a counter sample.
    pub fn counter(name: impl Into<String>, value: f64, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Counter,
            value,
            help: help.into(),
        }
    }
}

/// Render samples in Prometheus text exposition format.
///
/// Names are sorted for stable output. Samples are label-less, so two
/// samples sharing a name cannot coexist in the output; the first one
/// emitted wins and later ones are dropped. Colliding names only arise
/// when distinct upstream entity names sanitize to the same fragment.
pub fn render(samples: &[Sample]) -> String {
    let mut deduped: Vec<&Sample> = Vec::with_capacity(samples.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(samples.len());
    for sample in samples {
        if seen.insert(sample.name.as_str()) {
            deduped.push(sample);
        }
    }

    deduped.sort_by(|a, b| a.name.cmp(&b.name));

    let mut output = Vec::with_capacity(deduped.len() * 100);
    for sample in deduped {
        writeln!(output, "# HELP {} {}", sample.name, sample.help).ok();
        writeln!(output, "# TYPE {} {}", sample.name, sample.kind.as_str()).ok();
        writeln!(output, "{} {}", sample.name, format_value(sample.value)).ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_constructors() {
        let g = Sample::gauge("klipper_fan_speed", 0.5, "Klipper fan speed.");
        assert_eq!(g.kind, MetricKind::Gauge);
        assert_eq!(g.value, 0.5);

        let c = Sample::counter("klipper_system_uptime", 12.0, "Klipper system uptime.");
        assert_eq!(c.kind, MetricKind::Counter);
    }

    #[test]
    fn test_render_help_and_type() {
        let samples = vec![Sample::gauge(
            "klipper_job_queue_length",
            3.0,
            "Klipper job queue length.",
        )];
        let output = render(&samples);

        assert!(output.contains("# HELP klipper_job_queue_length Klipper job queue length."));
        assert!(output.contains("# TYPE klipper_job_queue_length gauge"));
        assert!(output.contains("klipper_job_queue_length 3\n"));
    }

    #[test]
    fn test_render_sorted_by_name() {
        let samples = vec![
            Sample::gauge("klipper_b", 1.0, "b"),
            Sample::gauge("klipper_a", 2.0, "a"),
        ];
        let output = render(&samples);

        let a = output.find("klipper_a").unwrap();
        let b = output.find("klipper_b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_render_first_sample_wins_on_collision() {
        let samples = vec![
            Sample::gauge("klipper_temperature_sensor_Bed_temperature", 60.0, "Bed!"),
            Sample::gauge("klipper_temperature_sensor_Bed_temperature", 25.0, "Bed?"),
        ];
        let output = render(&samples);

        assert!(output.contains("klipper_temperature_sensor_Bed_temperature 60\n"));
        assert!(!output.contains(" 25"));
        assert_eq!(output.matches("# TYPE").count(), 1);
    }

    #[test]
    fn test_render_counter_type() {
        let samples = vec![Sample::counter(
            "klipper_network_eth0_rx_bytes",
            1024.0,
            "Klipper network received bytes.",
        )];
        let output = render(&samples);
        assert!(output.contains("# TYPE klipper_network_eth0_rx_bytes counter"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(3.14), "3.14");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
