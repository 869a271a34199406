//! Prometheus exporter for Klipper 3D printers via the Moonraker API.
//!
//! Each scrape request triggers one collection pass: the enabled modules
//! are fetched from Moonraker's HTTP API, mapped into label-less
//! `klipper_*` samples, and rendered in Prometheus text format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    Moonraker    │<────│    Collector    │<────│   HTTP Server   │
//! │  (printer API)  │────>│   (fetch+map)   │────>│    (/probe)     │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary, optionally with a configuration file:
//!
//! ```bash
//! moonraker-exporter --config config.json5
//! ```
//!
//! then point Prometheus at
//! `/probe?target=<printer>&modules=process_stats,printer_objects`.
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod api;
pub mod client;
pub mod collector;
pub mod config;
pub mod http;
pub mod mapping;
pub mod metrics;

pub use client::{HttpClient, MoonrakerApi};
pub use collector::{Collector, KNOWN_MODULES};
pub use config::ExporterConfig;
pub use http::{AppState, HttpServer};
pub use metrics::{MetricKind, Sample};
