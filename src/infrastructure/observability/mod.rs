//! Push-based observability
//!
//! Outbound data only, no HTTP server:
//!
//! 1. **Prometheus registry**: rendered to text on demand
//! 2. **Structured JSON logs**: periodic `METRICS_JSON:` lines on stdout
//!
//! **Security**: This system only SENDS data, it never accepts requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
