//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod session;
pub mod trace_id;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use session::{require_authenticated, require_mentor, resolve_session};
pub use trace_id::{trace_id, REQUEST_ID_HEADER};
