//! Production-friendly observability hooks for turn, fallback, and tool phases.
//!
//! ```rust
//! use gobserve::{MetricsObservabilityHooks, SafeFallbackHooks, TracingObservabilityHooks};
//!
//! let _fallback_hooks = SafeFallbackHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeFallbackHooks, SafeToolHooks, SafeTurnHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeFallbackHooks, SafeToolHooks, SafeTurnHooks,
        TracingObservabilityHooks,
    };
}
