//! Run metrics.
//!
//! Per-stage timings for one resolution call. Intentionally simple and
//! opt-in: the fast path ([`crate::resolve_with`]) computes them anyway
//! (they are four `Instant` reads) but only the verbose API surfaces them.

use std::time::Duration;

/// Stage timings for a single resolution call.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for the call.
    pub total: Duration,
    /// Branch-mapping parse.
    pub parse_mapping: Duration,
    /// Resource-mapping parse.
    pub parse_resources: Duration,
    /// Seeded walk (any of the three modes).
    pub walk: Duration,
    /// Weighting, dedup and joining.
    pub assemble: Duration,
}
