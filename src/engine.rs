//! Parsing, walking and assembly engine.
//!
//! This module is the *internal entry point* for the branching-wildcard
//! engine. The public surface lives in `src/api.rs`; everything here is
//! consumed through `api::run`.
//!
//! ## How the parts work together
//!
//! One resolution call is a straight-line pipeline:
//!
//! ```text
//! mapping text ──── parse_mapping ──────┐      (mapping.rs)
//!                                       │
//! resource text ── parse_resources ─────┼──┐   (resources.rs)
//!                                       │  │
//! path + seed ──── resolve_path ◀───────┘  │   (walk.rs)
//!                     │ one concrete       │
//!                     │ tag sequence       │
//!                     ▼                    │
//!                  assemble ◀──────────────┘   (weights.rs)
//!                     │
//!                     ▼
//!      tags / description_1 / description_2 / attachments
//! ```
//!
//! Every table is built fresh per call and dropped afterwards; there is no
//! cross-invocation state, which keeps concurrent callers isolated for free.
//!
//! ## Responsibilities by module
//!
//! - `mapping.rs`: branch DSL → counted child/parent adjacency + the two
//!   description tables.
//! - `resources.rs`: resource DSL → per-tag weighted attachment lists.
//! - `walk.rs`: the three resolution modes over a fresh seeded generator,
//!   bounded by a step budget.
//! - `weights.rs`: position factors, strength scaling, dedup/normalize/join.
//! - `metrics.rs`: per-stage timing surfaced by the verbose API.
//!
//! ## Debugging
//!
//! Set `BRANCHLING_DEBUG_WALK=1` to print table summaries and every draw.

#[path = "engine/mapping.rs"]
pub(crate) mod mapping;
#[path = "engine/metrics.rs"]
pub(crate) mod metrics;
#[path = "engine/resources.rs"]
pub(crate) mod resources;
#[path = "engine/walk.rs"]
pub(crate) mod walk;
#[path = "engine/weights.rs"]
pub(crate) mod weights;
