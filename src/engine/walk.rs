//! Seeded path resolution.
//!
//! This module is the operational core of the engine: given the parsed
//! [`TagTables`] and a raw path request, it produces one concrete ordered
//! tag sequence. Three mutually exclusive modes are selected by inspecting
//! the request:
//!
//! ```text
//! "*/leaf/..."   wildcard-backfill   walk UP from the first pinned tag to a
//!                                    root, then require the remaining pins
//!                                    as direct children, then descend
//! "a/b/..."      forward-pinned      skip leading unknowns, commit segments
//!                                    while each is a known direct child of
//!                                    the previous, soft-stop on the first
//!                                    break, then descend
//! ""             free walk           draw a root uniformly, then descend
//! ```
//!
//! All modes share the same downward descent: at each step the next tag is
//! drawn from the parent's counted child list with probability proportional
//! to its declaration count, stopping at the first leaf.
//!
//! The generator is a fresh `StdRng` seeded per call — never a process-wide
//! singleton — so identical inputs plus an explicit seed replay the exact
//! sequence of draws. When no seed is supplied one is drawn from OS entropy
//! and echoed back in the outcome so the run can be reproduced afterwards.
//!
//! The walk spends from a step budget on every random draw (descent and
//! backfill alike). A cyclic mapping would otherwise never reach a leaf;
//! exhausting the budget fails closed with [`ResolveError::CyclicDescent`].
//!
//! Set `BRANCHLING_DEBUG_WALK=1` to print each draw.

use crate::{ResolveError, StepKind, TagTables, WalkStep};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First path segment that requests backfill mode.
pub(crate) const WILDCARD: &str = "*";
/// Separates segments of a path request.
pub(crate) const PATH_SEP: char = '/';

/// How the resolver interpreted the path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// `*`-led request: upward backfill, pinned tail, downward descent.
    Backfill,
    /// Committed forward prefix, then downward descent.
    ForwardPinned,
    /// No usable segments: random root, then downward descent.
    FreeWalk,
}

impl ResolveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolveMode::Backfill => "wildcard-backfill",
            ResolveMode::ForwardPinned => "forward-pinned",
            ResolveMode::FreeWalk => "free-walk",
        }
    }
}

/// A fully resolved walk.
#[derive(Debug, Clone)]
pub(crate) struct WalkOutcome {
    /// The concrete tag sequence, root-to-leaf in walk order.
    pub sequence: Vec<String>,
    pub mode: ResolveMode,
    /// Per-position trace; populated only when tracing is requested.
    pub steps: Vec<WalkStep>,
    /// The seed that actually drove the generator.
    pub seed: u64,
}

/// Resolve `path` against `tables`.
///
/// `seed: None` draws a fresh seed from OS entropy for this call only.
/// `trace` controls whether [`WalkOutcome::steps`] is populated; the fast
/// path skips it.
pub(crate) fn resolve_path(
    tables: &TagTables,
    path: &str,
    seed: Option<u64>,
    max_steps: usize,
    trace: bool,
) -> Result<WalkOutcome, ResolveError> {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let mut walker = Walker {
        tables,
        rng: StdRng::seed_from_u64(seed),
        remaining: max_steps,
        limit: max_steps,
        steps: Vec::new(),
        trace,
        debug: std::env::var_os("BRANCHLING_DEBUG_WALK").is_some(),
    };

    let segments: Vec<&str> = path.split(PATH_SEP).map(str::trim).filter(|s| !s.is_empty()).collect();

    let (mode, sequence) = if segments.is_empty() {
        (ResolveMode::FreeWalk, walker.free_walk()?)
    } else if segments[0] == WILDCARD {
        (ResolveMode::Backfill, walker.backfill(&segments[1..])?)
    } else {
        (ResolveMode::ForwardPinned, walker.forward(&segments)?)
    };

    if walker.debug {
        eprintln!("[walk] mode={} seed={} sequence={:?}", mode.as_str(), seed, sequence);
    }

    Ok(WalkOutcome { sequence, mode, steps: walker.steps, seed })
}

struct Walker<'a> {
    tables: &'a TagTables,
    rng: StdRng,
    /// Budget left for random draws; fails closed at zero.
    remaining: usize,
    limit: usize,
    steps: Vec<WalkStep>,
    trace: bool,
    debug: bool,
}

impl Walker<'_> {
    /// Mode 3: draw a root uniformly over the distinct root set and descend.
    fn free_walk(&mut self) -> Result<Vec<String>, ResolveError> {
        let roots = self.tables.roots();
        if roots.is_empty() {
            return Err(ResolveError::NoRootFound);
        }
        let root = roots[self.rng.random_range(0..roots.len())].to_string();
        self.record(&root, StepKind::Root, roots.len() as u64);

        let mut sequence = vec![root];
        self.descend(&mut sequence)?;
        Ok(sequence)
    }

    /// Mode 2: skip leading unknown segments, then commit segments while each
    /// is a known direct child of the previous accepted one. The first
    /// violation is a soft stop, not a failure.
    fn forward(&mut self, segments: &[&str]) -> Result<Vec<String>, ResolveError> {
        let start = segments
            .iter()
            .position(|t| self.tables.is_known(t))
            .ok_or_else(|| ResolveError::NoValidStartTag {
                segments: segments.iter().map(|s| s.to_string()).collect(),
            })?;

        let mut sequence: Vec<String> = Vec::new();
        for tag in &segments[start..] {
            if !self.tables.is_known(tag) {
                break;
            }
            if let Some(prev) = sequence.last() {
                if !self.tables.is_child_of(prev, tag) {
                    break;
                }
            }
            self.record(tag, StepKind::Pinned, 1);
            sequence.push(tag.to_string());
        }

        self.descend(&mut sequence)?;
        Ok(sequence)
    }

    /// Mode 1: walk upward from the first pinned tag to a parentless tag,
    /// then require every further pinned segment to be a direct child of the
    /// running tail (hard failure otherwise), then descend.
    fn backfill(&mut self, pins: &[&str]) -> Result<Vec<String>, ResolveError> {
        let pinned: Vec<&str> = pins.iter().copied().filter(|t| self.tables.is_known(t)).collect();
        let Some(&anchor) = pinned.first() else {
            return Err(ResolveError::NoValidStartTag {
                segments: pins.iter().map(|s| s.to_string()).collect(),
            });
        };

        // Built leaf-to-root, reversed afterwards.
        let mut upward: Vec<(String, StepKind, u64)> = vec![(anchor.to_string(), StepKind::Pinned, 1)];
        let mut cur = anchor.to_string();
        while let Some(parents) = self.tables.parents_of(&cur) {
            self.spend(&cur)?;
            let parent = parents.pick(&mut self.rng).unwrap_or(&cur).to_string();
            if self.debug {
                eprintln!("[walk:backfill] below=\"{cur}\" alternatives={} -> \"{parent}\"", parents.total());
            }
            upward.push((parent.clone(), StepKind::Backfill, parents.total()));
            cur = parent;
        }
        upward.reverse();

        let mut sequence: Vec<String> = Vec::with_capacity(upward.len());
        for (tag, kind, alternatives) in upward {
            self.record(&tag, kind, alternatives);
            sequence.push(tag);
        }

        for tag in &pinned[1..] {
            let tail = sequence.last().expect("backfill prefix is never empty");
            if !self.tables.is_child_of(tail, tag) {
                return Err(ResolveError::PinnedTagNotChild {
                    tag: tag.to_string(),
                    parent: tail.clone(),
                });
            }
            self.record(tag, StepKind::Pinned, 1);
            sequence.push(tag.to_string());
        }

        self.descend(&mut sequence)?;
        Ok(sequence)
    }

    /// Shared tail behavior: weighted draws down the counted child lists
    /// until the first leaf.
    fn descend(&mut self, sequence: &mut Vec<String>) -> Result<(), ResolveError> {
        let Some(mut cur) = sequence.last().cloned() else {
            return Ok(());
        };
        while let Some(kids) = self.tables.children_of(&cur) {
            self.spend(&cur)?;
            let next = kids.pick(&mut self.rng).unwrap_or(&cur).to_string();
            if self.debug {
                eprintln!("[walk:descend] from=\"{cur}\" alternatives={} -> \"{next}\"", kids.total());
            }
            self.record(&next, StepKind::Descent, kids.total());
            sequence.push(next.clone());
            cur = next;
        }
        Ok(())
    }

    fn spend(&mut self, at: &str) -> Result<(), ResolveError> {
        if self.remaining == 0 {
            return Err(ResolveError::CyclicDescent { tag: at.to_string(), limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }

    fn record(&mut self, tag: &str, kind: StepKind, alternatives: u64) {
        if self.trace {
            self.steps.push(WalkStep { tag: tag.to_string(), kind, alternatives });
        }
    }
}
