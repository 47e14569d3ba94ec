use crate::engine::mapping::parse_mapping;
use crate::engine::resources::parse_resources;
use crate::engine::walk::resolve_path;
use crate::engine::weights::assemble;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;

pub use crate::engine::metrics::RunMetrics;
pub use crate::engine::walk::ResolveMode;

/// Resolution context.
///
/// This holds environment needed to reproduce a walk: the seed that drives
/// the per-call random generator.
#[derive(Debug, Clone)]
pub struct Context {
    /// Seed for the walk. `None` draws a fresh seed from OS entropy for
    /// this call only; the drawn value is echoed in [`ResolveResult::seed`].
    pub seed: Option<u64>,
}

impl Default for Context {
    fn default() -> Self {
        if cfg!(test) { Self { seed: Some(42) } } else { Self { seed: None } }
    }
}

/// Positional weighting applied to resource strengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weighting {
    /// Every position gets factor 1.0.
    #[default]
    Uniform,
    /// `(i+1)/n`: grows toward the leaf.
    Depth,
    /// `(n-i)/n`: decays toward the leaf.
    InverseDepth,
}

impl FromStr for Weighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Weighting::Uniform),
            "depth" => Ok(Weighting::Depth),
            "inverse_depth" => Ok(Weighting::InverseDepth),
            other => Err(format!("unknown weighting '{other}' (expected uniform, depth or inverse_depth)")),
        }
    }
}

/// What the mapping parser does with absent description fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescFallback {
    /// Absent fields contribute nothing (the default).
    #[default]
    Empty,
    /// An absent primary description falls back to the tag name.
    TagName,
    /// Each absent field falls back to the one before it:
    /// desc1 ← tag name, desc2 ← desc1.
    Cascade,
}

impl FromStr for DescFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(DescFallback::Empty),
            "tag" | "tag_name" => Ok(DescFallback::TagName),
            "cascade" => Ok(DescFallback::Cascade),
            other => Err(format!("unknown desc fallback '{other}' (expected empty, tag or cascade)")),
        }
    }
}

/// Options that affect resolution and assembly behavior.
#[derive(Debug, Clone)]
pub struct Options {
    /// Joins the deduplicated, normalized tags.
    pub tag_delim: String,
    /// Joins the primary description fragments.
    pub text_delim: String,
    /// Joins the secondary description fragments.
    pub video_delim: String,
    pub weighting: Weighting,
    /// Global multiplier applied on top of the position factor.
    pub weight_scale: f32,
    pub desc_fallback: DescFallback,
    /// Random-draw budget for one walk; exceeding it is treated as a cyclic
    /// mapping and fails closed.
    pub max_steps: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            tag_delim: " ".to_string(),
            text_delim: ", ".to_string(),
            video_delim: ", ".to_string(),
            weighting: Weighting::default(),
            weight_scale: 1.0,
            desc_fallback: DescFallback::default(),
            max_steps: 1000,
        }
    }
}

/// Terminal failure of a single resolution call. Never retried, never
/// recoverable within the call; no partial output is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No requested path segment matched a known tag.
    #[error("no valid start tag among {segments:?}")]
    NoValidStartTag { segments: Vec<String> },
    /// A pinned segment was not a direct child of the previous resolved tag
    /// (hard failure in wildcard-backfill mode only).
    #[error("pinned tag '{tag}' is not a child of '{parent}'")]
    PinnedTagNotChild { tag: String, parent: String },
    /// Empty mapping, or no tag lacks a parent.
    #[error("no root tags found in mapping")]
    NoRootFound,
    /// The walk spent its whole step budget without reaching a leaf.
    #[error("walk exceeded {limit} steps at '{tag}'; mapping is likely cyclic")]
    CyclicDescent { tag: String, limit: usize },
}

/// One weighted resource attachment in walk order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    /// Base strength × position factor × global scale.
    pub strength: f32,
    pub low_mem: bool,
    /// Filesystem path, populated by [`locate_attachments`]; resolution
    /// itself never depends on it.
    pub path: Option<PathBuf>,
}

/// How one position of the resolved sequence was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Drawn uniformly from the root set (free walk).
    Root,
    /// Drawn from a counted parent list while walking upward.
    Backfill,
    /// Required literally by the path request.
    Pinned,
    /// Drawn from a counted child list while walking downward.
    Descent,
}

/// Per-position trace entry, populated by the verbose API.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    pub tag: String,
    pub kind: StepKind,
    /// Occurrence count the draw was made over (1 for pinned positions).
    pub alternatives: u64,
}

/// Result from [`resolve`] and [`resolve_with`].
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// Deduplicated, normalized tags joined with the tag delimiter.
    pub tags: String,
    /// Primary description fragments joined with the text delimiter.
    pub description_1: String,
    /// Secondary description fragments joined with the video delimiter.
    pub description_2: String,
    /// Weighted attachments, one entry per resource per path occurrence.
    pub attachments: Vec<Attachment>,
    /// The raw resolved sequence before dedup/normalization.
    pub sequence: Vec<String>,
    /// The seed that drove this walk (supplied or entropy-drawn).
    pub seed: u64,
    /// Total elapsed time for the call.
    pub elapsed: Duration,
}

/// Additional details returned by [`resolve_verbose_with`].
///
/// Compact by design: enough to see what the walk did and where the time
/// went without dumping internal tables.
#[derive(Debug, Clone)]
pub struct ResolveDetails {
    /// Per-stage timings.
    pub metrics: RunMetrics,
    pub mode: ResolveMode,
    /// One entry per resolved position, in sequence order.
    pub steps: Vec<WalkStep>,
    /// The root set of the parsed mapping.
    pub roots: Vec<String>,
}

/// Result from [`resolve_verbose_with`].
#[derive(Debug, Clone)]
pub struct ResolveResultVerbose {
    pub result: ResolveResult,
    pub details: ResolveDetails,
}

/// External collaborator that maps resource names to filesystem paths.
///
/// Supplied by the host environment; the engine only needs it to fill
/// [`Attachment::path`], never for resolution correctness.
pub trait ResourceLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

impl<F> ResourceLocator for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

/// Fill [`Attachment::path`] on every attachment that the locator knows.
pub fn locate_attachments(result: &mut ResolveResult, locator: &dyn ResourceLocator) {
    for attachment in &mut result.attachments {
        if attachment.path.is_none() {
            attachment.path = locator.locate(&attachment.name);
        }
    }
}

/// Resolve `path` against `mapping` with no resources and default
/// context/options.
///
/// # Example
/// ```
/// use branchling::resolve;
///
/// let out = resolve("root:R1 > childA:A1|childB:B1", "").unwrap();
/// assert!(out.tags.starts_with("root "));
/// ```
pub fn resolve(mapping: &str, path: &str) -> Result<ResolveResult, ResolveError> {
    resolve_with(mapping, "", path, &Context::default(), &Options::default())
}

/// Resolve `path` against `mapping` and `resource_mapping` with the provided
/// `context`/`options`.
///
/// Use this when you want deterministic resolution by supplying a seed.
pub fn resolve_with(
    mapping: &str,
    resource_mapping: &str,
    path: &str,
    context: &Context,
    options: &Options,
) -> Result<ResolveResult, ResolveError> {
    let (result, _) = run(mapping, resource_mapping, path, context, options, false)?;
    Ok(result)
}

/// Resolve with `context`/`options` and return extra (compact) debug details.
///
/// Useful for profiling and mapping debugging. The default [`resolve_with`]
/// path does not allocate the walk trace.
pub fn resolve_verbose_with(
    mapping: &str,
    resource_mapping: &str,
    path: &str,
    context: &Context,
    options: &Options,
) -> Result<ResolveResultVerbose, ResolveError> {
    let (result, details) = run(mapping, resource_mapping, path, context, options, true)?;
    Ok(ResolveResultVerbose { result, details })
}

/// One full invocation: parse both mappings, walk, assemble. All tables are
/// built fresh and dropped when this returns; nothing persists across calls.
fn run(
    mapping: &str,
    resource_mapping: &str,
    path: &str,
    context: &Context,
    options: &Options,
    trace: bool,
) -> Result<(ResolveResult, ResolveDetails), ResolveError> {
    let total_start = Instant::now();

    let stage = Instant::now();
    let tables = parse_mapping(mapping, options.desc_fallback);
    let parse_mapping_elapsed = stage.elapsed();

    let stage = Instant::now();
    let resource_table = parse_resources(resource_mapping);
    let parse_resources_elapsed = stage.elapsed();

    let stage = Instant::now();
    let outcome = resolve_path(&tables, path, context.seed, options.max_steps, trace)?;
    let walk_elapsed = stage.elapsed();

    let stage = Instant::now();
    let assembled = assemble(&outcome.sequence, &tables, &resource_table, options);
    let assemble_elapsed = stage.elapsed();

    let total = total_start.elapsed();
    let details = ResolveDetails {
        metrics: RunMetrics {
            total,
            parse_mapping: parse_mapping_elapsed,
            parse_resources: parse_resources_elapsed,
            walk: walk_elapsed,
            assemble: assemble_elapsed,
        },
        mode: outcome.mode,
        steps: outcome.steps,
        roots: tables.roots().into_iter().map(str::to_string).collect(),
    };
    let result = ResolveResult {
        tags: assembled.tags,
        description_1: assembled.description_1,
        description_2: assembled.description_2,
        attachments: assembled.attachments,
        sequence: outcome.sequence,
        seed: outcome.seed,
        elapsed: total,
    };

    Ok((result, details))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = "root:R1 > childA:A1|childB:B1";

    fn seeded(seed: u64) -> Context {
        Context { seed: Some(seed) }
    }

    #[test]
    fn resolve_with_returns_all_outputs() {
        let res = resolve_with(MAPPING, "", "", &seeded(1), &Options::default()).unwrap();

        assert_eq!(res.seed, 1);
        assert_eq!(res.sequence.len(), 2);
        assert_eq!(res.sequence[0], "root");
        assert!(["childA", "childB"].contains(&res.sequence[1].as_str()));

        let child = res.sequence[1].to_lowercase();
        assert_eq!(res.tags, format!("root {child}"));
        let desc = if child == "childa" { "R1, A1" } else { "R1, B1" };
        assert_eq!(res.description_1, desc);
        assert_eq!(res.description_2, "");
        assert!(res.attachments.is_empty());
        assert!(res.elapsed >= Duration::ZERO);
    }

    #[test]
    fn equal_seeds_produce_byte_identical_outputs() {
        let opts = Options::default();
        let a = resolve_with(MAPPING, "", "", &seeded(99), &opts).unwrap();
        let b = resolve_with(MAPPING, "", "", &seeded(99), &opts).unwrap();
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.description_1, b.description_1);
        assert_eq!(a.description_2, b.description_2);
        assert_eq!(a.sequence, b.sequence);
    }

    #[test]
    fn default_context_is_seeded_under_test() {
        // Mirrors Context::default's cfg(test) branch: repeated calls agree.
        let a = resolve(MAPPING, "").unwrap();
        let b = resolve(MAPPING, "").unwrap();
        assert_eq!(a.sequence, b.sequence);
    }

    #[test]
    fn attachments_flow_through_with_weighting() {
        let resources = "childA: styleA@0.5:lowmem\nchildB: styleB@0.5\nroot: base";
        let opts = Options { weighting: Weighting::Depth, ..Options::default() };
        let res = resolve_with(MAPPING, resources, "", &seeded(1), &opts).unwrap();

        assert_eq!(res.attachments.len(), 2);
        // root sits at position 0 of 2: factor 1/2.
        assert_eq!(res.attachments[0].name, "base");
        assert_eq!(res.attachments[0].strength, 0.5);
        // the child sits at position 1 of 2: factor 2/2.
        assert_eq!(res.attachments[1].strength, 0.5);
    }

    #[test]
    fn locator_populates_attachment_paths() {
        let mut res =
            resolve_with(MAPPING, "root: base", "", &seeded(1), &Options::default()).unwrap();
        let locator = |name: &str| {
            (name == "base").then(|| PathBuf::from("/models/base.safetensors"))
        };
        locate_attachments(&mut res, &locator);
        assert_eq!(res.attachments[0].path.as_deref(), Some(std::path::Path::new("/models/base.safetensors")));
    }

    #[test]
    fn verbose_includes_trace_and_metrics() {
        let res = resolve_verbose_with(MAPPING, "", "*/childA", &seeded(5), &Options::default()).unwrap();
        assert_eq!(res.details.mode, ResolveMode::Backfill);
        assert_eq!(res.details.steps.len(), res.result.sequence.len());
        assert_eq!(res.details.roots, vec!["root"]);
        assert!(res.details.metrics.total >= res.details.metrics.walk);
    }

    #[test]
    fn failures_surface_the_offending_fragment() {
        let err = resolve(MAPPING, "unknown/only").unwrap_err();
        assert_eq!(err.to_string(), "no valid start tag among [\"unknown\", \"only\"]");

        let err = resolve("", "").unwrap_err();
        assert_eq!(err, ResolveError::NoRootFound);
    }

    #[test]
    fn weighting_and_fallback_parse_from_str() {
        assert_eq!("depth".parse::<Weighting>().unwrap(), Weighting::Depth);
        assert_eq!("inverse_depth".parse::<Weighting>().unwrap(), Weighting::InverseDepth);
        assert!("steep".parse::<Weighting>().is_err());
        assert_eq!("cascade".parse::<DescFallback>().unwrap(), DescFallback::Cascade);
        assert!("loud".parse::<DescFallback>().is_err());
    }
}
