#[macro_use]
mod macros;
mod api;
mod engine;

pub use api::{
    Attachment, Context, DescFallback, Options, ResolveDetails, ResolveError, ResolveMode,
    ResolveResult, ResolveResultVerbose, ResourceLocator, RunMetrics, StepKind, WalkStep,
    Weighting, locate_attachments, resolve, resolve_verbose_with, resolve_with,
};

use rand::Rng;
use rand::rngs::StdRng;

// --- Internal types ---------------------------------------------------------

/// A counted, insertion-ordered list of alternatives.
///
/// The mapping DSL encodes sampling weight by literal repetition: a child
/// declared N times under the same parent must be N× as likely as one
/// declared once. Instead of storing N copies, each entry carries a count and
/// `pick` draws a ticket in `0..total` and walks the cumulative counts, which
/// is probability-identical to a uniform draw over the repeated list.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChoiceList {
    entries: Vec<(String, u32)>,
    total: u64,
}

impl ChoiceList {
    /// Record one occurrence of `tag`, preserving first-seen order.
    pub fn push(&mut self, tag: &str) {
        self.total += 1;
        if let Some((_, count)) = self.entries.iter_mut().find(|(t, _)| t == tag) {
            *count += 1;
        } else {
            self.entries.push((tag.to_string(), 1));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded occurrences (duplicates included).
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct alternatives.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == tag)
    }

    /// Draw one alternative, weighted by occurrence count.
    ///
    /// Returns `None` only when the list is empty.
    pub fn pick<'a>(&'a self, rng: &mut StdRng) -> Option<&'a str> {
        if self.entries.is_empty() {
            return None;
        }
        let mut ticket = rng.random_range(0..self.total);
        for (tag, count) in &self.entries {
            let count = u64::from(*count);
            if ticket < count {
                return Some(tag);
            }
            ticket -= count;
        }
        // Unreachable while `total` equals the sum of counts.
        self.entries.last().map(|(t, _)| t.as_str())
    }
}

/// Per-tag description fragments, accumulated across declarations.
#[derive(Debug, Clone, Default)]
pub(crate) struct DescEntry {
    /// Primary fragments (image/caption text).
    pub primary: Vec<String>,
    /// Secondary fragments (motion/video text).
    pub secondary: Vec<String>,
}

/// Build-once tables produced by the branch-mapping parser.
///
/// `children` and `parents` are inverses of each other over the same edge
/// multiset. Both use insertion-ordered maps so that iteration (and therefore
/// root selection under a fixed seed) does not depend on hash order.
#[derive(Debug, Default)]
pub(crate) struct TagTables {
    /// parent tag -> counted list of children.
    pub children: indexmap::IndexMap<String, ChoiceList>,
    /// child tag -> counted list of parents (used for upward backfill).
    pub parents: indexmap::IndexMap<String, ChoiceList>,
    /// Every tag ever seen as a DSL token, with its accumulated descriptions.
    pub descs: indexmap::IndexMap<String, DescEntry>,
}

impl TagTables {
    /// A tag is "known" once it has appeared as any DSL token, even if it
    /// never gained an edge.
    pub fn is_known(&self, tag: &str) -> bool {
        self.descs.contains_key(tag)
    }

    pub fn children_of(&self, tag: &str) -> Option<&ChoiceList> {
        self.children.get(tag).filter(|c| !c.is_empty())
    }

    pub fn parents_of(&self, tag: &str) -> Option<&ChoiceList> {
        self.parents.get(tag).filter(|p| !p.is_empty())
    }

    /// True if `child` is a direct child of `parent` (any multiplicity).
    pub fn is_child_of(&self, parent: &str, child: &str) -> bool {
        self.children.get(parent).is_some_and(|kids| kids.contains(child))
    }

    /// Root set: tags seen in parent position but never as a child, in
    /// first-seen parent order.
    pub fn roots(&self) -> Vec<&str> {
        self.children
            .keys()
            .filter(|tag| !self.parents.contains_key(tag.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// One attachment declaration from the resource-mapping DSL, before weighting.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResourceSpec {
    pub name: String,
    /// Base strength; scaled by the position factor at assembly time.
    pub strength: f32,
    pub low_mem: bool,
}

/// tag -> ordered attachment declarations.
pub(crate) type ResourceTable = indexmap::IndexMap<String, Vec<ResourceSpec>>;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn choice_list_counts_duplicates() {
        let mut list = ChoiceList::default();
        list.push("a");
        list.push("b");
        list.push("a");
        assert_eq!(list.total(), 3);
        assert_eq!(list.distinct(), 2);
        assert!(list.contains("a"));
        assert!(!list.contains("c"));
    }

    #[test]
    fn choice_list_pick_is_weighted() {
        let mut list = ChoiceList::default();
        for _ in 0..3 {
            list.push("heavy");
        }
        list.push("light");

        let mut heavy = 0u32;
        for seed in 0..4000u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            if list.pick(&mut rng) == Some("heavy") {
                heavy += 1;
            }
        }
        // Expected ratio 3/4; allow a generous band for 4000 draws.
        let ratio = f64::from(heavy) / 4000.0;
        assert!((0.70..0.80).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn choice_list_pick_empty_is_none() {
        let list = ChoiceList::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(list.pick(&mut rng), None);
    }

    #[test]
    fn roots_exclude_any_tag_seen_as_child() {
        let mut tables = TagTables::default();
        tables.children.entry("top".to_string()).or_default().push("mid");
        tables.children.entry("mid".to_string()).or_default().push("leaf");
        tables.parents.entry("mid".to_string()).or_default().push("top");
        tables.parents.entry("leaf".to_string()).or_default().push("mid");
        assert_eq!(tables.roots(), vec!["top"]);
    }
}
