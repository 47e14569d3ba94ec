//! Branch-mapping parser.
//!
//! Turns the line-oriented branch DSL into the build-once [`TagTables`]:
//! a counted child adjacency, its parent inverse, and the per-tag
//! description tables.
//!
//! ## Line grammar
//!
//! ```text
//! mapping_line := level (">" level)+
//! level        := token ("|" token)*
//! token        := tag [":" desc1 [":" desc2]]
//! ```
//!
//! A line with no `>` is not part of the mapping and is skipped without
//! comment; authors use such lines as headings and notes. Likewise blank
//! tokens and blank levels are dropped rather than reported. The parser
//! never fails: resolution only needs whatever edges were recoverable.
//!
//! ## Processing contract
//!
//! For the levels `L0 > L1 > … > Lk` of one line:
//!
//! ```text
//! L0: a|b      L1: c       L2: d|e
//!  │ │          │
//!  └─┴──────────┤  every token of Li gains an edge to every
//!               │  token of Li+1 (full bipartite, duplicates kept)
//!               └───────────┬
//!                           d, e
//! ```
//!
//! Every token of every level is registered in the description table the
//! moment it is seen, before any edge is added, so a final-level token with
//! no outgoing edge still owns its description fields.
//!
//! Repetition is weight: the same child token written twice under a parent
//! doubles its selection probability. Edges are therefore stored as counts
//! (see [`ChoiceList`]), never deduplicated away.

use crate::api::DescFallback;
use crate::{ChoiceList, TagTables};

/// Separates the levels of a mapping line.
pub(crate) const LEVEL_SEP: char = '>';
/// Separates sibling tokens within a level.
pub(crate) const SIBLING_SEP: char = '|';
/// Separates tag from its two description fields.
pub(crate) const FIELD_SEP: char = ':';

/// One parsed `tag[:desc1[:desc2]]` token.
#[derive(Debug, Clone)]
struct TokenFields {
    tag: String,
    desc1: Option<String>,
    desc2: Option<String>,
}

impl TokenFields {
    /// Split a raw token into trimmed fields. Absent fields stay `None`;
    /// present-but-empty fields become empty strings (still "present" for
    /// fallback purposes only when non-empty).
    fn parse(raw: &str) -> Option<Self> {
        let mut fields = raw.splitn(3, FIELD_SEP).map(str::trim);
        let tag = fields.next()?.to_string();
        if tag.is_empty() {
            return None;
        }
        let desc1 = fields.next().map(str::to_string);
        let desc2 = fields.next().map(str::to_string);
        Some(TokenFields { tag, desc1, desc2 })
    }
}

/// Parse the full mapping text into [`TagTables`].
///
/// Never fails; malformed lines contribute nothing. Runs in one pass over
/// the input.
pub(crate) fn parse_mapping(input: &str, fallback: DescFallback) -> TagTables {
    let mut tables = TagTables::default();
    let debug = std::env::var_os("BRANCHLING_DEBUG_WALK").is_some();
    let mut edges = 0usize;

    for line in input.lines() {
        if !line.contains(LEVEL_SEP) {
            continue;
        }

        // Blank levels are dropped before pairing, so `a > > b` still
        // connects a to b instead of silently severing the chain.
        let levels: Vec<Vec<TokenFields>> = line
            .split(LEVEL_SEP)
            .map(|level| level.split(SIBLING_SEP).filter_map(TokenFields::parse).collect::<Vec<_>>())
            .filter(|tokens: &Vec<TokenFields>| !tokens.is_empty())
            .collect();

        // Register every token before any edge is added.
        for level in &levels {
            for token in level {
                register(&mut tables, token, fallback);
            }
        }

        for pair in levels.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            for parent in upper {
                let kids = tables.children.entry(parent.tag.clone()).or_default();
                for child in lower {
                    kids.push(&child.tag);
                    edges += 1;
                }
                for child in lower {
                    tables.parents.entry(child.tag.clone()).or_insert_with(ChoiceList::default).push(&parent.tag);
                }
            }
        }
    }

    if debug {
        eprintln!(
            "[mapping] tags={} parents={} edges={} roots={:?}",
            tables.descs.len(),
            tables.children.len(),
            edges,
            tables.roots(),
        );
    }

    tables
}

/// Append a token's description fields to its entry, applying the configured
/// fallback for absent fields. Fragments accumulate across declarations and
/// are never deduplicated.
fn register(tables: &mut TagTables, token: &TokenFields, fallback: DescFallback) {
    let entry = tables.descs.entry(token.tag.clone()).or_default();

    let desc1 = match (&token.desc1, fallback) {
        (Some(d), _) if !d.is_empty() => Some(d.clone()),
        (_, DescFallback::TagName | DescFallback::Cascade) => Some(token.tag.clone()),
        _ => None,
    };
    let desc2 = match (&token.desc2, fallback) {
        (Some(d), _) if !d.is_empty() => Some(d.clone()),
        (_, DescFallback::Cascade) => desc1.clone(),
        _ => None,
    };

    if let Some(d) = desc1 {
        entry.primary.push(d);
    }
    if let Some(d) = desc2 {
        entry.secondary.push(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(input: &str) -> TagTables {
        parse_mapping(input, DescFallback::Empty)
    }

    #[test]
    fn lines_without_level_separator_are_skipped() {
        let t = tables("just a note\n\nroot > leaf\nanother note");
        assert_eq!(t.descs.len(), 2);
        assert!(t.is_child_of("root", "leaf"));
    }

    #[test]
    fn adjacent_levels_connect_fully_bipartite() {
        let t = tables("a|b > c|d > e");
        for parent in ["a", "b"] {
            for child in ["c", "d"] {
                assert!(t.is_child_of(parent, child), "{parent} -> {child}");
            }
        }
        assert!(t.is_child_of("c", "e"));
        assert!(t.is_child_of("d", "e"));
        assert!(!t.is_child_of("a", "e"));
        assert_eq!(t.roots(), vec!["a", "b"]);
    }

    #[test]
    fn repeated_child_tokens_accumulate_weight() {
        let t = tables("root > common|common|common|rare");
        let kids = t.children_of("root").unwrap();
        assert_eq!(kids.total(), 4);
        assert_eq!(kids.distinct(), 2);
    }

    #[test]
    fn duplicate_edges_across_lines_accumulate() {
        let t = tables("root > a\nroot > a\nroot > b");
        assert_eq!(t.children_of("root").unwrap().total(), 3);
        assert_eq!(t.parents_of("a").unwrap().total(), 2);
    }

    #[test]
    fn final_level_tokens_get_descriptions() {
        let t = tables("root:R > leaf:L1:L2");
        let leaf = &t.descs["leaf"];
        assert_eq!(leaf.primary, vec!["L1"]);
        assert_eq!(leaf.secondary, vec!["L2"]);
        assert!(t.children_of("leaf").is_none());
    }

    #[test]
    fn fragments_accumulate_across_declarations_in_order() {
        let t = tables("x:first > y\nx:second:sec > z");
        let x = &t.descs["x"];
        assert_eq!(x.primary, vec!["first", "second"]);
        assert_eq!(x.secondary, vec!["sec"]);
    }

    #[test]
    fn missing_fields_append_nothing_by_default() {
        let t = tables("a > b");
        assert!(t.descs["a"].primary.is_empty());
        assert!(t.descs["b"].secondary.is_empty());
    }

    #[test]
    fn tag_name_fallback_substitutes_absent_primary() {
        let t = parse_mapping("a > b:given", DescFallback::TagName);
        assert_eq!(t.descs["a"].primary, vec!["a"]);
        assert_eq!(t.descs["b"].primary, vec!["given"]);
        assert!(t.descs["b"].secondary.is_empty());
    }

    #[test]
    fn cascade_fallback_fills_both_fields() {
        let t = parse_mapping("a > b:given", DescFallback::Cascade);
        assert_eq!(t.descs["a"].primary, vec!["a"]);
        assert_eq!(t.descs["a"].secondary, vec!["a"]);
        assert_eq!(t.descs["b"].secondary, vec!["given"]);
    }

    #[test]
    fn blank_levels_are_dropped_before_pairing() {
        let t = tables("a > > b");
        assert!(t.is_child_of("a", "b"));
    }

    #[test]
    fn whitespace_is_trimmed_everywhere() {
        let t = tables("  spaced tag : a desc  >  kid : k ");
        assert!(t.is_child_of("spaced tag", "kid"));
        assert_eq!(t.descs["spaced tag"].primary, vec!["a desc"]);
        assert_eq!(t.descs["kid"].primary, vec!["k"]);
    }

    #[test]
    fn same_tag_may_be_root_interior_and_leaf() {
        // "pose" is interior in one branch and a leaf in another.
        let t = tables("hero > pose > shot\nvillain > pose");
        assert!(t.is_child_of("pose", "shot"));
        assert_eq!(t.parents_of("pose").unwrap().total(), 2);
        assert_eq!(t.roots(), vec!["hero", "villain"]);
    }

    #[test]
    fn empty_input_yields_no_roots() {
        let t = tables("");
        assert!(t.roots().is_empty());
        assert!(t.descs.is_empty());
    }
}
