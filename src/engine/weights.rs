//! Positional weighting and output assembly.
//!
//! The resolved sequence is the walk in occurrence order; this module turns
//! it into the five emitted values:
//!
//! ```text
//! sequence ──┬─ dedup (first-seen) ─ normalize ─ join ──▶ tags
//!            ├─ dedup ─ primary fragments ─ join ───────▶ description_1
//!            ├─ dedup ─ secondary fragments ─ join ─────▶ description_2
//!            └─ per OCCURRENCE ─ factor(i, n) × scale ──▶ attachments
//! ```
//!
//! Attachments are scaled per path occurrence: a tag visited twice yields
//! two scaled entries, one per position. The human-readable strings dedupe
//! instead, so revisits do not repeat in the prompt text.

use crate::api::{Attachment, Options, Weighting};
use crate::{ResourceTable, TagTables};

/// Scalar factor for position `index` in a sequence of `len` tags, before
/// the global scale is applied.
///
/// `depth` grows toward the leaf, `inverse_depth` decays toward it; both
/// stay in (0, 1] for any non-empty sequence.
pub(crate) fn position_factor(mode: Weighting, index: usize, len: usize) -> f32 {
    match mode {
        Weighting::Uniform => 1.0,
        Weighting::Depth => (index + 1) as f32 / len as f32,
        Weighting::InverseDepth => (len - index) as f32 / len as f32,
    }
}

/// Lowercase and replace spaces, the only normalization applied to tags and
/// only at output time.
pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace(' ', "_")
}

#[derive(Debug, Clone)]
pub(crate) struct Assembled {
    pub tags: String,
    pub description_1: String,
    pub description_2: String,
    pub attachments: Vec<Attachment>,
}

/// Assemble the emitted values from a resolved sequence.
pub(crate) fn assemble(
    sequence: &[String],
    tables: &TagTables,
    resources: &ResourceTable,
    options: &Options,
) -> Assembled {
    let n = sequence.len();

    // Every occurrence contributes its own scaled attachment entries.
    let mut attachments = Vec::new();
    for (index, tag) in sequence.iter().enumerate() {
        let Some(specs) = resources.get(tag) else {
            continue;
        };
        let factor = position_factor(options.weighting, index, n) * options.weight_scale;
        for spec in specs {
            attachments.push(Attachment {
                name: spec.name.clone(),
                strength: spec.strength * factor,
                low_mem: spec.low_mem,
                path: None,
            });
        }
    }

    // The string outputs dedupe to first-seen order.
    let mut unique: Vec<&str> = Vec::with_capacity(n);
    for tag in sequence {
        if !unique.contains(&tag.as_str()) {
            unique.push(tag);
        }
    }

    let tags =
        unique.iter().map(|t| normalize_tag(t)).collect::<Vec<_>>().join(&options.tag_delim);

    let mut primary: Vec<&str> = Vec::new();
    let mut secondary: Vec<&str> = Vec::new();
    for tag in &unique {
        if let Some(entry) = tables.descs.get(*tag) {
            primary.extend(entry.primary.iter().map(String::as_str));
            secondary.extend(entry.secondary.iter().map(String::as_str));
        }
    }
    let description_1 = primary.join(&options.text_delim);
    let description_2 = secondary.join(&options.video_delim);

    Assembled { tags, description_1, description_2, attachments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DescFallback;
    use crate::engine::mapping::parse_mapping;
    use crate::engine::resources::parse_resources;

    fn seq(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn factor_modes_match_their_formulas() {
        assert_eq!(position_factor(Weighting::Uniform, 0, 4), 1.0);
        assert_eq!(position_factor(Weighting::Uniform, 3, 4), 1.0);
        assert_eq!(position_factor(Weighting::Depth, 0, 4), 0.25);
        assert_eq!(position_factor(Weighting::Depth, 3, 4), 1.0);
        assert_eq!(position_factor(Weighting::InverseDepth, 0, 4), 1.0);
        assert_eq!(position_factor(Weighting::InverseDepth, 3, 4), 0.25);
    }

    #[test]
    fn factors_stay_in_unit_interval() {
        for n in 1..20 {
            for i in 0..n {
                for mode in [Weighting::Depth, Weighting::InverseDepth] {
                    let f = position_factor(mode, i, n);
                    assert!(f > 0.0 && f <= 1.0, "{mode:?} i={i} n={n} -> {f}");
                }
            }
        }
    }

    #[test]
    fn normalization_lowercases_and_underscores() {
        assert_eq!(normalize_tag("Wide Shot"), "wide_shot");
        assert_eq!(normalize_tag("leaf"), "leaf");
    }

    #[test]
    fn depth_scaling_matches_the_worked_example() {
        // mapping `p1 | p2 > c:C1`, resource `c: lora@0.5`, depth mode,
        // n=2 with c at position 1 -> strength 0.5 * (2/2) * scale.
        let tables = parse_mapping("p1|p2 > c:C1", DescFallback::Empty);
        let resources = parse_resources("c: lora@0.5");
        let options =
            Options { weighting: Weighting::Depth, weight_scale: 2.0, ..Options::default() };

        let out = assemble(&seq(&["p1", "c"]), &tables, &resources, &options);
        assert_eq!(out.attachments.len(), 1);
        assert_eq!(out.attachments[0].name, "lora");
        assert_eq!(out.attachments[0].strength, 0.5 * 1.0 * 2.0);
    }

    #[test]
    fn occurrences_scale_independently_but_strings_dedupe() {
        let tables = parse_mapping("a:A > b:B\nb > a", DescFallback::Empty);
        let resources = parse_resources("a: lora@1.0");
        let options = Options { weighting: Weighting::Depth, ..Options::default() };

        // "a" appears at positions 0 and 2 of a 3-long walk.
        let out = assemble(&seq(&["a", "b", "a"]), &tables, &resources, &options);
        assert_eq!(out.attachments.len(), 2);
        assert_eq!(out.attachments[0].strength, 1.0 / 3.0);
        assert_eq!(out.attachments[1].strength, 3.0 / 3.0);

        assert_eq!(out.tags, "a b");
        assert_eq!(out.description_1, "A, B");
    }

    #[test]
    fn description_join_round_trip() {
        let tables = parse_mapping("solo:a > x\nsolo:b > x", DescFallback::Empty);
        let out = assemble(
            &seq(&["solo"]),
            &tables,
            &ResourceTable::default(),
            &Options::default(),
        );
        assert_eq!(out.description_1, "a, b");
    }

    #[test]
    fn tags_without_resources_emit_no_attachments() {
        let tables = parse_mapping("a > b", DescFallback::Empty);
        let out = assemble(
            &seq(&["a", "b"]),
            &tables,
            &ResourceTable::default(),
            &Options::default(),
        );
        assert!(out.attachments.is_empty());
        assert_eq!(out.tags, "a b");
        assert_eq!(out.description_1, "");
    }

    #[test]
    fn custom_delimiters_are_honored() {
        let tables = parse_mapping("Big Tag:one:move > Leaf:two:zoom", DescFallback::Empty);
        let options = Options {
            tag_delim: ", ".to_string(),
            text_delim: " / ".to_string(),
            video_delim: "; ".to_string(),
            ..Options::default()
        };
        let out = assemble(&seq(&["Big Tag", "Leaf"]), &tables, &ResourceTable::default(), &options);
        assert_eq!(out.tags, "big_tag, leaf");
        assert_eq!(out.description_1, "one / two");
        assert_eq!(out.description_2, "move; zoom");
    }
}
