//! Resource-mapping parser.
//!
//! Turns the flat resource DSL into a per-tag list of weighted attachment
//! declarations. Unlike the branch mapping there is no hierarchy here: each
//! line attaches resources to exactly one tag, independent of the tree.
//!
//! ```text
//! resource_line := tag ":" resource_item ("," resource_item)*
//! resource_item := name ["@" strength] [":lowmem"]
//! ```
//!
//! Items may also be separated with `|`, matching the sibling separator of
//! the branch DSL. The `:lowmem` suffix is matched case-insensitively and
//! stripped before the `@strength` split; an absent or unparseable strength
//! falls back to 1.0 rather than failing. Lines without a `:` are skipped.

use super::mapping::{FIELD_SEP, SIBLING_SEP};
use crate::{ResourceSpec, ResourceTable};

const ITEM_SEP: char = ',';

/// Parse the resource-mapping text. Declarations for the same tag across
/// multiple lines accumulate in order, like description fragments do.
pub(crate) fn parse_resources(input: &str) -> ResourceTable {
    let mut table = ResourceTable::default();

    for line in input.lines() {
        let Some((tag, rest)) = line.split_once(FIELD_SEP) else {
            continue;
        };
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }

        let items: Vec<ResourceSpec> =
            rest.split([ITEM_SEP, SIBLING_SEP]).filter_map(parse_item).collect();
        if !items.is_empty() {
            table.entry(tag.to_string()).or_default().extend(items);
        }
    }

    table
}

/// Parse one `name[@strength][:lowmem]` item.
fn parse_item(raw: &str) -> Option<ResourceSpec> {
    let mut item = raw.trim();
    if item.is_empty() {
        return None;
    }

    let mut low_mem = false;
    if let Some(m) = regex!(r"(?i):\s*lowmem\s*$").find(item) {
        low_mem = true;
        item = item[..m.start()].trim_end();
    }

    // Everything after the last `@` is the strength field; the name never
    // re-absorbs an unparseable value.
    let (name, strength) = match item.rsplit_once('@') {
        Some((name, field)) => (name.trim_end(), field.trim().parse::<f32>().unwrap_or(1.0)),
        None => (item, 1.0),
    };
    if name.is_empty() {
        return None;
    }

    Some(ResourceSpec { name: name.to_string(), strength, low_mem })
}
