//! Provenance trace appended to every advisory
//!
//! Rendering is deterministic: sources are grouped by file name in sorted
//! order with de-duplicated, sorted page numbers.

use std::collections::{BTreeMap, BTreeSet};

use shared::{NumericContext, Passage};

pub const TRACE_HEADING: &str = "Advisory trace";

pub const NO_SOURCES_LINE: &str = "No document sources were attached to this answer.";

/// File name -> pages cited from it
pub fn group_sources(passages: &[Passage]) -> BTreeMap<String, BTreeSet<u32>> {
    let mut sources: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    for passage in passages {
        let pages = sources.entry(passage.file_name().to_string()).or_default();
        if let Some(page) = passage.page {
            pages.insert(page);
        }
    }
    sources
}

/// Trace block, starting with a separator so it can be appended directly to
/// the answer text.
pub fn render_trace(numeric: &NumericContext, method: &str, passages: &[Passage]) -> String {
    let mut lines = vec![
        String::new(),
        String::new(),
        "---".to_string(),
        format!("**{}**", TRACE_HEADING),
        String::new(),
        "1. Input".to_string(),
    ];

    match (&numeric.crop, numeric.predicted_yield_t_ha) {
        (Some(crop), Some(value)) => {
            lines.push(format!("   - Crop: `{}`, predicted yield: `{}` t/ha", crop, value))
        }
        (Some(crop), None) => lines.push(format!("   - Crop: `{}`, no yield prediction supplied", crop)),
        (None, Some(value)) => lines.push(format!("   - Predicted yield: `{}` t/ha", value)),
        (None, None) => lines.push("   - No crop or yield prediction supplied".to_string()),
    }
    lines.push(format!("   - Field features considered: {}", numeric.features.len()));

    lines.push(String::new());
    lines.push("2. Retrieval".to_string());
    lines.push(format!("   - {}", method));
    lines.push(format!("   - Passages retrieved: {}", passages.len()));

    lines.push(String::new());
    lines.push("3. Document sources".to_string());
    let sources = group_sources(passages);
    if sources.is_empty() {
        lines.push(format!("   - {}", NO_SOURCES_LINE));
    } else {
        for (file, pages) in &sources {
            if pages.is_empty() {
                lines.push(format!("   - {}", file));
            } else {
                let pages = pages
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("   - {} (pages: {})", file, pages));
            }
        }
    }

    lines.join("\n")
}
