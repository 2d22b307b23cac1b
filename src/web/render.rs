//! Page rendering
//!
//! The timeline is serialized to JSON and inlined into the page template
//! inside a `<script type="application/json">` element.

use crate::data::Timeline;

/// Page template compiled into the binary
pub const INDEX_TEMPLATE: &str = include_str!("index.html");

/// Placeholder replaced by the timeline JSON
const TIMELINE_PLACEHOLDER: &str = "{{timeline}}";

/// Serializes `timeline` and renders the page.
pub fn render_page(timeline: &Timeline) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(timeline)?;
    Ok(INDEX_TEMPLATE.replacen(TIMELINE_PLACEHOLDER, &escape_script_json(&json), 1))
}

/// Escapes characters that could end the enclosing script element.
///
/// `<`, `>` and `&` only ever occur inside JSON strings, where the `\uXXXX`
/// forms decode to the same text.
fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            c => out.push(c),
        }
    }
    out
}
