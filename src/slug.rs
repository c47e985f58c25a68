use std::sync::LazyLock;

use regex::Regex;

/// Everything that is not a word character, whitespace or a hyphen.
static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("slug character class is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Derive the anchor identifier for a heading's display text.
///
/// Lower-cases the text, drops every character outside `[\w\s-]` and joins
/// whitespace runs with a single `-`. Word characters are Unicode-aware, so
/// `"Überblick"` becomes `"überblick"` rather than `"berblick"`.
///
/// The renderer anchors its headings with this same function, which is what
/// keeps outline clicks and rendered headings pointing at each other.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, "-").into_owned()
}
