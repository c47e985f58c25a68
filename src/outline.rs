use std::sync::LazyLock;

use regex::Regex;

use crate::slug::slugify;

/// One to six `#` markers, one whitespace character, then the rest of the line (possibly empty).
static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s(.*)$").expect("heading pattern is valid"));

/// Horizontal indent per heading level in the outline sidebar, in points.
const INDENT_PER_LEVEL: f32 = 12.0;

/// A heading line found in the raw markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRecord {
    /// Number of leading `#` markers, always in `1..=6`.
    pub level: u8,
    /// Display text with the markers and surrounding whitespace removed. May be empty.
    pub text: String,
}

/// Parse a single physical line as a heading.
///
/// Only lines whose very first character is `#` qualify; indented headings,
/// runs of seven or more markers and `#text` without a separating space are
/// rejected.
pub fn parse_heading_line(line: &str) -> Option<HeadingRecord> {
    let caps = HEADING_LINE.captures(line)?;
    Some(HeadingRecord {
        level: caps[1].len() as u8,
        text: caps[2].trim().to_string(),
    })
}

/// Collect every heading-shaped line in document order.
///
/// Fenced code blocks are not tracked: a `# comment` line inside a fence is
/// reported like any other heading.
pub fn extract_headings(content: &str) -> Vec<HeadingRecord> {
    content.lines().filter_map(parse_heading_line).collect()
}

/// A heading together with the anchor identifier used to navigate to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
    pub anchor_id: String,
}

impl From<HeadingRecord> for OutlineEntry {
    fn from(heading: HeadingRecord) -> Self {
        let anchor_id = slugify(&heading.text);
        Self {
            level: heading.level,
            text: heading.text,
            anchor_id,
        }
    }
}

impl OutlineEntry {
    /// Left padding for this entry in the sidebar; top-level headings sit flush.
    pub fn indent(&self) -> f32 {
        f32::from(self.level.saturating_sub(1)) * INDENT_PER_LEVEL
    }
}

/// Build the flat, level-tagged outline for `content`.
pub fn build_outline(content: &str) -> Vec<OutlineEntry> {
    extract_headings(content)
        .into_iter()
        .map(OutlineEntry::from)
        .collect()
}

/// Outline memoized against the exact text it was built from.
#[derive(Debug, Default)]
pub struct OutlineBuilder {
    source: Option<String>,
    entries: Vec<OutlineEntry>,
}

impl OutlineBuilder {
    /// Return the outline for `content`, rebuilding it from scratch only when
    /// the text differs from the previous call.
    pub fn build(&mut self, content: &str) -> &[OutlineEntry] {
        if self.source.as_deref() != Some(content) {
            self.entries = build_outline(content);
            self.source = Some(content.to_owned());
            log::debug!("Rebuilt outline: {} entries", self.entries.len());
        }
        &self.entries
    }

    /// The most recently built outline (empty before the first build).
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }
}

/// User-facing state of the outline sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlinePanel {
    open: bool,
}

impl Default for OutlinePanel {
    fn default() -> Self {
        Self { open: true }
    }
}

impl OutlinePanel {
    /// The toggle control only exists when there is something to show.
    pub fn toggle_available(entries: &[OutlineEntry]) -> bool {
        !entries.is_empty()
    }

    pub fn is_visible(&self, entries: &[OutlineEntry]) -> bool {
        self.open && Self::toggle_available(entries)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }
}
