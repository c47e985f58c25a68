use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};

use crate::outline::parse_heading_line;
use crate::slug::slugify;

/// A heading the renderer assigned an identifier to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAnchor {
    pub id: String,
    pub text: String,
}

/// A contiguous slice of the document, drawn as one unit.
///
/// Every section except possibly the first starts with an anchored heading,
/// so scrolling to a section's top brings its heading into view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub range: Range<usize>,
    pub anchor: Option<RenderedAnchor>,
}

/// The document as the content panel draws it, plus the anchors it assigned.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    sections: Vec<Section>,
    texts: Vec<String>,
    fragment_links: Vec<String>,
}

/// A footnote definition block and the label it defines.
struct FootnoteDef {
    label: String,
    range: Range<usize>,
}

impl RenderedDocument {
    /// Split `content` at every top-level ATX heading that CommonMark itself
    /// recognises. Heading-shaped lines inside code blocks, block quotes or
    /// list items are left alone.
    ///
    /// Each section is drawn on its own, so link reference definitions and
    /// the footnotes a section cites are copied in from wherever they live.
    pub fn parse(content: &str) -> Self {
        let parser = Parser::new_ext(content, parser_options());
        let link_defs: Vec<Range<usize>> = parser
            .reference_definitions()
            .iter()
            .map(|(_, def)| def.span.clone())
            .collect();

        let mut sections = Vec::new();
        let mut current = Section {
            range: 0..0,
            anchor: None,
        };
        let mut footnote_defs: Vec<FootnoteDef> = Vec::new();
        // (section index, lower-cased label)
        let mut footnote_refs: Vec<(usize, String)> = Vec::new();
        let mut fragment_links: Vec<String> = Vec::new();

        for (event, range) in parser.into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { .. }) => {
                    let Some(anchor) = anchor_at(content, range.start) else {
                        continue;
                    };
                    current.range.end = range.start;
                    if !current.range.is_empty() || current.anchor.is_some() {
                        sections.push(current);
                    }
                    current = Section {
                        range: range.start..range.start,
                        anchor: Some(anchor),
                    };
                }
                Event::Start(Tag::FootnoteDefinition(label)) => footnote_defs.push(FootnoteDef {
                    label: label.to_lowercase(),
                    range,
                }),
                Event::FootnoteReference(label) => {
                    footnote_refs.push((sections.len(), label.to_lowercase()));
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    if dest_url.starts_with('#') && !fragment_links.iter().any(|l| **l == *dest_url) {
                        fragment_links.push(dest_url.to_string());
                    }
                }
                _ => {}
            }
        }

        current.range.end = content.len();
        if !current.range.is_empty() || current.anchor.is_some() {
            sections.push(current);
        }

        let texts = sections
            .iter()
            .enumerate()
            .map(|(index, section)| {
                let cited: Vec<&str> = footnote_refs
                    .iter()
                    .filter(|(at, _)| *at == index)
                    .map(|(_, label)| label.as_str())
                    .collect();
                let footnotes: Vec<Range<usize>> = footnote_defs
                    .iter()
                    .filter(|def| cited.contains(&def.label.as_str()))
                    .map(|def| def.range.clone())
                    .collect();
                section_source(content, &section.range, &link_defs, &footnotes)
            })
            .collect();

        Self {
            sections,
            texts,
            fragment_links,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Markdown handed to the viewer for section `index`.
    pub fn section_text(&self, index: usize) -> &str {
        self.texts.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Destinations of in-document links (`#...`), in first-seen order.
    pub fn fragment_links(&self) -> &[String] {
        &self.fragment_links
    }

    pub fn anchor(&self, section: usize) -> Option<&RenderedAnchor> {
        self.sections.get(section)?.anchor.as_ref()
    }

    /// Identifiers in document order, duplicates included.
    pub fn anchor_ids(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter_map(|section| section.anchor.as_ref())
            .map(|anchor| anchor.id.as_str())
    }

    /// Index of the first section anchored at `id`.
    pub fn find_anchor(&self, id: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.anchor.as_ref().is_some_and(|a| a.id == id))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// Same extensions the content viewer enables, so both agree on block structure.
fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// The section's own text followed by the outside definitions it may need.
fn section_source(
    content: &str,
    range: &Range<usize>,
    link_defs: &[Range<usize>],
    footnotes: &[Range<usize>],
) -> String {
    let mut text = content[range.clone()].to_string();
    let outside = |def: &&Range<usize>| !contains(range, def);
    let links: Vec<&Range<usize>> = link_defs.iter().filter(outside).collect();
    let notes: Vec<&Range<usize>> = footnotes.iter().filter(outside).collect();
    if links.is_empty() && notes.is_empty() {
        return text;
    }

    if !text.ends_with('\n') {
        text.push('\n');
    }
    for def in links {
        text.push('\n');
        text.push_str(content[def.clone()].trim_end());
    }
    for def in notes {
        text.push_str("\n\n");
        text.push_str(content[def.clone()].trim_end());
    }
    text.push('\n');
    text
}

/// Anchor a heading starting at byte `start`, provided it begins a line and
/// reads as a heading under the outline's line grammar.
fn anchor_at(content: &str, start: usize) -> Option<RenderedAnchor> {
    if start != 0 && !content[..start].ends_with('\n') {
        return None;
    }
    let line = content[start..].lines().next()?;
    let heading = parse_heading_line(line)?;
    Some(RenderedAnchor {
        id: slugify(&heading.text),
        text: heading.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::build_outline;

    #[test]
    fn splits_at_headings() {
        let content = "# Title\n\nSome text\n## Sub Heading\nbody\n";
        let doc = RenderedDocument::parse(content);

        assert_eq!(doc.sections().len(), 2);
        assert_eq!(doc.section_text(0), "# Title\n\nSome text\n");
        assert_eq!(doc.section_text(1), "## Sub Heading\nbody\n");
        assert_eq!(doc.anchor_ids().collect::<Vec<_>>(), vec!["title", "sub-heading"]);
    }

    #[test]
    fn leading_text_gets_an_unanchored_section() {
        let doc = RenderedDocument::parse("intro\n\n# First\n");
        assert_eq!(doc.sections()[0].anchor, None);
        assert_eq!(doc.section_text(0), "intro\n\n");
        assert_eq!(doc.find_anchor("first"), Some(1));
    }

    #[test]
    fn sections_cover_the_whole_text() {
        let content = "pre\n# A\ntext\n```\n# not split\n```\n## B\n";
        let doc = RenderedDocument::parse(content);
        let joined: String = doc.sections().iter().map(|s| &content[s.range.clone()]).collect();
        assert_eq!(joined, content);
        let shown: String = (0..doc.sections().len()).map(|i| doc.section_text(i)).collect();
        assert_eq!(shown, content);
    }

    fn links_in(text: &str) -> Vec<String> {
        Parser::new_ext(text, parser_options())
            .filter_map(|event| match event {
                Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn reference_links_resolve_across_sections() {
        let content = "# A\nSee [docs][d].\n\n# B\n\n[d]: https://example.com\n";
        let doc = RenderedDocument::parse(content);

        assert_eq!(links_in(doc.section_text(0)), vec!["https://example.com"]);
        // The defining section is left as written.
        assert_eq!(doc.section_text(1), "# B\n\n[d]: https://example.com\n");
    }

    #[test]
    fn cited_footnotes_are_copied_into_the_citing_section() {
        let content = "# A\nClaim[^n].\n\n# B\nOther text.\n\n# Notes\n\n[^n]: The source.\n";
        let doc = RenderedDocument::parse(content);

        let defined: Vec<String> = Parser::new_ext(doc.section_text(0), parser_options())
            .filter_map(|event| match event {
                Event::Start(Tag::FootnoteDefinition(label)) => Some(label.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(defined, vec!["n"]);
        assert!(!doc.section_text(1).contains("[^n]"));
        assert_eq!(doc.section_text(2).matches("[^n]:").count(), 1);
    }

    #[test]
    fn collects_fragment_links_from_markdown_structure() {
        let content = "See [install](#install) and [site](https://example.com).\n\n\
                       ~~~\n[skip](#inside-code)\n~~~\n\n\
                       Again [install](#install), then [usage][u].\n\n\
                       [u]: #usage\n";
        let doc = RenderedDocument::parse(content);
        assert_eq!(doc.fragment_links(), ["#install", "#usage"]);
    }

    #[test]
    fn links_to_other_files_are_not_fragment_links() {
        let doc = RenderedDocument::parse("[other](other.md#top)\n");
        assert!(doc.fragment_links().is_empty());
    }

    #[test]
    fn fenced_heading_lines_are_not_anchored() {
        let doc = RenderedDocument::parse("# Real\n\n```sh\n# install deps\n```\n");
        assert_eq!(doc.anchor_ids().collect::<Vec<_>>(), vec!["real"]);
        assert_eq!(doc.find_anchor("install-deps"), None);
    }

    #[test]
    fn quoted_headings_are_not_anchored() {
        let doc = RenderedDocument::parse("> # Quoted\n");
        assert_eq!(doc.anchor_ids().count(), 0);
    }

    #[test]
    fn duplicate_ids_resolve_to_first() {
        let doc = RenderedDocument::parse("## Usage\none\n## Usage\ntwo\n");
        assert_eq!(doc.anchor_ids().count(), 2);
        assert_eq!(doc.find_anchor("usage"), Some(0));
    }

    #[test]
    fn anchors_agree_with_outline() {
        let content = "# Hello, World!\n\n## Step 1: Install\n### `cargo` **build**\n## Überblick\n";
        let outline: Vec<String> = build_outline(content).into_iter().map(|e| e.anchor_id).collect();
        let rendered: Vec<String> = RenderedDocument::parse(content)
            .anchor_ids()
            .map(str::to_owned)
            .collect();
        assert_eq!(outline, rendered);
    }

    #[test]
    fn empty_text_has_no_sections() {
        let doc = RenderedDocument::parse("");
        assert!(doc.is_empty());
        assert_eq!(doc.section_text(0), "");
    }

    #[test]
    fn empty_heading_is_anchored_with_empty_id() {
        let doc = RenderedDocument::parse("#   \ntext\n");
        assert_eq!(doc.anchor_ids().collect::<Vec<_>>(), vec![""]);
        let doc = RenderedDocument::parse("# \ntext\n");
        assert_eq!(doc.anchor_ids().collect::<Vec<_>>(), vec![""]);
        assert_eq!(build_outline("# \ntext\n")[0].anchor_id, "");
    }
}
