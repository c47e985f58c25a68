use crate::render::RenderedDocument;

/// How the viewport should move to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Animated over several frames.
    Smooth,
    Instant,
}

/// A pending request to bring a rendered section to the top of the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    pub section: usize,
    pub behavior: ScrollBehavior,
}

/// Resolves anchor identifiers against the rendered document and hands the
/// resulting scroll to the content panel on its next paint.
#[derive(Debug, Default)]
pub struct NavigationController {
    rendered: RenderedDocument,
    pending: Option<ScrollRequest>,
}

impl NavigationController {
    /// Swap in a freshly rendered document. Any scroll aimed at the old one is dropped.
    pub fn set_document(&mut self, rendered: RenderedDocument) {
        self.rendered = rendered;
        self.pending = None;
    }

    pub fn document(&self) -> &RenderedDocument {
        &self.rendered
    }

    /// Scroll smoothly to the first section anchored at `anchor_id`.
    ///
    /// Unknown identifiers are ignored.
    pub fn navigate_to(&mut self, anchor_id: &str) {
        match self.rendered.find_anchor(anchor_id) {
            Some(section) => {
                let heading = self.rendered.anchor(section).map(|a| a.text.as_str());
                log::debug!("Navigating to #{} {:?} (section {})", anchor_id, heading, section);
                self.pending = Some(ScrollRequest {
                    section,
                    behavior: ScrollBehavior::Smooth,
                });
            }
            None => log::debug!("No rendered heading with id {:?}", anchor_id),
        }
    }

    /// Jump straight to the top of the document, e.g. after loading a new file.
    pub fn reset_to_top(&mut self) {
        self.pending = (!self.rendered.is_empty()).then_some(ScrollRequest {
            section: 0,
            behavior: ScrollBehavior::Instant,
        });
    }

    /// Consume the pending scroll, if any.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(content: &str) -> NavigationController {
        let mut nav = NavigationController::default();
        nav.set_document(RenderedDocument::parse(content));
        nav
    }

    #[test]
    fn known_anchor_queues_smooth_scroll() {
        let mut nav = controller("intro\n# Title\n## Sub Heading\n");
        nav.navigate_to("sub-heading");
        assert_eq!(
            nav.take_scroll_request(),
            Some(ScrollRequest {
                section: 2,
                behavior: ScrollBehavior::Smooth
            })
        );
        assert_eq!(nav.take_scroll_request(), None);
    }

    #[test]
    fn unknown_anchor_is_a_no_op() {
        let mut nav = controller("# Title\n");
        nav.navigate_to("missing");
        assert_eq!(nav.take_scroll_request(), None);
    }

    #[test]
    fn miss_keeps_earlier_request() {
        let mut nav = controller("# Title\n");
        nav.navigate_to("title");
        nav.navigate_to("missing");
        assert_eq!(nav.take_scroll_request().map(|r| r.section), Some(0));
    }

    #[test]
    fn duplicate_anchor_targets_first_occurrence() {
        let mut nav = controller("## Usage\na\n## Other\n## Usage\nb\n");
        nav.navigate_to("usage");
        assert_eq!(nav.take_scroll_request().map(|r| r.section), Some(0));
    }

    #[test]
    fn fenced_heading_cannot_be_navigated_to() {
        let mut nav = controller("# Real\n```\n# fake\n```\n");
        nav.navigate_to("fake");
        assert_eq!(nav.take_scroll_request(), None);
    }

    #[test]
    fn new_document_drops_pending_scroll() {
        let mut nav = controller("# Title\n");
        nav.navigate_to("title");
        nav.set_document(RenderedDocument::parse("# Title\n"));
        assert_eq!(nav.take_scroll_request(), None);
    }

    #[test]
    fn navigating_empty_document_does_nothing() {
        let mut nav = NavigationController::default();
        nav.navigate_to("");
        nav.reset_to_top();
        assert_eq!(nav.take_scroll_request(), None);
    }

    #[test]
    fn reset_to_top_is_instant() {
        let mut nav = controller("# Title\n");
        nav.reset_to_top();
        assert_eq!(
            nav.take_scroll_request().map(|r| r.behavior),
            Some(ScrollBehavior::Instant)
        );
    }
}
