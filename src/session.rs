use std::path::{Path, PathBuf};

use crate::loader::{LoadError, LoadOutcome};
use crate::outline::{OutlineBuilder, OutlineEntry};

/// What is currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    /// Nothing has been loaded yet.
    Empty,
    /// Text is displayed. A failed read still lands here, with an error page as text.
    Loaded { raw_text: String, source: PathBuf },
}

/// The displayed document and its outline.
///
/// Loads replace the text and source together; there is no way back to
/// [`DocumentState::Empty`].
#[derive(Debug)]
pub struct DocumentSession {
    state: DocumentState,
    outline: OutlineBuilder,
    revision: u64,
    load_failed: bool,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self {
            state: DocumentState::Empty,
            outline: OutlineBuilder::default(),
            revision: 0,
            load_failed: false,
        }
    }
}

/// Markdown shown in place of a file that could not be read.
pub fn error_document(err: &LoadError) -> String {
    format!("# Error\n\nFailed to load file: {}", err)
}

impl DocumentSession {
    /// Apply a finished read. Failures become an error page; the attempted
    /// path is kept as the source either way.
    pub fn apply(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { path, result } = outcome;
        let load_failed = result.is_err();
        let raw_text = match result {
            Ok(file) => {
                if file.had_invalid_utf8 {
                    log::warn!("File {:?} contains invalid UTF-8", path);
                }
                file.text
            }
            Err(e) => {
                log::error!("Failed to load file {:?}: {}", path, e);
                error_document(&e)
            }
        };
        self.replace(raw_text, path);
        self.load_failed = load_failed;
    }

    /// Show `raw_text` as the content of `source`.
    pub fn replace(&mut self, raw_text: String, source: PathBuf) {
        self.outline.build(&raw_text);
        self.state = DocumentState::Loaded { raw_text, source };
        self.load_failed = false;
        self.revision += 1;
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, DocumentState::Loaded { .. })
    }

    /// Whether the displayed text is an error page rather than the file's content.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn raw_text(&self) -> Option<&str> {
        match &self.state {
            DocumentState::Loaded { raw_text, .. } => Some(raw_text.as_str()),
            DocumentState::Empty => None,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        match &self.state {
            DocumentState::Loaded { source, .. } => Some(source.as_path()),
            DocumentState::Empty => None,
        }
    }

    /// Final component of the source path, for titles and labels.
    pub fn file_name(&self) -> Option<String> {
        self.source()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }

    pub fn outline(&self) -> &[OutlineEntry] {
        self.outline.entries()
    }

    /// Bumped on every load, including reloads of identical text.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
