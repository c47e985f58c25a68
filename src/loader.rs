use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use thiserror::Error;

/// Why a file could not be turned into document text.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Why the path handed over at startup was not opened.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StartupError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("{} is not a markdown file", .0.display())]
    NotMarkdown(PathBuf),
}

/// Text read from disk, with a flag for bytes that were not valid UTF-8.
#[derive(Debug)]
pub struct FileText {
    pub text: String,
    pub had_invalid_utf8: bool,
}

/// Read a whole file as text. Invalid UTF-8 is replaced rather than rejected.
pub fn read_file(path: &Path) -> Result<FileText, LoadError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;

    let text = String::from_utf8_lossy(&bytes);
    let had_invalid_utf8 = matches!(text, std::borrow::Cow::Owned(_));
    Ok(FileText {
        text: text.into_owned(),
        had_invalid_utf8,
    })
}

pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "md" || ext == "markdown"
        })
        .unwrap_or(false)
}

/// Validate a path passed on the command line (or by "open with").
pub fn initial_file(path: PathBuf) -> Result<PathBuf, StartupError> {
    if !path.exists() {
        return Err(StartupError::Missing(path));
    }
    if !is_markdown_file(&path) {
        return Err(StartupError::NotMarkdown(path));
    }
    Ok(path)
}

/// Ask the user for a file. `None` means the dialog was cancelled.
pub fn pick_markdown_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Markdown", &["md", "markdown"])
        .add_filter("Text", &["txt"])
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// A finished read, successful or not.
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub result: Result<FileText, LoadError>,
}

/// Reads files off the UI thread.
///
/// Each request gets its own worker; outcomes arrive in completion order and
/// nothing is cancelled, so whichever read finishes last decides what is shown.
pub struct FileLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    in_flight: usize,
}

impl Default for FileLoader {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }
}

impl FileLoader {
    pub fn request(&mut self, path: PathBuf) {
        log::info!("Loading file: {:?}", path);
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let result = read_file(&path);
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(LoadOutcome { path, result });
        });
    }

    /// Drain every read that has completed since the last poll, without blocking.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let outcomes: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut FileLoader, count: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outcomes = Vec::new();
        while outcomes.len() < count && Instant::now() < deadline {
            outcomes.extend(loader.poll());
            thread::sleep(Duration::from_millis(5));
        }
        outcomes
    }

    #[test]
    fn reads_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "# Title\n").unwrap();

        let file = read_file(&path).unwrap();
        assert_eq!(file.text, "# Title\n");
        assert!(!file.had_invalid_utf8);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        fs::write(&path, b"# Caf\xe9\n").unwrap();

        let file = read_file(&path).unwrap();
        assert_eq!(file.text, "# Caf\u{FFFD}\n");
        assert!(file.had_invalid_utf8);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.md");
        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
        assert!(err.to_string().starts_with("File not found: "));
    }

    #[test]
    fn initial_file_requires_existing_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("README.MD");
        let txt = dir.path().join("notes.txt");
        fs::write(&md, "# Readme").unwrap();
        fs::write(&txt, "notes").unwrap();

        assert_eq!(initial_file(md.clone()), Ok(md));
        assert_eq!(initial_file(txt.clone()), Err(StartupError::NotMarkdown(txt)));
        let missing = dir.path().join("gone.md");
        assert_eq!(initial_file(missing.clone()), Err(StartupError::Missing(missing)));
    }

    #[test]
    fn loader_delivers_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "hello").unwrap();

        let mut loader = FileLoader::default();
        loader.request(path.clone());
        loader.request(dir.path().join("missing.md"));
        assert!(loader.is_busy());

        let outcomes = wait_for(&mut loader, 2);
        assert_eq!(outcomes.len(), 2);
        assert!(!loader.is_busy());

        let ok = outcomes.iter().find(|o| o.path == path).unwrap();
        assert_eq!(ok.result.as_ref().unwrap().text, "hello");
        assert!(outcomes.iter().any(|o| o.result.is_err()));
    }
}
