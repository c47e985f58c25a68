#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod loader;
mod navigation;
mod outline;
mod render;
mod session;
mod slug;
mod watcher;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use crate::app::ViewerApp;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "md-outline-viewer")]
#[command(about = "A markdown viewer with a clickable table of contents", long_about = None)]
struct Args {
    /// Markdown file to open
    file: Option<PathBuf>,

    /// Reload the file when it changes on disk
    #[arg(short, long)]
    watch: bool,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([400.0, 300.0])
            .with_title("Markdown Viewer"),
        ..Default::default()
    };

    eframe::run_native(
        "md-outline-viewer",
        options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, args.file, args.watch)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_file_and_watch_flag() {
        let args = Args::parse_from(["md-outline-viewer", "--watch", "notes.md"]);
        assert!(args.watch);
        assert_eq!(args.file, Some(PathBuf::from("notes.md")));

        let args = Args::parse_from(["md-outline-viewer"]);
        assert!(!args.watch);
        assert_eq!(args.file, None);
    }
}
