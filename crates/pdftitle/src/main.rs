use std::path::PathBuf;

use crate::prelude::{println, *};
use clap::{CommandFactory, Parser};
use pdftitle_core::config::{MAX_PAGES, MAX_WORDS, MIN_CHARS, MIN_LONGEST_WORD};

mod error;
mod files;
mod output;
mod prelude;
mod process;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Infer the titles of PDF documents from their text layout and optionally rename the files after them"
)]
pub struct App {
    /// PDF files, directories or glob patterns (e.g. "*.pdf")
    pub paths: Vec<PathBuf>,

    #[clap(flatten)]
    pub options: Options,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Options {
    /// Directory that receives renamed files
    #[arg(short, long, env = "PDFTITLE_DIRECTORY", default_value = ".")]
    pub directory: PathBuf,

    /// Rename each file to "<title>.pdf"
    #[arg(long, env = "PDFTITLE_RENAME", default_value = "false")]
    pub rename: bool,

    /// Only report what a rename would do
    #[arg(short = 'n', long, env = "PDFTITLE_DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Try the document metadata title first
    #[arg(long, env = "PDFTITLE_METADATA", default_value = "false")]
    pub metadata: bool,

    /// JSON denylist replacing the built-in one
    #[arg(long, env = "PDFTITLE_KEYWORDS")]
    pub keywords: Option<PathBuf>,

    /// Minimum length of a title line
    #[arg(long, env = "PDFTITLE_MIN_CHARS", default_value_t = MIN_CHARS)]
    pub min_chars: usize,

    /// Maximum number of words in a title
    #[arg(long, env = "PDFTITLE_MAX_WORDS", default_value_t = MAX_WORDS)]
    pub max_words: usize,

    /// Minimum length of the longest word of a title
    #[arg(long, env = "PDFTITLE_MIN_LONGEST_WORD", default_value_t = MIN_LONGEST_WORD)]
    pub min_longest_word: usize,

    /// Pages scanned for text before giving up
    #[arg(long, env = "PDFTITLE_MAX_PAGES", default_value_t = MAX_PAGES)]
    pub max_pages: usize,

    /// Documents processed concurrently
    #[arg(short, long, env = "PDFTITLE_JOBS", default_value = "1")]
    pub jobs: usize,

    /// Output one JSON object per document
    #[arg(long)]
    pub json: bool,

    /// Print a path/title table at the end
    #[arg(long)]
    pub table: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "PDFTITLE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let mut app = App::parse();

    if app.paths.is_empty() {
        // One-click mode: rename every PDF of the current directory.
        println!("{}\n", App::command().render_usage());
        app.paths = vec![PathBuf::from("*.pdf")];
        app.options.rename = true;
    }

    process::run(app.paths, app.options, app.global)
        .await
        .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
