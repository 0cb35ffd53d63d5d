use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use futures::StreamExt;
use log::{info, warn};
use pdftitle_core::{TitleConfig, TitleEngine, TitleSource, UNTITLED};
use serde::Serialize;

use crate::prelude::{eprintln, *};
use crate::{files, output, Global, Options};

/// What happened to one input file.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub path: PathBuf,
    pub title: String,
    pub source: TitleSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<PathBuf>,
    /// Why the layout could not be used, or why the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the file counts as failed for the exit status.
    #[serde(skip)]
    pub failed: bool,
}

/// Rename settings shared by every file.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub directory: PathBuf,
    pub dry_run: bool,
}

/// Build the engine configuration from command-line options.
pub fn title_config(options: &Options) -> Result<TitleConfig> {
    let config = TitleConfig {
        min_chars: options.min_chars,
        max_words: options.max_words,
        min_longest_word: options.min_longest_word,
        max_pages: options.max_pages,
        use_metadata: options.metadata,
        ..TitleConfig::default()
    };

    match &options.keywords {
        Some(path) => {
            let json = fs::read_to_string(path)
                .wrap_err_with(|| f!("Failed to read keywords from {}", path.display()))?;
            Ok(config.with_keywords_json(&json)?)
        }
        None => Ok(config),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Infer and sanitize the title of one file. Blocking.
pub fn infer_file(path: &Path, engine: &TitleEngine) -> Outcome {
    let stem = file_stem(path);

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = Error::Unreadable(path.display().to_string(), e.to_string());
            return Outcome {
                path: path.to_path_buf(),
                title: engine.sanitize_title(&stem),
                source: TitleSource::FileName,
                renamed_to: None,
                error: Some(error.to_string()),
                failed: true,
            };
        }
    };

    let inference = pdf::infer_title(&bytes, &stem, engine);
    let error = inference.unreadable.map(|e| {
        warn!("{}: {e}, falling back to the file name", path.display());
        e.to_string()
    });

    let title = engine.sanitize_title(&inference.title);
    Outcome {
        path: path.to_path_buf(),
        title: if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        },
        source: inference.source,
        renamed_to: None,
        error,
        failed: false,
    }
}

/// File name for a title: path separators are not allowed in it.
pub fn target_file_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '-' } else { c })
        .collect();
    f!("{name}.pdf")
}

fn file_times(metadata: &fs::Metadata) -> std::io::Result<FileTimes> {
    Ok(FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?))
}

/// Move `source` to `target`, keeping its access and modification times.
///
/// Only a failed move is an error. Times that cannot be restored on the moved
/// file are logged, since the file already carries its new name.
pub fn rename_preserving_times(source: &Path, target: &Path) -> Result<(), Error> {
    let failed = |e: std::io::Error| {
        Error::RenameFailed(f!("{} => {}: {e}", source.display(), target.display()))
    };

    let times = fs::metadata(source).and_then(|m| file_times(&m));

    fs::rename(source, target).map_err(failed)?;

    // On unix, setting explicit times needs ownership, not write access.
    let restored = times.and_then(|times| {
        File::options()
            .write(true)
            .open(target)
            .or_else(|_| File::open(target))?
            .set_times(times)
    });
    if let Err(e) = restored {
        warn!("Could not keep the times of {}: {e}", target.display());
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rename the file of an outcome after its title.
///
/// An existing target is reported and left alone; a file that already
/// carries its title is not touched.
pub fn apply_rename(outcome: &mut Outcome, plan: &RenamePlan) {
    if outcome.failed {
        return;
    }

    let target = plan.directory.join(target_file_name(&outcome.title));
    info!("{} => {}", outcome.path.display(), target.display());

    if plan.dry_run || same_file(&outcome.path, &target) {
        outcome.renamed_to = Some(target);
        return;
    }

    let result = if target.exists() {
        Err(Error::TargetExists(target.display().to_string()))
    } else {
        rename_preserving_times(&outcome.path, &target)
    };

    match result {
        Ok(()) => outcome.renamed_to = Some(target),
        Err(e) => {
            eprintln!("{}", f!("*** {e} ***").yellow());
            outcome.error = Some(e.to_string());
            outcome.failed = true;
        }
    }
}

/// Process every input, `options.jobs` documents at a time.
///
/// Inference runs on blocking worker tasks; results, renames and output
/// follow argument order.
pub async fn run(paths: Vec<PathBuf>, options: Options, global: Global) -> Result<()> {
    let engine = Arc::new(TitleEngine::new(title_config(&options)?));
    if global.verbose {
        eprintln!("{:#?}", engine.config());
    }

    let inputs = files::collect_inputs(&paths)?;
    let plan = options.rename.then(|| RenamePlan {
        directory: options.directory.clone(),
        dry_run: options.dry_run,
    });

    let mut results = futures::stream::iter(inputs.into_iter().map(|path| {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || infer_file(&path, &engine))
    }))
    .buffered(options.jobs.max(1));

    let mut outcomes = Vec::new();
    while let Some(result) = results.next().await {
        let mut outcome = result?;
        if let Some(plan) = &plan {
            apply_rename(&mut outcome, plan);
        }
        output::print_outcome(&outcome, options.json, global.verbose)?;
        outcomes.push(outcome);
    }

    if options.table {
        output::print_table(&outcomes);
    }

    let failures = outcomes.iter().filter(|o| o.failed).count();
    if failures > 0 {
        return Err(eyre!("{failures} of {} files failed", outcomes.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn outcome(path: PathBuf, title: &str) -> Outcome {
        Outcome {
            path,
            title: title.to_string(),
            source: TitleSource::Layout,
            renamed_to: None,
            error: None,
            failed: false,
        }
    }

    #[test]
    fn test_target_file_name() {
        assert_eq!(target_file_name("A Title - Subtitle"), "A Title - Subtitle.pdf");
        assert_eq!(target_file_name("Input/Output Systems"), "Input-Output Systems.pdf");
    }

    #[test]
    fn test_infer_file_unreadable_file_fails() {
        let temp = TempDir::new().unwrap();
        let outcome = infer_file(&temp.path().join("gone.pdf"), &TitleEngine::default());
        assert!(outcome.failed);
        assert_eq!(outcome.title, "gone");
        assert_eq!(outcome.source, TitleSource::FileName);
    }

    #[test]
    fn test_infer_file_invalid_pdf_uses_stem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan_0042.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();

        let outcome = infer_file(&path, &TitleEngine::default());
        assert!(!outcome.failed);
        assert_eq!(outcome.title, "scan_0042");
        assert_eq!(outcome.source, TitleSource::FileName);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_rename_preserves_times() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.pdf");
        fs::write(&source, b"%PDF").unwrap();
        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_times(FileTimes::new().set_accessed(past).set_modified(past))
            .unwrap();

        let mut outcome = outcome(source.clone(), "Deep Residual Learning");
        let plan = RenamePlan {
            directory: temp.path().to_path_buf(),
            dry_run: false,
        };
        apply_rename(&mut outcome, &plan);

        let target = temp.path().join("Deep Residual Learning.pdf");
        assert_eq!(outcome.renamed_to.as_deref(), Some(target.as_path()));
        assert!(!source.exists());
        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), past);
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_read_only_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.pdf");
        fs::write(&source, b"%PDF").unwrap();
        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_times(FileTimes::new().set_accessed(past).set_modified(past))
            .unwrap();
        let mut permissions = fs::metadata(&source).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&source, permissions).unwrap();

        let mut outcome = outcome(source.clone(), "Read Only Paper");
        let plan = RenamePlan {
            directory: temp.path().to_path_buf(),
            dry_run: false,
        };
        apply_rename(&mut outcome, &plan);

        let target = temp.path().join("Read Only Paper.pdf");
        assert!(!outcome.failed);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.renamed_to.as_deref(), Some(target.as_path()));
        assert!(!source.exists());
        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), past);
    }

    #[test]
    fn test_rename_existing_target_is_skipped() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.pdf");
        let target = temp.path().join("Taken Title.pdf");
        fs::write(&source, b"source").unwrap();
        fs::write(&target, b"target").unwrap();

        let mut outcome = outcome(source.clone(), "Taken Title");
        let plan = RenamePlan {
            directory: temp.path().to_path_buf(),
            dry_run: false,
        };
        apply_rename(&mut outcome, &plan);

        assert!(outcome.failed);
        assert!(outcome.renamed_to.is_none());
        assert_eq!(fs::read(&source).unwrap(), b"source");
        assert_eq!(fs::read(&target).unwrap(), b"target");
    }

    #[test]
    fn test_rename_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.pdf");
        fs::write(&source, b"source").unwrap();

        let mut outcome = outcome(source.clone(), "Some Paper Title");
        let plan = RenamePlan {
            directory: temp.path().to_path_buf(),
            dry_run: true,
        };
        apply_rename(&mut outcome, &plan);

        assert!(source.exists());
        assert!(!temp.path().join("Some Paper Title.pdf").exists());
        assert!(outcome.renamed_to.is_some());
        assert!(!outcome.failed);
    }

    #[test]
    fn test_rename_already_named_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("Some Paper Title.pdf");
        fs::write(&source, b"source").unwrap();

        let mut outcome = outcome(source.clone(), "Some Paper Title");
        let plan = RenamePlan {
            directory: temp.path().to_path_buf(),
            dry_run: false,
        };
        apply_rename(&mut outcome, &plan);

        assert!(source.exists());
        assert!(!outcome.failed);
    }

    #[test]
    fn test_title_config_from_options() {
        let temp = TempDir::new().unwrap();
        let keywords = temp.path().join("keywords.json");
        fs::write(&keywords, r#"["Internal Memo"]"#).unwrap();

        let options = Options {
            directory: PathBuf::from("."),
            rename: false,
            dry_run: false,
            metadata: true,
            keywords: Some(keywords),
            min_chars: 8,
            max_words: 10,
            min_longest_word: 5,
            max_pages: 2,
            jobs: 1,
            json: false,
            table: false,
        };
        let config = title_config(&options).unwrap();
        assert_eq!(config.keywords, vec!["internal memo"]);
        assert_eq!(config.min_chars, 8);
        assert_eq!(config.max_words, 10);
        assert!(config.use_metadata);

        let options = Options {
            keywords: Some(temp.path().join("missing.json")),
            ..options
        };
        assert!(title_config(&options).is_err());
    }
}
