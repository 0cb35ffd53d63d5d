use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use crate::prelude::*;

/// Whether a path names a PDF file (by extension, case-insensitive).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_file(entry: &ignore::DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_file())
}

/// Every PDF below `dir`, sorted by path.
pub fn walk_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkBuilder::new(dir).standard_filters(false).build() {
        let entry = entry.wrap_err_with(|| f!("Failed to walk {}", dir.display()))?;
        if is_file(&entry) && is_pdf(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Expand a `*` pattern against the files of its parent directory.
pub fn expand_glob(pattern: &Path) -> Result<Vec<PathBuf>> {
    let dir = match pattern.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = pattern
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_eyre(f!("Invalid pattern {}", pattern.display()))?;

    let mut overrides = OverrideBuilder::new(dir);
    overrides
        .add(name)
        .wrap_err_with(|| f!("Invalid pattern {name}"))?;
    let overrides = overrides.build()?;

    let mut found = Vec::new();
    for entry in WalkBuilder::new(dir)
        .standard_filters(false)
        .max_depth(Some(1))
        .overrides(overrides)
        .build()
    {
        let entry = entry.wrap_err_with(|| f!("Failed to list {}", dir.display()))?;
        if is_file(&entry) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Turn command-line arguments into the list of files to process.
///
/// Directories are walked for PDFs, arguments containing `*` are expanded,
/// and anything else is taken as a file path as is. Argument order is kept.
pub fn collect_inputs(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for arg in args {
        if arg.to_string_lossy().contains('*') {
            inputs.extend(expand_glob(arg)?);
        } else if arg.is_dir() {
            inputs.extend(walk_pdfs(arg)?);
        } else {
            inputs.push(arg.clone());
        }
    }
    Ok(inputs)
}
