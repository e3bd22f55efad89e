//! Upload discovery from the local filesystem.
//!
//! Turns the paths given on the command line into [`FileInput`]s. Plain
//! files are taken as-is; directories are walked and filtered through the
//! `[ingest]` include/exclude globs, relative to the directory. Results
//! keep argument order, with each directory's files sorted by relative
//! path.

use std::path::Path;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::models::{FileInput, FileSource};

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Expand `paths` into upload inputs.
pub fn collect_inputs(paths: &[impl AsRef<Path>], config: &IngestConfig) -> Result<Vec<FileInput>> {
    let include_set = build_globset(config.include_globs.iter().map(String::as_str))?;
    let exclude_set = build_globset(
        DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(config.exclude_globs.iter().map(String::as_str)),
    )?;

    let mut inputs = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            inputs.extend(walk_directory(path, config, &include_set, &exclude_set)?);
        } else if path.is_file() {
            inputs.push(file_input(path, &display_name(path))?);
        } else {
            bail!("Input path does not exist: {}", path.display());
        }
    }
    Ok(inputs)
}

fn walk_directory(
    root: &Path,
    config: &IngestConfig,
    include_set: &GlobSet,
    exclude_set: &GlobSet,
) -> Result<Vec<FileInput>> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        found.push((rel_str, path.to_path_buf()));
    }

    // Sort for deterministic upload order
    found.sort_by(|a, b| a.0.cmp(&b.0));

    found
        .iter()
        .map(|(rel, path)| file_input(path, rel))
        .collect()
}

fn file_input(path: &Path, name: &str) -> Result<FileInput> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(FileInput {
        name: name.to_string(),
        size: metadata.len(),
        mime_type: String::new(),
        source: FileSource::Path(path.to_path_buf()),
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
