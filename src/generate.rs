//! Driving loop: expand inputs, compose templates, iterate, render.
//!
//! Each input file is composed with the globally supplied include files and
//! rendered once per range value (or once, with no loop variable, when no
//! range was requested). A failure aborts further iteration for that file
//! but later files still run; the output cache is shared across the whole
//! run and flushed exactly once at the end, on every exit path.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::output::OutputCache;
use crate::range::RangeSpec;
use crate::template::ComposedTemplate;
use crate::values::{self, ValueTree};

/// One generation run's worth of caller input
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Template file paths or glob patterns, processed in order
    pub templates: Vec<String>,
    /// Flat dotted-path assignments
    pub assignments: Vec<(String, String)>,
    /// `variablePath=from..to` iteration request; empty means one pass
    pub range_spec: String,
    /// Output-name template; `None` falls back to the default naming
    /// convention derived from each input file
    pub output_template: Option<String>,
    /// Extra template files composed into every run as named sub-templates
    pub includes: Vec<String>,
    /// Suffix used by the default output naming convention
    pub output_suffix: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            templates: Vec::new(),
            assignments: Vec::new(),
            range_spec: String::new(),
            output_template: None,
            includes: Vec::new(),
            output_suffix: "go".to_string(),
        }
    }
}

/// Runs one full generation pass over all configured template files.
pub fn run(config: &GenerateConfig) -> Result<()> {
    let mut cache = OutputCache::new();
    let result = run_with_cache(config, &mut cache);
    cache.close_all();
    result
}

/// Like [`run`] but writing through a caller-supplied cache, which the
/// caller remains responsible for closing. Used when outputs are seeded
/// (for example a pre-opened stdout or an in-memory test buffer).
pub fn run_with_cache(config: &GenerateConfig, cache: &mut OutputCache) -> Result<()> {
    let spec = RangeSpec::parse(&config.range_spec)?;
    let mut tree = values::build(&config.assignments)?;
    let includes = expand_all(&config.includes);

    let mut first_error = None;
    for file in expand_all(&config.templates) {
        if let Err(err) = generate_file(&file, config, &spec, &mut tree, &includes, cache) {
            // compose errors already name the offending file
            let err = match err {
                err @ Error::InFile { .. } => err,
                err => err.in_file(file.display().to_string()),
            };
            error!(file = %file.display(), error = %err, "generation failed");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn generate_file(
    file: &Path,
    config: &GenerateConfig,
    spec: &RangeSpec,
    tree: &mut ValueTree,
    includes: &[PathBuf],
    cache: &mut OutputCache,
) -> Result<()> {
    let output_template = match &config.output_template {
        Some(output) => output.clone(),
        None => default_output_name(file, &config.output_suffix),
    };
    debug!(file = %file.display(), output = %output_template, "composing template");

    let mut files = vec![file.to_path_buf()];
    files.extend(includes.iter().cloned());
    let template = ComposedTemplate::from_files(&files, &output_template)?;

    spec.drive(tree, |tree| template.execute(tree, cache))?;
    info!(file = %file.display(), "generated");
    Ok(())
}

/// Derives the default output name from an input path: strip the last
/// extension, append `_<ext>.<suffix>`; extensionless inputs just get the
/// suffix appended.
fn default_output_name(file: &Path, suffix: &str) -> String {
    let path = file.to_string_lossy();
    match file.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            let stem = &path[..path.len() - ext.len() - 1];
            format!("{stem}_{ext}.{suffix}")
        }
        None => format!("{path}.{suffix}"),
    }
}

/// Expands each pattern, keeping caller order. A pattern that matches
/// nothing or has invalid glob syntax falls back to the literal path.
fn expand_all(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(expand(pattern));
    }
    files
}

fn expand(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => {
            let matched: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
            if matched.is_empty() {
                vec![PathBuf::from(pattern)]
            } else {
                matched
            }
        }
        Err(_) => vec![PathBuf::from(pattern)],
    }
}
