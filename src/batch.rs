//! Batch processing of a directory or a ZIP archive of documents.
//!
//! Each document runs in isolation: a failure is recorded in the
//! [`BatchReport`] and the batch moves on.

use crate::convert::ConverterRegistry;
use crate::detect::{detect_format_from_path, InputKind};
use crate::error::{Error, Result};
use crate::outline::ProcessOptions;
use crate::render::{ProcessReport, ProcessingStats};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Extensions picked up from a directory scan.
const SCANNED_EXTENSIONS: [&str; 2] = ["docx", "doc"];

/// A document that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Input document
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Documents processed successfully, in input order
    pub successes: Vec<ProcessReport>,
    /// Documents that failed, in input order
    pub failures: Vec<BatchFailure>,
    /// Statistics summed over the successes
    pub stats: ProcessingStats,
}

impl BatchReport {
    /// Number of documents attempted.
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Number of documents processed.
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of documents that failed.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if every document succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, outcome: Result<ProcessReport>) {
        match outcome {
            Ok(report) => {
                self.stats.merge(&report.stats);
                self.successes.push(report);
            }
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                self.failures.push(BatchFailure {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Runs the converter over many documents.
pub struct BatchProcessor {
    registry: ConverterRegistry,
    options: ProcessOptions,
    parallel: bool,
}

impl BatchProcessor {
    /// Create a sequential processor with the default converters.
    pub fn new(options: ProcessOptions) -> Self {
        Self {
            registry: ConverterRegistry::with_defaults(),
            options,
            parallel: false,
        }
    }

    /// Process documents on the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use a custom converter registry.
    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Documents a batch over `input` would process.
    ///
    /// A directory is scanned (not recursively) for `.docx` and `.doc`
    /// files; a `.zip` archive has its `.docx` entries extracted into
    /// `output_dir` first.
    pub fn collect_inputs(&self, input: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if input.is_dir() {
            return scan_directory(input);
        }
        match detect_format_from_path(input)? {
            InputKind::Archive => extract_archive(input, output_dir),
            _ => Ok(vec![input.to_path_buf()]),
        }
    }

    /// Process every document under `input`.
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<BatchReport> {
        self.run_with(input, output_dir, |_, _| {})
    }

    /// Process every document, calling `on_done` after each one.
    pub fn run_with<F>(&self, input: &Path, output_dir: &Path, on_done: F) -> Result<BatchReport>
    where
        F: Fn(&Path, &Result<ProcessReport>) + Sync,
    {
        let inputs = self.collect_inputs(input, output_dir)?;
        log::info!("batch of {} documents from {}", inputs.len(), input.display());
        Ok(self.run_paths(&inputs, output_dir, on_done))
    }

    /// Process an explicit list of documents.
    pub fn run_paths<F>(&self, inputs: &[PathBuf], output_dir: &Path, on_done: F) -> BatchReport
    where
        F: Fn(&Path, &Result<ProcessReport>) + Sync,
    {
        let process = |path: &PathBuf| {
            let outcome = self.registry.process(path, output_dir, &self.options);
            on_done(path, &outcome);
            outcome
        };

        let outcomes: Vec<Result<ProcessReport>> = if self.parallel {
            inputs.par_iter().map(process).collect()
        } else {
            inputs.iter().map(process).collect()
        };

        let mut report = BatchReport::default();
        for (path, outcome) in inputs.iter().zip(outcomes) {
            report.record(path, outcome);
        }
        report
    }
}

fn is_candidate(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    // Word lock files look like `~$name.docx`.
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SCANNED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_candidate(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Extract the `.docx` entries of an archive into `output_dir`.
pub fn extract_archive(archive: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    fs::create_dir_all(output_dir)?;

    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().and_then(|p| p.file_name().map(PathBuf::from)) else {
            log::warn!("skipping archive entry with unsafe name: {}", entry.name());
            continue;
        };
        if entry.name().starts_with("__MACOSX") {
            continue;
        }
        let is_docx = name
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if !is_docx || name.to_string_lossy().starts_with("~$") {
            continue;
        }

        let target = output_dir.join(&name);
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        log::debug!("extracted {}", target.display());
        extracted.push(target);
    }

    if extracted.is_empty() {
        return Err(Error::Other(format!("no .docx files in {}", archive.display())));
    }
    extracted.sort();
    Ok(extracted)
}
