//! Ingest command handler.

use clap::Args;
use docqa_core::AppResult;
use docqa_knowledge::{IngestFailure, IngestReport, RagPipeline};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ingest files into the vector store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest (directories are walked recursively)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, pipeline: &RagPipeline) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} paths", self.paths.len());

        let (files, mut failures) = collect_files(&self.paths);
        let mut batch = Vec::with_capacity(files.len());
        for path in files {
            let name = path.display().to_string();
            match tokio::fs::read(&path).await {
                Ok(content) => batch.push((name, content)),
                Err(e) => failures.push(IngestFailure {
                    file: name,
                    error: e.to_string(),
                }),
            }
        }

        let mut report = pipeline.ingest_batch(batch).await;
        report.errors.extend(failures);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

/// Expand the given paths into files, walking directories in name order.
fn collect_files(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<IngestFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        if !path.is_dir() {
            failures.push(IngestFailure {
                file: path.display().to_string(),
                error: "No such file or directory".to_string(),
            });
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() && !is_hidden(entry.path()) => {
                    files.push(entry.into_path())
                }
                Ok(_) => {}
                Err(e) => failures.push(IngestFailure {
                    file: e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| path.display().to_string()),
                    error: e.to_string(),
                }),
            }
        }
    }

    tracing::debug!("Collected {} files to ingest", files.len());
    (files, failures)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn print_report(report: &IngestReport) {
    println!(
        "Ingested {} files ({} chunks)",
        report.ingested.len(),
        report.chunks_added
    );
    for file in &report.ingested {
        println!("  + {}", file);
    }
    if !report.errors.is_empty() {
        println!("Failed {} files:", report.errors.len());
        for failure in &report.errors {
            println!("  - {}: {}", failure.file, failure.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_walks_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("docs/nested")).unwrap();
        std::fs::write(root.join("docs/b.txt"), "b").unwrap();
        std::fs::write(root.join("docs/a.pdf"), "a").unwrap();
        std::fs::write(root.join("docs/nested/c.md"), "c").unwrap();
        std::fs::write(root.join("docs/.hidden"), "h").unwrap();
        std::fs::write(root.join("single.txt"), "s").unwrap();

        let (files, failures) = collect_files(&[
            root.join("single.txt"),
            root.join("docs"),
            root.join("missing.txt"),
        ]);

        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["single.txt", "docs/a.pdf", "docs/b.txt", "docs/nested/c.md"]
        );

        assert_eq!(failures.len(), 1);
        assert!(failures[0].file.ends_with("missing.txt"));
    }
}
