//! Input discovery
//!
//! Turns a data directory into the list of tasks the pipeline script is run
//! on. Task arguments are file names relative to the directory, which is
//! also where the jobs run.

use anyhow::{Context, Result};
use clap::ValueEnum;
use qpipe_core::Task;
use std::path::Path;
use tracing::{debug, error};

/// Kind of input the pipeline script expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputType {
    /// csfasta/qual file pair
    Solid,
    /// Single fastq file
    Fastq,
}

/// Collects the tasks for `dir`, sorted by file name
pub fn collect_tasks(dir: &Path, input: InputType) -> Result<Vec<Task>> {
    let names = list_files(dir)?;

    let tasks = match input {
        InputType::Solid => {
            debug!("Collecting csfasta/qual file pairs in {}", dir.display());
            solid_pairs(dir, &names)
        }
        InputType::Fastq => {
            debug!("Collecting fastq files in {}", dir.display());
            names
                .iter()
                .filter(|name| has_extension(name, "fastq"))
                .map(|name| Task::new([name.as_str()]))
                .collect()
        }
    };

    Ok(tasks)
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    names.sort();
    Ok(names)
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name).extension().is_some_and(|e| e == ext)
}

fn solid_pairs(dir: &Path, names: &[String]) -> Vec<Task> {
    let mut tasks = Vec::new();

    for qual in names.iter().filter(|name| has_extension(name, "qual")) {
        debug!("Examining file {}", qual);
        let csfasta = csfasta_for_qual(qual);

        if dir.join(&csfasta).exists() {
            tasks.push(Task::new([csfasta, qual.clone()]));
        } else {
            error!("Unable to get csfasta for {}", qual);
        }
    }

    tasks
}

/// Name of the csfasta file matching a qual file
///
/// The last `_QV` in the stem is dropped: `run_F3_QV.qual` pairs with
/// `run_F3.csfasta`. A stem without `_QV` is used as-is.
pub fn csfasta_for_qual(qual: &str) -> String {
    let stem = Path::new(qual)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.rfind("_QV") {
        Some(i) => format!("{}{}.csfasta", &stem[..i], &stem[i + 3..]),
        None => format!("{}.csfasta", stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), "").unwrap();
        }
    }

    #[test]
    fn test_csfasta_for_qual() {
        assert_eq!(csfasta_for_qual("run_F3_QV.qual"), "run_F3.csfasta");
        assert_eq!(csfasta_for_qual("run_QV_F3_QV.qual"), "run_QV_F3.csfasta");
        assert_eq!(csfasta_for_qual("run_F3.qual"), "run_F3.csfasta");
        assert_eq!(csfasta_for_qual("a_QV_b.qual"), "a_b.csfasta");
    }

    #[test]
    fn test_collect_solid_pairs() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &[
                "b_F3.csfasta",
                "b_F3_QV.qual",
                "a_F3.csfasta",
                "a_F3_QV.qual",
                "orphan_QV.qual",
                "notes.txt",
            ],
        );

        let tasks = collect_tasks(dir.path(), InputType::Solid).unwrap();

        assert_eq!(
            tasks,
            vec![
                Task::new(["a_F3.csfasta", "a_F3_QV.qual"]),
                Task::new(["b_F3.csfasta", "b_F3_QV.qual"]),
            ]
        );
    }

    #[test]
    fn test_collect_fastq() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["z.fastq", "a.fastq", "a.fastq.gz", "a.qual"]);

        let tasks = collect_tasks(dir.path(), InputType::Fastq).unwrap();

        assert_eq!(
            tasks,
            vec![Task::new(["a.fastq"]), Task::new(["z.fastq"])]
        );
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_tasks(dir.path(), InputType::Solid).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(collect_tasks(&missing, InputType::Fastq).is_err());
    }
}
