//! Check and Dump commands - one-shot compile of a program directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{LoaderConfig, Settings};
use crate::loader::{LoadMetrics, ProgramLoader};
use crate::watcher::NoopWatcher;

/// Result of compiling a directory once.
pub struct BulkLoad {
    pub loader: ProgramLoader,
    pub counters: Arc<LoadMetrics>,
    pub errors: usize,
}

/// Compile every program in `dir` without watching anything.
pub fn bulk_load(dir: &Path, config: LoaderConfig) -> anyhow::Result<BulkLoad> {
    let counters = Arc::new(LoadMetrics::new());

    let loader = ProgramLoader::builder()
        .watcher(Arc::new(NoopWatcher))
        .counters(counters.clone())
        .config(config)
        .build()?;

    let errors = loader.load_all(dir)?;
    Ok(BulkLoad {
        loader,
        counters,
        errors,
    })
}

/// Run check command - report load status per program.
pub fn run_check(dir: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| settings.loader.program_dir.clone());
    let result = bulk_load(&dir, settings.loader.clone())?;

    let snapshot = result.counters.snapshot();
    for name in snapshot.loads.keys() {
        println!("ok      {name}");
    }
    for name in snapshot.errors.keys() {
        println!("FAILED  {name}");
    }
    println!(
        "\n{} programs loaded, {} failed",
        result.loader.engine().len(),
        result.errors
    );

    if result.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Run dump command - print the bytecode of every program and exit.
pub fn run_dump(dir: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| settings.loader.program_dir.clone());
    let config = LoaderConfig {
        dump_bytecode: true,
        ..settings.loader.clone()
    };

    let result = bulk_load(&dir, config)?;
    if result.errors > 0 {
        eprintln!("{} programs failed to compile", result.errors);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bulk_load_reports_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mtail"), "counter a\n/a/ { a++ }\n").unwrap();
        std::fs::write(dir.path().join("b.mtail"), "counter b\n/b/ { c++ }\n").unwrap();

        let result = bulk_load(dir.path(), LoaderConfig::default()).unwrap();

        assert_eq!(result.errors, 1);
        assert_eq!(result.loader.engine().names(), vec!["a.mtail"]);
        assert_eq!(result.counters.errors("b.mtail"), 1);
    }

    #[test]
    fn test_bulk_load_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(bulk_load(&dir.path().join("absent"), LoaderConfig::default()).is_err());
    }
}
