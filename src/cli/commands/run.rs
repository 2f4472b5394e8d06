//! Run command - load, watch and feed stdin through the live programs.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::Settings;
use crate::engine::Engine;
use crate::loader::{LoadMetrics, LoadMetricsSnapshot, ProgramLoader};
use crate::metrics::CounterValue;
use crate::watcher::NotifyWatcher;

/// Arguments for the run command.
pub struct RunArgs {
    pub dir: Option<PathBuf>,
    pub dump_bytecode: bool,
    pub strict: bool,
}

/// Printed as JSON once stdin is exhausted.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub lines: u64,
    pub matches: u64,
    #[serde(flatten)]
    pub loads: LoadMetricsSnapshot,
    pub counters: Vec<CounterValue>,
}

/// Run every line of `input` through the engine.
///
/// Log lines are not guaranteed to be UTF-8; invalid bytes are replaced.
/// Returns `(lines, matches)`.
pub async fn feed_lines<R>(mut input: R, engine: &Engine) -> std::io::Result<(u64, u64)>
where
    R: AsyncBufRead + Unpin,
{
    let (mut total, mut matches) = (0u64, 0u64);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        total += 1;
        matches += engine.process_line(line.trim_end_matches(['\n', '\r'])) as u64;
    }
    Ok((total, matches))
}

/// Run the run command.
pub async fn run(args: RunArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut config = settings.loader.clone();
    if args.dump_bytecode {
        config.dump_bytecode = true;
    }
    let dir = args.dir.unwrap_or_else(|| config.program_dir.clone());

    let (watcher, events) = NotifyWatcher::new()?;
    let watcher = Arc::new(watcher);
    let counters = Arc::new(LoadMetrics::new());

    let loader = Arc::new(
        ProgramLoader::builder()
            .watcher(watcher.clone())
            .counters(counters.clone())
            .config(config)
            .build()?,
    );

    let errors = loader.load_all(&dir)?;
    if errors > 0 {
        if args.strict {
            anyhow::bail!("{errors} programs failed to load");
        }
        eprintln!("Warning: {errors} programs failed to load");
    }

    let task = Arc::clone(&loader).spawn(events);
    let engine = Arc::clone(loader.engine());

    let fed = feed_lines(BufReader::new(tokio::io::stdin()), &engine).await;

    watcher.close();
    task.await?;
    let (total, matches) = fed?;

    let report = RunReport {
        lines: total,
        matches,
        loads: counters.snapshot(),
        counters: loader.metrics().snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
