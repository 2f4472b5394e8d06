//! Startup bulk load and the event reconciliation loop.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::compiler::{Compiler, ProgramCompiler};
use crate::config::LoaderConfig;
use crate::engine::Engine;
use crate::metrics::MetricStore;
use crate::vfs::{FileSystem, OsFs};
use crate::watcher::{EventStream, WatchEvent, Watcher};

use super::counters::{LoadCounters, LoadMetrics};
use super::error::{LoadError, LoadResult};
use super::watch_set::WatchSet;

/// Keeps the [`Engine`] in step with the program files on disk.
///
/// [`load_all`](Self::load_all) populates the engine once at startup. After
/// that, [`spawn`](Self::spawn) runs a single task that applies watcher events
/// in arrival order. Per-program failures are counted and logged, never
/// returned.
pub struct ProgramLoader {
    watcher: Arc<dyn Watcher>,
    fs: Arc<dyn FileSystem>,
    compiler: Arc<dyn Compiler>,
    metrics: Arc<MetricStore>,
    counters: Arc<dyn LoadCounters>,
    engine: Arc<Engine>,
    /// Files watched individually, on top of the directory watch.
    watched: WatchSet,
    config: LoaderConfig,
}

impl ProgramLoader {
    /// Create a builder for configuring the loader.
    pub fn builder() -> ProgramLoaderBuilder {
        ProgramLoaderBuilder::new()
    }

    /// Watch `dir` and compile every program file in it.
    ///
    /// Returns the number of programs that failed to load. Only an unlistable
    /// directory is an error.
    pub fn load_all(&self, dir: &Path) -> LoadResult<usize> {
        if let Err(e) = self.watcher.add(dir) {
            tracing::warn!("[loader] failed to watch {}: {e}", dir.display());
        }

        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|source| LoadError::ListDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let mut errors = 0;
        for entry in entries {
            if entry.is_dir || !self.config.matches_extension(Path::new(&entry.name)) {
                crate::debug_event!("loader", "skipped", "{}", entry.name);
                continue;
            }
            errors += self.load_program(dir, &entry.name);
        }

        crate::log_event!(
            "loader",
            "loaded",
            "{} programs from {}, {errors} errors",
            self.engine.len(),
            dir.display()
        );
        Ok(errors)
    }

    /// Compile `dir/name` and publish it under `name`.
    ///
    /// Returns 1 if the file could not be read or did not compile, in which
    /// case the engine keeps whatever instance it had. Returns 0 otherwise.
    pub fn load_program(&self, dir: &Path, name: &str) -> usize {
        let path = dir.join(name);

        let source = match self.read_source(&path) {
            Ok(source) => source,
            Err(e) => {
                self.counters.record_error(name);
                tracing::warn!("[loader] failed to read {}: {e}", path.display());
                return 1;
            }
        };

        let program = match self.compiler.compile(name, &source, &self.metrics) {
            Ok(program) => program,
            Err(diagnostics) => {
                self.counters.record_error(name);
                for diagnostic in &diagnostics {
                    tracing::error!("[loader] {diagnostic}");
                }
                tracing::warn!(
                    "[loader] {name} not loaded: {} compile errors",
                    diagnostics.len()
                );
                return 1;
            }
        };

        if self.config.dump_bytecode {
            print!("{}", program.dump());
        }

        let replaced = self.engine.add_or_replace(name, Arc::new(program));
        self.counters.record_load(name);
        if replaced.is_some() {
            crate::log_event!("loader", "reloaded", "{name}");
        } else {
            crate::log_event!("loader", "loaded", "{name}");
        }
        0
    }

    /// Apply one watcher event.
    ///
    /// The reconciliation loop calls this for every event it receives.
    pub fn handle_event(&self, event: WatchEvent) {
        match event {
            WatchEvent::Delete(path) => self.on_delete(&path),
            WatchEvent::Create(path) => self.on_create(&path),
            WatchEvent::Update(path) => self.on_update(&path),
            WatchEvent::Unknown { kind, paths } => {
                tracing::warn!("[loader] ignoring unexpected event {kind} for {paths:?}");
            }
        }
    }

    /// Apply events until the stream closes.
    ///
    /// Blocks the calling thread. Must not be called from async context;
    /// use [`spawn`](Self::spawn) there.
    pub fn run(&self, mut events: EventStream) {
        crate::log_event!("loader", "watching for changes");
        while let Some(event) = events.blocking_recv() {
            crate::debug_event!("loader", "event", "{event:?}");
            self.handle_event(event);
        }
        crate::log_event!("loader", "event stream closed");
    }

    /// Run the reconciliation loop on tokio's blocking pool.
    ///
    /// Reads and compiles are synchronous, so the loop stays off the async
    /// workers. The task finishes when the watcher owning `events` is closed.
    pub fn spawn(self: Arc<Self>, events: EventStream) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run(events))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// The metric namespace programs declare their counters in.
    pub fn metrics(&self) -> &Arc<MetricStore> {
        &self.metrics
    }

    pub fn counters(&self) -> &Arc<dyn LoadCounters> {
        &self.counters
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Sorted names of the individually watched files.
    pub fn watched(&self) -> Vec<String> {
        self.watched.names()
    }

    fn on_delete(&self, path: &Path) {
        let Some(name) = self.program_name(path) else {
            return;
        };

        if self.engine.remove(name).is_some() {
            crate::log_event!("loader", "removed", "{name}");
        }
        let was_watched = self.watched.remove(name);

        if let Err(e) = self.watcher.remove(path) {
            // The OS drops the watch on its own once the file is gone
            if was_watched {
                tracing::warn!("[loader] failed to unwatch {}: {e}", path.display());
            } else {
                crate::debug_event!("loader", "unwatch skipped", "{}: {e}", path.display());
            }
        }
    }

    fn on_create(&self, path: &Path) {
        if let Some(name) = self.program_name(path) {
            self.ensure_watched(path, name);
        }
    }

    fn on_update(&self, path: &Path) {
        let Some(name) = self.program_name(path) else {
            return;
        };
        self.ensure_watched(path, name);

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        self.load_program(dir, name);
    }

    /// Watch `path` individually unless `name` already is.
    fn ensure_watched(&self, path: &Path, name: &str) {
        if !self.watched.insert(name) {
            return;
        }

        match self.watcher.add(path) {
            Ok(()) => crate::debug_event!("loader", "watching", "{}", path.display()),
            Err(e) => {
                // Forget the entry so the next event for this file retries
                self.watched.remove(name);
                tracing::warn!("[loader] failed to watch {}: {e}", path.display());
            }
        }
    }

    /// Program name for `path`, or `None` if the event is not about a program.
    fn program_name<'a>(&self, path: &'a Path) -> Option<&'a str> {
        if !self.config.matches_extension(path) {
            crate::debug_event!("loader", "ignored", "{}", path.display());
            return None;
        }

        let name = path.file_name().and_then(|n| n.to_str());
        if name.is_none() {
            tracing::warn!("[loader] ignoring unnamed path {}", path.display());
        }
        name
    }

    fn read_source(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let mut reader = self.fs.open(path)?;
        let mut source = Vec::new();
        reader.read_to_end(&mut source)?;
        Ok(source)
    }
}

/// Builder for constructing a [`ProgramLoader`].
///
/// Only the watcher is required. Everything else defaults to the real
/// filesystem, the bundled compiler and fresh stores.
pub struct ProgramLoaderBuilder {
    watcher: Option<Arc<dyn Watcher>>,
    fs: Option<Arc<dyn FileSystem>>,
    compiler: Option<Arc<dyn Compiler>>,
    metrics: Option<Arc<MetricStore>>,
    counters: Option<Arc<dyn LoadCounters>>,
    engine: Option<Arc<Engine>>,
    config: LoaderConfig,
}

impl ProgramLoaderBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            watcher: None,
            fs: None,
            compiler: None,
            metrics: None,
            counters: None,
            engine: None,
            config: LoaderConfig::default(),
        }
    }

    pub fn watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Share a metric namespace with other components.
    pub fn metrics(mut self, metrics: Arc<MetricStore>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counters(mut self, counters: Arc<dyn LoadCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Publish into an existing engine instead of a new one.
    pub fn engine(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the ProgramLoader.
    pub fn build(self) -> LoadResult<ProgramLoader> {
        let watcher = self.watcher.ok_or_else(|| LoadError::InitFailed {
            reason: "Watcher is required".to_string(),
        })?;

        if self.config.extension.trim_start_matches('.').is_empty() {
            return Err(LoadError::InitFailed {
                reason: "Program extension must not be empty".to_string(),
            });
        }

        Ok(ProgramLoader {
            watcher,
            fs: self.fs.unwrap_or_else(|| Arc::new(OsFs)),
            compiler: self
                .compiler
                .unwrap_or_else(|| Arc::new(ProgramCompiler::new())),
            metrics: self.metrics.unwrap_or_default(),
            counters: self
                .counters
                .unwrap_or_else(|| Arc::new(LoadMetrics::new())),
            engine: self.engine.unwrap_or_default(),
            watched: WatchSet::new(),
            config: self.config,
        })
    }
}

impl Default for ProgramLoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
