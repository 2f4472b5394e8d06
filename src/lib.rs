//! Program loader and hot-reload engine for a log-processing VM.
//!
//! Programs are small line-matching scripts kept in a directory. The
//! [`ProgramLoader`] compiles them into the [`Engine`] at startup and keeps
//! the engine in step with the directory while the process runs.

pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod vfs;
pub mod vm;
pub mod watcher;

pub use compiler::{CompileError, Compiler, ProgramCompiler};
pub use config::Settings;
pub use engine::Engine;
pub use loader::{LoadCounters, LoadError, LoadMetrics, ProgramLoader};
pub use metrics::MetricStore;
pub use vm::Program;
pub use watcher::{NotifyWatcher, WatchEvent, Watcher};
