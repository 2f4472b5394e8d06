//! Program loader: startup bulk load plus hot reload.
//!
//! # Architecture
//!
//! ```text
//! program directory ──read_dir/open──> ProgramLoader ──compile──> Compiler
//!        ^                                  |    ^
//!        | add/remove                       |    | WatchEvent
//!     Watcher ──────── EventStream ─────────┘    |
//!                                               v
//!                                   Engine (name -> Arc<Program>)
//! ```
//!
//! The reconciliation loop is the only writer of the engine and the watch
//! set once startup is done.

mod counters;
mod error;
mod program_loader;
mod watch_set;

pub use counters::{ERRORS_METRIC, LOADS_METRIC, LoadCounters, LoadMetrics, LoadMetricsSnapshot};
pub use error::{LoadError, LoadResult};
pub use program_loader::{ProgramLoader, ProgramLoaderBuilder};
pub use watch_set::WatchSet;
