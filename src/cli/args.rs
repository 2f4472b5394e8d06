//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Log-processing program loader
#[derive(Parser)]
#[command(
    name = "logvm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compile log-matching programs and hot-reload them on change",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "LOGVM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up .logvm directory with default settings
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Compile every program and report which ones fail
    Check {
        /// Program directory (defaults to loader.program_dir)
        dir: Option<PathBuf>,
    },

    /// Print the bytecode of every program, then exit
    Dump {
        /// Program directory (defaults to loader.program_dir)
        dir: Option<PathBuf>,
    },

    /// Load programs, reload them on change and run stdin through them
    #[command(
        after_help = "Examples:\n  tail -F /var/log/app.log | logvm run progs\n  logvm run --strict --dump-bytecode < access.log"
    )]
    Run {
        /// Program directory (defaults to loader.program_dir)
        dir: Option<PathBuf>,

        /// Print bytecode whenever a program compiles
        #[arg(long)]
        dump_bytecode: bool,

        /// Refuse to start if any program fails to load
        #[arg(long)]
        strict: bool,
    },

    /// Display active settings
    Config,
}
