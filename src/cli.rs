use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// `--debug-level` values
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Where the any-hit queries run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Parallel traversal on all CPU cores
    Cpu,
    /// Compute shader dispatch (requires the `gpu` feature)
    Gpu,
}

/// How probe directions are distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    Fibonacci,
    Random,
}

#[derive(Parser, Debug)]
#[command(name = "collision-tracer")]
#[command(about = "Casts any-hit probe rays against a triangle mesh BVH")]
pub struct Args {
    /// glTF/GLB file to load; the built-in scene is used when omitted
    pub scene: Option<String>,

    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub debug_level: LogLevel,

    /// Probe origin as three comma separated values
    #[arg(long, value_delimiter = ',', default_values_t = [0.0, 2.0, 3.0])]
    pub origin: Vec<f32>,

    /// Number of probe rays
    #[arg(long, short = 'n', default_value = "100000")]
    pub rays: usize,

    /// Ray length (tmax)
    #[arg(long, default_value = "50.0")]
    pub length: f32,

    /// Ignore hits closer than this distance
    #[arg(long, default_value = "0.0")]
    pub tmin: f32,

    #[arg(long, value_enum, default_value = "fibonacci")]
    pub pattern: Pattern,

    /// Seed for the random pattern
    #[arg(long, default_value = "0")]
    pub seed: u64,

    #[arg(long, value_enum, default_value = "cpu")]
    pub backend: Backend,
}
