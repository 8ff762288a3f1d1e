use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::core::load_queue::DelayPolicy;
use crate::entities::FilterMode;

/// Throttled texture loader: decodes the given keys through the full
/// request -> fetch -> queue -> decode pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Resource keys to load (file name without extension)
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    /// Asset root directory
    #[arg(short = 'r', long = "root", value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Subdirectory under root holding the assets
    #[arg(long = "subdir", value_name = "DIR", default_value = "Cards")]
    pub subdir: String,

    /// File extension appended to every key
    #[arg(short = 'e', long = "ext", value_name = "EXT", default_value = ".jpg")]
    pub extension: String,

    /// Decode as soon as bytes arrive (bypass the throttled queue)
    #[arg(short = 'i', long = "immediate")]
    pub immediate: bool,

    /// Fixed pause between queued decodes, in milliseconds
    #[arg(long = "delay-ms", value_name = "MS", conflicts_with = "frame")]
    pub delay_ms: Option<u64>,

    /// One queued decode per frame
    #[arg(long = "frame")]
    pub frame: bool,

    /// Simulated frame rate driving the queue
    #[arg(long = "fps", value_name = "N", default_value_t = 60)]
    pub fps: u32,

    /// Texture filter hint
    #[arg(long = "filter", value_enum)]
    pub filter: Option<FilterArg>,

    /// Give up after this many seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Load config from this JSON file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable logging to file (default: trickle.log in the data directory)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Point,
    Bilinear,
    Trilinear,
}

impl From<FilterArg> for FilterMode {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Point => FilterMode::Point,
            FilterArg::Bilinear => FilterMode::Bilinear,
            FilterArg::Trilinear => FilterMode::Trilinear,
        }
    }
}

impl Args {
    /// Delay policy requested on the command line, if any
    pub fn delay_override(&self) -> Option<DelayPolicy> {
        if self.frame {
            Some(DelayPolicy::FrameBoundary)
        } else {
            self.delay_ms
                .map(|ms| DelayPolicy::FixedSeconds(ms as f32 / 1000.0))
        }
    }

    /// 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Duration of one simulated frame
    pub fn frame_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["trickle", "card_ace", "card_king"]).unwrap();
        assert_eq!(args.keys, vec!["card_ace", "card_king"]);
        assert_eq!(args.subdir, "Cards");
        assert_eq!(args.extension, ".jpg");
        assert!(!args.immediate);
        assert_eq!(args.delay_override(), None);
        assert_eq!(args.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_parse_delay_and_verbosity() {
        let args = Args::try_parse_from(["trickle", "-vv", "--delay-ms", "250", "k"]).unwrap();
        assert_eq!(args.delay_override(), Some(DelayPolicy::FixedSeconds(0.25)));
        assert_eq!(args.log_level(), log::LevelFilter::Debug);

        let args = Args::try_parse_from(["trickle", "--frame", "--filter", "point", "k"]).unwrap();
        assert_eq!(args.delay_override(), Some(DelayPolicy::FrameBoundary));
        assert_eq!(args.filter.map(FilterMode::from), Some(FilterMode::Point));
    }

    #[test]
    fn test_frame_and_delay_conflict() {
        assert!(Args::try_parse_from(["trickle", "--frame", "--delay-ms", "5"]).is_err());
    }
}
