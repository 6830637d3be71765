//! Command-line and environment configuration for the `todo` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use todo_kv::LogOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "todo", version, about = "Single-user todo list web application")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TODO_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Directory holding the data file
    #[arg(long, env = "TODO_DATA_DIR", default_value = "todo.db")]
    pub data_dir: PathBuf,

    /// fsync the data file after every write
    #[arg(long, env = "TODO_SYNC_WRITES", default_value_t = true, action = ArgAction::Set)]
    pub sync_writes: bool,

    /// Stale bytes tolerated before the data file is compacted
    #[arg(long, env = "TODO_COMPACTION_THRESHOLD", default_value_t = 1024 * 1024)]
    pub compaction_threshold: u64,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            sync_writes: self.sync_writes,
            compaction_threshold: self.compaction_threshold,
        }
    }

    /// Default log level when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["todo"]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8000");
        assert_eq!(config.data_dir, PathBuf::from("todo.db"));
        assert!(config.sync_writes);
        assert_eq!(config.compaction_threshold, 1024 * 1024);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "todo",
            "--bind",
            "127.0.0.1:9000",
            "--data-dir",
            "/tmp/todos",
            "--sync-writes",
            "false",
            "--compaction-threshold",
            "4096",
            "-vv",
        ])
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        let options = config.log_options();
        assert!(!options.sync_writes);
        assert_eq!(options.compaction_threshold, 4096);
        assert_eq!(config.log_level(), "trace");
    }

    #[test]
    fn rejects_non_numeric_threshold() {
        assert!(Config::try_parse_from(["todo", "--compaction-threshold", "lots"]).is_err());
    }
}
