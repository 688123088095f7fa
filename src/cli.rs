use std::path::PathBuf;

use clap::Parser;

use crate::config::VerifyMode;

/// Disk exerciser and integrity checker.
///
/// Fields below that can also come from the layered configuration file
/// (`config.rs`) are left as `Option` with no clap default: an absent
/// flag means "defer to config, then to the hardcoded default", which
/// is resolved once in `main.rs` after the config file and environment
/// overrides have been loaded. Only an *explicit* CLI flag should win
/// outright over the config layer.
#[derive(Parser, Debug)]
#[command(name = "disktest", version = env!("CARGO_PKG_VERSION"), about = "Populate a subtree with pseudo-random files, fingerprint them, and verify the subtree reads back unchanged")]
pub struct Cli {
    /// Root path to generate into and/or verify. Falls back to the
    /// config file's `general.path` when omitted; required one way or
    /// the other.
    pub root: Option<PathBuf>,

    /// Optional configuration file path (TOML/YAML/JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Total volume to generate, human-readable (e.g. "1GB"). Default: 1GB.
    #[arg(long)]
    pub size: Option<String>,

    /// Generate the volume before verifying. Default: y.
    #[arg(long)]
    pub generate: Option<YesNo>,

    /// Recorder backend used to verify the generated volume. Default: mem.
    #[arg(long)]
    pub verify: Option<VerifyMode>,

    /// Maximum parallel workers; 0 means cpu_count - 1 (minimum effective 1). Default: 0.
    #[arg(long = "maxparallel")]
    pub max_parallel: Option<usize>,

    /// Write a CPU profile to this path (diagnostic only, not implemented)
    #[arg(long = "cpuprofile")]
    pub cpuprofile: Option<PathBuf>,

    /// Write a memory profile to this path (diagnostic only, not implemented)
    #[arg(long = "memprofile")]
    pub memprofile: Option<PathBuf>,

    /// Block on stdin before exiting, so a profiler can be attached. Default: n.
    #[arg(long = "waitbeforeexit")]
    pub wait_before_exit: Option<YesNo>,
}

/// A `y`/`n` flag value, matching the original tool's flag convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

impl std::str::FromStr for YesNo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Ok(YesNo::Yes),
            "n" | "no" | "false" | "0" => Ok(YesNo::No),
            other => Err(format!("expected y or n, got '{}'", other)),
        }
    }
}

/// Parses a human-readable byte size such as `"1GB"`, `"512mb"`, or
/// `"100KB"`. Suffixes are case-insensitive; the multiplier is decimal
/// (1000), matching the original tool's plain `uint64` size constants.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let upper = trimmed.to_uppercase();
    const UNITS: &[(&str, u64)] = &[
        ("TB", 1_000_000_000_000),
        ("GB", 1_000_000_000),
        ("MB", 1_000_000),
        ("KB", 1_000),
        ("B", 1),
    ];

    for (suffix, multiplier) in UNITS {
        if let Some(number_part) = upper.strip_suffix(suffix) {
            let number_part = number_part.trim();
            if number_part.is_empty() {
                continue;
            }
            return number_part
                .parse::<f64>()
                .map(|n| (n * *multiplier as f64) as u64)
                .map_err(|_| format!("invalid numeric size '{}'", trimmed));
        }
    }

    trimmed
        .parse::<u64>()
        .map_err(|_| format!("invalid size '{}': expected a number with an optional B/KB/MB/GB/TB suffix", trimmed))
}

/// Resolves `--maxparallel` (0 meaning cpu_count - 1) to an effective
/// worker count of at least 1.
pub fn resolve_max_parallel(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_bytes() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("512B").unwrap(), 512);
    }

    #[test]
    fn parses_decimal_units_case_insensitively() {
        assert_eq!(parse_size("1gb").unwrap(), 1_000_000_000);
        assert_eq!(parse_size("1GB").unwrap(), 1_000_000_000);
        assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
        assert_eq!(parse_size("100KB").unwrap(), 100_000);
        assert_eq!(parse_size("2TB").unwrap(), 2_000_000_000_000);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(parse_size("").is_err());
        assert!(parse_size("not-a-size").is_err());
    }

    #[test]
    fn yes_no_parses_common_spellings() {
        assert_eq!("y".parse::<YesNo>().unwrap(), YesNo::Yes);
        assert_eq!("N".parse::<YesNo>().unwrap(), YesNo::No);
        assert!("maybe".parse::<YesNo>().is_err());
    }

    #[test]
    fn max_parallel_zero_falls_back_to_available_parallelism() {
        let resolved = resolve_max_parallel(0);
        assert!(resolved >= 1);
    }

    #[test]
    fn max_parallel_explicit_value_is_used_verbatim() {
        assert_eq!(resolve_max_parallel(7), 7);
    }
}
