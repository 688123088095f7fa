use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use disktest::cli::{parse_size, resolve_max_parallel, Cli, YesNo};
use disktest::config::{load_runtime_config, VerifyMode};
use disktest::recorder::{InMemRecorder, Recorder, SqliteRecorder};
use disktest::{orchestrator, utils, CancelToken};

fn main() -> ExitCode {
    utils::setup_logging();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    // File/env config layers are loaded first and treated as the
    // default layer; an explicit CLI flag always wins over its own
    // field, but an *absent* flag falls through to the config value
    // (and finally to the hardcoded default) rather than being silently
    // ignored.
    let file_config = load_runtime_config(cli.config.as_deref())
        .context("loading layered configuration")?;
    let general = file_config.general.unwrap_or_default();
    let profile = file_config.profile.unwrap_or_default();

    let root = cli
        .root
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| general.path.filter(|p| !p.is_empty()).map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("a root path is required"))?;

    let size = cli.size.or(general.size).unwrap_or_else(|| "1GB".to_string());
    let volume = parse_size(&size).map_err(anyhow::Error::msg)?;

    let max_parallel = cli.max_parallel.or(general.max_parallel).unwrap_or(0);
    let workers = resolve_max_parallel(max_parallel);

    let do_generate = cli
        .generate
        .map(YesNo::as_bool)
        .or(general.generate)
        .unwrap_or(true);

    let verify_mode = match cli.verify {
        Some(mode) => mode,
        None => match general.verify {
            Some(s) => s.parse::<VerifyMode>().map_err(anyhow::Error::msg)?,
            None => VerifyMode::Mem,
        },
    };
    let do_verify = !matches!(verify_mode, VerifyMode::None);

    let wait_before_exit = cli
        .wait_before_exit
        .map(YesNo::as_bool)
        .or(general.wait_before_exit)
        .unwrap_or(false);

    let cpuprofile = cli.cpuprofile.or_else(|| profile.cpuprofile.map(PathBuf::from));
    let memprofile = cli.memprofile.or_else(|| profile.memprofile.map(PathBuf::from));
    if cpuprofile.is_some() || memprofile.is_some() {
        info!("cpuprofile/memprofile flags are accepted but profiling is not implemented");
    }

    let recorder: Option<Arc<dyn Recorder>> = match verify_mode {
        VerifyMode::Mem => Some(Arc::new(InMemRecorder::new())),
        VerifyMode::Sqlite => Some(Arc::new(SqliteRecorder::new())),
        VerifyMode::None => None,
    };

    let cancel = CancelToken::new();
    cancel
        .install_ctrlc_handler()
        .context("installing Ctrl+C handler")?;

    let success = orchestrator::run(root, volume, workers, do_generate, do_verify, recorder, cancel);

    if wait_before_exit {
        wait_for_enter();
    }

    Ok(success)
}

fn wait_for_enter() {
    eprint!("press enter to exit... ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
