//! relgate - release-test pipeline driver
//!
//! Builds the package artifact (wheel or conda), stands up an isolated test
//! environment, runs the selected integration tests and exits with the
//! interpreted runner status.
//!
//! Exit codes: 0 success; 1 usage or pipeline error; otherwise the test
//! runner's exit code, with "no tests collected" (5) remapped to 0 under
//! merge_gate mode.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use relgate_ci::ReleasePipeline;
use relgate_core::{init_tracing, EnvKind, Mode, Platform, RunConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "relgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release-test pipeline driver", long_about = None)]
struct Cli {
    /// Workspace root of the package under test
    workspace: PathBuf,

    /// Bazel binary to invoke
    #[arg(short = 'b', long, default_value = "bazel")]
    bazel_path: PathBuf,

    /// Environment kind: pip or conda
    #[arg(short = 'e', long, default_value = "pip")]
    env: EnvKind,

    /// Run mode: merge_gate, continuous_run or release
    #[arg(long, default_value = "continuous_run")]
    mode: Mode,

    /// Also build and install the companion snowpark package
    #[arg(long)]
    with_snowpark: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines and a JSON result summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let status: u8 = match err.kind() {
                // --help/--version are not usage errors.
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            return ExitCode::from(status);
        }
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("relgate: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    // Fail fast on unsupported hosts, before any tool download.
    let platform = Platform::detect()?;

    let workspace = cli
        .workspace
        .canonicalize()
        .with_context(|| format!("workspace not found: {}", cli.workspace.display()))?;

    let config = RunConfig {
        workspace,
        bazel_path: cli.bazel_path,
        env: cli.env,
        mode: cli.mode,
        with_snowpark: cli.with_snowpark,
        platform,
    };

    let result = ReleasePipeline::run(&config).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(process_status(result.verdict.final_exit_code))
}

/// Clamp an interpreted exit code into the process status range.
fn process_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_flag_set() {
        let cli = Cli::try_parse_from([
            "relgate",
            "/ws",
            "-b",
            "/opt/bazel",
            "-e",
            "conda",
            "--mode",
            "release",
            "--with-snowpark",
        ])
        .expect("parse failed");

        assert_eq!(cli.workspace, PathBuf::from("/ws"));
        assert_eq!(cli.bazel_path, PathBuf::from("/opt/bazel"));
        assert_eq!(cli.env, EnvKind::Conda);
        assert_eq!(cli.mode, Mode::Release);
        assert!(cli.with_snowpark);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["relgate", "/ws"]).expect("parse failed");
        assert_eq!(cli.env, EnvKind::Pip);
        assert_eq!(cli.mode, Mode::ContinuousRun);
        assert!(!cli.with_snowpark);
        assert!(!cli.json);
    }

    #[test]
    fn test_unknown_mode_is_usage_error() {
        let err = Cli::try_parse_from(["relgate", "/ws", "--mode", "nightly"]).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_unknown_env_is_usage_error() {
        assert!(Cli::try_parse_from(["relgate", "/ws", "-e", "docker"]).is_err());
    }

    #[test]
    fn test_missing_workspace_is_usage_error() {
        assert!(Cli::try_parse_from(["relgate"]).is_err());
    }

    #[test]
    fn test_process_status_clamps() {
        assert_eq!(process_status(0), 0);
        assert_eq!(process_status(5), 5);
        assert_eq!(process_status(-1), 1);
        assert_eq!(process_status(512), 1);
    }
}
