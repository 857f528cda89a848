//! Thin CLI wrapper. `--ui` and `--mcp` are documented extension points
//! for transports this crate does not implement; the default path runs
//! the in-process [`Orchestrator`] against a requirements string read
//! from the positional argument or stdin.

use std::io::Read;

use clap::Parser;
use codeforge_config::Config;
use codeforge_orchestrator::{CancellationHandle, FinalStatus};
use codeforge_utils::UserFriendlyError;

use crate::wiring::build_orchestrator;

#[derive(Parser)]
#[command(name = "codeforge")]
#[command(about = "Autonomous multi-agent code generation pipeline: architect, coder, tester, debugger")]
#[command(version)]
pub struct Cli {
    /// Natural-language description of the program to generate. Reads
    /// from stdin when omitted.
    pub requirements: Option<String>,

    /// Launch the graphical/CLI front-end instead of running once
    /// in-process. Not implemented by this binary: the UI is an
    /// external collaborator, not part of this core.
    #[arg(long)]
    pub ui: bool,

    /// Expose the Architect/Coder/Tester/Debugger roles as a JSON-RPC
    /// stdio server instead of running the pipeline once. Not
    /// implemented by this binary.
    #[arg(long)]
    pub mcp: bool,
}

/// Parses arguments, initializes logging, and runs the pipeline once.
/// Returns the process exit code: 0 on success, 1 otherwise.
pub async fn run() -> i32 {
    init_tracing();
    let cli = Cli::parse();

    if cli.ui || cli.mcp {
        eprintln!(
            "codeforge: --ui and --mcp are documented extension points; this binary only runs the in-process pipeline"
        );
        return 1;
    }

    let requirements = match cli.requirements {
        Some(r) => r,
        None => match read_stdin() {
            Ok(r) if !r.trim().is_empty() => r,
            _ => {
                eprintln!("codeforge: no requirements provided (pass as an argument or pipe via stdin)");
                return 1;
            }
        },
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("codeforge: {}", e.user_message());
            return 1;
        }
    };

    let cancellation = CancellationHandle::new();
    install_cancellation_on_ctrl_c(cancellation.clone());

    let orchestrator = build_orchestrator(&config, cancellation);
    let result = orchestrator.run(&requirements).await;

    match result.final_status {
        FinalStatus::Success => {
            tracing::info!(
                debugger_fixed = result.debugger_fixed,
                total_tokens = result.usage_summary.total_tokens,
                "run succeeded"
            );
            println!("success");
            if let Some(code_package) = &result.code_package {
                for filename in code_package.files.keys() {
                    println!("  {filename}");
                }
            }
            0
        }
        FinalStatus::Failed => {
            eprintln!(
                "codeforge: the pipeline could not produce passing code after {} debug attempt(s)",
                result.debug_result.as_ref().map(|d| d.attempts.len()).unwrap_or(0)
            );
            1
        }
        FinalStatus::Error => {
            if let Some(message) = &result.error {
                eprintln!("codeforge: {message}");
            }
            1
        }
    }
}

fn read_stdin() -> std::io::Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

fn install_cancellation_on_ctrl_c(cancellation: CancellationHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("cancellation requested");
            cancellation.cancel();
        }
    });
}
