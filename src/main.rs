use anyhow::Context;
use az_list_secrets::config::Args;
use az_list_secrets::{list_vault, KeyVaultError, Reporter, GENERIC_FAILURE_EXIT_CODE};
use clap::Parser;
use std::io::{self, BufWriter};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<KeyVaultError>()
                .map_or(GENERIC_FAILURE_EXIT_CODE, KeyVaultError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let client = args.client();
    let stdout = io::stdout();
    let mut reporter = Reporter::new(BufWriter::new(stdout.lock()));

    list_vault(&client, &args.vault_name, &mut reporter)
        .await
        .with_context(|| format!("Failed to list secrets of Key Vault '{}'", args.vault_name))?;
    Ok(())
}

/// Logs go to stderr so the report on stdout stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
