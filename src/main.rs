use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{debug, error};
use yubikiller::api::verify::YUBICO_API_URL;
use yubikiller::{Context, ValidationError, Validator, VerifyResponse};

/// Invalidates a YubiKey OTP by submitting it to the validation service.
#[derive(Parser, Debug)]
#[command(name = "yubikiller", version)]
struct Cli {
    /// The OTP to invalidate
    otp: String,

    /// Verification endpoint, including the client `id` parameter
    #[arg(long, env = "YUBIKILLER_ENDPOINT", default_value = YUBICO_API_URL)]
    endpoint: String,

    /// Give up after this many seconds
    #[arg(long, env = "YUBIKILLER_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Print the service response as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            println!("requires exactly 1 yubikey OTP to invalidate");
            e.print().ok();
            return ExitCode::from(2);
        }
        Err(e) => {
            // --help and --version
            e.print().ok();
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli).await {
        Ok(response) => {
            if cli.json {
                print_json(&response);
            }
            println!("successfully invalidated token");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.json {
                if let Some(response) = e.downcast_ref::<ValidationError>().and_then(|e| e.response()) {
                    print_json(response);
                }
            }
            println!("encountered error invalidating token: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli) -> Result<VerifyResponse> {
    let (ctx, cancel) = Context::with_cancel();
    let ctx = ctx.with_timeout(Duration::from_secs(cli.timeout));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            cancel.cancel();
        }
    });

    let validator = Validator::with_endpoint(&cli.endpoint);
    validator
        .invalidate(&ctx, &cli.otp)
        .await
        .with_context(|| format!("verification against {} failed", validator.endpoint()))
}

fn print_json(response: &VerifyResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to encode response: {}", e),
    }
}
