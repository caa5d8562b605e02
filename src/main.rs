//! relay-bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags
//!   3. Load and validate config
//!   4. Resolve effective log level (CLI `-v` flags > env > config)
//!   5. Init logger once
//!   6. Build provider + relay
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run the selected channel until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use relay_bot::comms::{self, ChannelKind};
use relay_bot::config::{self, Config};
use relay_bot::error::AppError;
use relay_bot::llm::OpenAiCompatibleProvider;
use relay_bot::logger;
use relay_bot::relay::Relay;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;
    let channel = ChannelKind::from_interactive(args.interactive);
    comms::check(channel, &config)?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        model = %config.llm.model,
        timeout_seconds = config.llm.timeout_seconds,
        effective_log_level = %effective_log_level,
        channel = channel.as_str(),
        "config loaded"
    );

    let provider = OpenAiCompatibleProvider::new(&config.llm)
        .map_err(|e| AppError::Provider(e.to_string()))?;
    let endpoint = provider.endpoint();
    let relay = Arc::new(Relay::new(provider));

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, &endpoint, channel);

    comms::run(channel, &config, relay, shutdown.clone()).await?;

    shutdown.cancel();
    info!("relay-bot stopped");
    Ok(())
}

fn print_startup_summary(config: &Config, endpoint: &str, channel: ChannelKind) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        if text.chars().count() >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ 🚀 {}║", fit(format!("Starting {}", config.bot_name)));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🎯 {}║", fit(format!("endpoint: {endpoint}")));
    println!("║ 🧠 {}║", fit(format!("model: {}", config.llm.model)));
    println!("║ 🔑 {}║", fit(format!("api key: {}", mask_secret(&config.llm.api_key))));
    println!("║ ⏱️  {}║", fit(format!("timeout: {}s", config.llm.timeout_seconds)));
    println!("║ 📡 {}║", fit(format!("channel: {}", channel.as_str())));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

/// Keep only the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: relay-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Relay stdin lines instead of Telegram messages");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!();
                println!("Environment: TG_TOKEN, BASE_URL, API_KEY, MODEL_NAME, SYSTEM_PROMPT, RELAY_LOG_LEVEL");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs {
        log_level: logger::level_for_verbosity(verbosity),
        interactive,
        config_path,
    }
}
