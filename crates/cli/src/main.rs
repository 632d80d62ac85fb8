use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use catalyst_browser::{BrowserRuntimeConfig, Credentials, LoginParams, detect, run_login};

#[derive(Parser)]
#[command(name = "catalyst", about = "Catalyst — Biopharm Catalyst login gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    // Gateway arguments (used when no subcommand is provided, or with the
    // `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true, env = "PORT")]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Run one login inline and print the harvested cookies as JSON.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Check whether a usable browser is installed and print its version.
    Doctor,
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        None | Some(Commands::Gateway) => {
            catalyst_gateway::start_gateway(cli.bind, cli.port).await
        },
        Some(Commands::Login { email, password }) => login_once(email, password).await,
        Some(Commands::Doctor) => doctor().await,
    }
}

/// One inline login attempt, printed as the same JSON the HTTP surface maps.
async fn login_once(email: String, password: String) -> anyhow::Result<()> {
    let config = catalyst_config::discover_and_load();
    let browser = BrowserRuntimeConfig::from(&config.browser);
    let params = LoginParams::from(&config.login);
    let credentials = Credentials { email, password };

    let outcome = run_login(&browser, &params, &credentials).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Report which browser the launcher would find, with its version string.
async fn doctor() -> anyhow::Result<()> {
    let config = catalyst_config::discover_and_load();
    let detection = detect::detect_browser(config.browser.chrome_path.as_deref());

    match detection.path {
        Some(path) => {
            let version = detect::browser_version(&path)
                .await
                .unwrap_or_else(|| "unknown version".into());
            println!("browser: {} ({version})", path.display());
            Ok(())
        },
        None => {
            println!("no browser found");
            println!("{}", detection.install_hint);
            std::process::exit(1);
        },
    }
}
