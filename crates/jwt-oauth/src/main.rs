//! JWT OAuth server - entry point.
//!
//! Runs the grant endpoint standalone with the demo credential policy.
//! Embed the library (`jwt_oauth::server::create_router`) with a real
//! verifier for anything beyond demos.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use jwt_oauth::config::{self, OAuthConfig};
use jwt_oauth::server;

#[derive(Parser, Debug)]
#[command(name = "jwt-oauth")]
#[command(about = "Resource-owner-password OAuth server issuing JWT bearer tokens")]
#[command(version)]
struct Cli {
    /// Token issuer (`iss` claim)
    #[arg(long, env = "OAUTH_ISSUER")]
    issuer: String,

    /// Audience identifier (`aud` claim)
    #[arg(long, env = "OAUTH_AUDIENCE_ID")]
    audience_id: String,

    /// URL-safe base64 signing secret
    #[arg(long, env = "OAUTH_AUDIENCE_SECRET")]
    audience_secret: String,

    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Path to mount the token endpoint at
    #[arg(long, default_value = config::defaults::TOKEN_ENDPOINT_PATH)]
    token_endpoint_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = OAuthConfig::permissive(cli.issuer, cli.audience_id, &cli.audience_secret)?
        .with_token_endpoint_path(cli.token_endpoint_path);

    tracing::warn!(
        "Running with the demo credential policy (password must equal user name); \
         supply a real verifier for production"
    );

    server::serve(&config, cli.port).await
}
