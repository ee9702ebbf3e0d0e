//! # Plugin Market
//!
//! Backend for the AI plugin marketplace.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or use a .env file)
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export SUPABASE_URL=https://<project>.supabase.co
//! export SUPABASE_ANON_KEY=...
//! export SUPABASE_SERVICE_ROLE_KEY=...
//!
//! # Run the server
//! plugin-market
//! ```

use market_api::{routes, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    print_banner();

    let state = AppState::from_env()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.payments.provider_name());
    if state.config.maintenance_mode {
        warn!("Maintenance mode is ON: all traffic goes to /maintenance");
    }

    let app = routes::create_router(state);

    info!("Plugin Market starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Plugins: GET http://{}/api/plugins", addr);
        info!("Webhook: POST http://{}/api/webhooks/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Human-readable output by default, JSON lines with `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
  Plugin Market
  ━━━━━━━━━━━━━━━━━━━━━━━
  AI plugin marketplace backend
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
