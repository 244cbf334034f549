use std::sync::Arc;

use mika::channels::{TwilioMediaFetcher, whatsapp_routes};
use mika::coach::CoachAgent;
use mika::config::CoachConfig;
use mika::llm::AnthropicProvider;
use mika::store::LibSqlStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CoachConfig::from_env()?;

    eprintln!("🥗 Coach Mika v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);

    let store = Arc::new(LibSqlStore::new_local(&config.db_path).await?);

    let llm = Arc::new(AnthropicProvider::new(
        config.api_key.clone(),
        config.model.clone(),
        config.max_tokens,
        config.llm_timeout,
    ));

    let mut agent = CoachAgent::new(store, llm);
    match (&config.twilio_account_sid, &config.twilio_auth_token) {
        (Some(sid), Some(token)) => {
            eprintln!("   Media: Twilio fetch enabled");
            agent = agent.with_media(Arc::new(TwilioMediaFetcher::new(
                sid.clone(),
                token.clone(),
            )));
        }
        _ => eprintln!("   Media: disabled (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN not set)"),
    }

    let app = whatsapp_routes(Arc::new(agent));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
