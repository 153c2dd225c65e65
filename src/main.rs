use std::sync::Arc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundline::{
    api,
    config::Settings,
    gateway::{PaymentGateway, SslCommerzGateway},
    notify::{LogNotifier, Notifier, SmtpNotifier},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fundline=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting Fundline server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let connect_options = SqliteConnectOptions::from_str(&settings.database.url)?
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect_with(connect_options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let gateway: Arc<dyn PaymentGateway> = Arc::new(SslCommerzGateway::new(settings.gateway.clone())?);
    tracing::info!(
        "Payment gateway at {} ({})",
        settings.gateway.api_base(),
        if settings.gateway.is_live { "live" } else { "sandbox" }
    );
    if !settings.gateway.verify_callbacks {
        tracing::warn!("Gateway callback verification is disabled");
    }

    let notifier: Arc<dyn Notifier> = match settings.smtp.as_ref() {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => {
            tracing::warn!("SMTP not configured, emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let settings = Arc::new(settings);

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        db_pool,
        settings.clone(),
        gateway,
        notifier,
    ));

    let app = api::create_app(service_context, settings.clone());

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
