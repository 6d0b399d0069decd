use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use reclaim_api::auth::{create_account, RegisterRequest};
use reclaim_api::{app, state::{AppState, AuthConfig}};
use reclaim_core::payment::PaymentGateway;
use reclaim_core::{Role, Stores};
use reclaim_pickup::{PricingPolicy, RazorpayGateway, SimulatedGateway};
use reclaim_store::app_config::{BootstrapAdmin, Config, PaymentProvider};
use reclaim_store::{DbClient, MemoryStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reclaim_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Reclaim API on port {}", config.server.port);

    let stores = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            db.stores()
        }
        None => {
            tracing::warn!("No database.url configured, using the in-memory store");
            MemoryStore::new().into_stores()
        }
    };

    if let Some(admin) = &config.auth.bootstrap_admin {
        bootstrap_admin(&stores, admin).await?;
    }

    let gateway: Arc<dyn PaymentGateway> = match config.payment.provider {
        PaymentProvider::Razorpay => Arc::new(
            RazorpayGateway::new(&config.payment.base_url, &config.payment.key_id, &config.payment.key_secret)
                .context("Failed to build Razorpay client")?,
        ),
        PaymentProvider::Simulated => {
            Arc::new(SimulatedGateway::new(&config.payment.key_id, &config.payment.key_secret))
        }
    };
    tracing::info!("Payment provider: {}", gateway.provider());

    let policy = PricingPolicy {
        rate_paise_per_gram: config.pricing.rate_paise_per_gram,
        minimum_amount: config.pricing.minimum_amount,
    };

    let mut app_state = AppState::new(
        stores,
        gateway,
        policy,
        &config.payment.currency,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    if let Some(url) = &config.redis.url {
        let redis = RedisClient::new(url).await.context("Failed to create Redis client")?;
        if let Err(e) = redis.ping().await {
            tracing::warn!("Redis not reachable yet, rate limiting fails open: {}", e);
        }
        app_state = app_state.with_rate_limit(Arc::new(redis), config.redis.rate_limit_per_minute);
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Make sure the configured admin account exists.
async fn bootstrap_admin(stores: &Stores, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    if stores.users.find_user_by_email(&admin.email).await?.is_some() {
        return Ok(());
    }

    let request = RegisterRequest {
        name: "Administrator".to_string(),
        email: admin.email.clone(),
        password: admin.password.clone(),
        phone: None,
        address: None,
    };
    create_account(stores, request, Role::Admin)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {:?}", e))?;
    tracing::info!("Bootstrap admin account created");
    Ok(())
}
