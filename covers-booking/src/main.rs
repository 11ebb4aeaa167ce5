use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

mod booking;
mod config;
mod dispatch;
mod events;
mod guests;
mod loyalty;
mod models;
mod outbox;
mod registry;
mod routes;
mod schema;
mod tasks;

use covers_shared::clients::db::{self, DbPool};
use covers_shared::clients::rabbitmq::RabbitMQClient;

use config::AppConfig;
use outbox::channels::{GatewaySender, PushSender, Senders};
use outbox::worker::DeliveryWorker;
use outbox::Channel;
use tasks::TaskWorker;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    covers_shared::middleware::init_tracing("covers-booking");
    let metrics_handle = covers_shared::middleware::init_metrics();

    let config = AppConfig::load()?;
    let port = config.port;

    // Set JWT_SECRET env var for the auth extractor middleware
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = db::create_pool(&config.database_url, config.db_pool_size);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        rabbitmq,
        metrics: metrics_handle,
    });

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.delivery_timeout_secs))
        .build()?;
    let delivery_timeout = Duration::from_secs(config.delivery_timeout_secs);
    let senders = Senders::new()
        .with(
            Channel::Push,
            Arc::new(PushSender::new(
                http.clone(),
                config.webhook_secret.clone(),
                delivery_timeout,
            )),
        )
        .with(
            Channel::Email,
            Arc::new(GatewaySender::new(
                http.clone(),
                config.email_gateway_url.clone(),
                Channel::Email,
                delivery_timeout,
            )),
        )
        .with(
            Channel::Sms,
            Arc::new(GatewaySender::new(
                http,
                config.sms_gateway_url.clone(),
                Channel::Sms,
                delivery_timeout,
            )),
        );

    // Spawn the outbox delivery worker
    let delivery_worker = DeliveryWorker::new(
        db.clone(),
        senders,
        Duration::from_secs(config.outbox_poll_secs),
        config.outbox_batch_size,
        config.delivery_concurrency,
    );
    tokio::spawn(delivery_worker.run());

    // Spawn the scheduled-task worker
    let task_worker = TaskWorker::new(db, Duration::from_secs(config.scheduler_poll_secs));
    tokio::spawn(task_worker.run());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/events", post(routes::events::ingest_event))
        .route("/notifications/broadcast", post(routes::notifications::send_broadcast))
        .route(
            "/push/subscriptions",
            post(routes::subscriptions::register).get(routes::subscriptions::list_own),
        )
        .route(
            "/push/subscriptions/deactivate",
            post(routes::subscriptions::deactivate),
        )
        .route(
            "/restaurants/:id/notification-preferences",
            get(routes::preferences::get_preferences)
                .put(routes::preferences::put_preferences),
        )
        .route("/bookings/:id/history", get(routes::bookings::booking_history))
        .layer(axum::middleware::from_fn(covers_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "covers-booking starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
