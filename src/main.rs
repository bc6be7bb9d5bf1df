//! riskline

use std::sync::Arc;
use std::time::Duration;

use riskline::bus::{InMemoryPublisher, KafkaConsumer, KafkaPublisher};
use riskline::cache::MerchantStatsCache;
use riskline::config::Config;
use riskline::features::FeatureEngineer;
use riskline::history::{HistoryStore, InMemoryHistoryStore, PostgresHistoryStore};
use riskline::metrics::Metrics;
use riskline::pipeline::Pipeline;
use riskline::scoring::{EnsembleScorer, Scorer};
use riskline::server::create_app;
use riskline::stream::StreamProcessor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STREAM_CONSUMER_GROUP: &str = "risk-evaluator";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "riskline=info,tower_http=debug,axum::rejection=trace".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        environment = %config.server.environment,
        "starting risk evaluator"
    );

    let history: Arc<dyn HistoryStore> = match PostgresHistoryStore::connect(&config.database.database_url, config.database.max_connections).await {
        Ok(store) => {
            store.migrate().await?;
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no database connectivity at startup, falling back to in-memory history store");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let publisher: Arc<dyn riskline::bus::Publisher> =
        match KafkaPublisher::new(&config.bus.bootstrap_servers, &config.bus.transactions_topic, &config.bus.alerts_topic) {
            Ok(producer) => Arc::new(producer),
            Err(e) => {
                tracing::warn!(error = %e, "no Kafka connectivity at startup, falling back to in-memory publisher");
                Arc::new(InMemoryPublisher::new())
            }
        };

    let scorer: Arc<dyn Scorer> = Arc::new(EnsembleScorer::load_or_train(&config.scoring)?);

    let merchant_cache = MerchantStatsCache::new(
        history.clone(),
        config.scoring.merchant_cache_capacity,
        config.scoring.merchant_cache_ttl_seconds,
    );
    let feature_engineer = Arc::new(FeatureEngineer::new(history.clone(), merchant_cache));
    let pipeline = Arc::new(Pipeline::new(history.clone(), feature_engineer, scorer));
    let metrics = Arc::new(Metrics::new()?);

    if let Ok(consumer) = KafkaConsumer::new(&config.bus.bootstrap_servers, STREAM_CONSUMER_GROUP, &config.bus.transactions_topic) {
        let stream_publisher = publisher.clone();
        let stream_pipeline = pipeline.clone();
        let stream_deadline = Duration::from_millis(config.server.stream_deadline_ms);
        tokio::spawn(async move {
            let processor = StreamProcessor::new(Arc::new(consumer), stream_publisher, stream_pipeline, stream_deadline);
            processor.run().await;
        });
    } else {
        tracing::warn!("no Kafka connectivity, stream processor not started; serving the synchronous path only");
    }

    let app = create_app(history, publisher, pipeline, metrics, &config);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(address = %addr, "server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await.map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    Ok(())
}
