use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use snowflake_id::Snowflake;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use redis_utils::RedisPool;
use video_cache::{CacheMetrics, RedisCache, VideoCache};
use video_service::config::Config;
use video_service::handlers;
use video_service::repository::{MySqlVideoRepository, VideoRepository};
use video_service::services::{
    BlobStore, KafkaTaskPublisher, NoopTaskPublisher, S3BlobStore, ServiceDeps, Services,
    TaskPublisher,
};

fn init_tracing(log_format: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.log_format);

    info!("Starting video-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    // MySQL
    let db_config = config.db_pool_config();
    db_config.log_config();
    let db_pool = db_pool::create_pool(db_config)
        .await
        .context("Failed to create database pool")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
    }
    let repo: Arc<dyn VideoRepository> = Arc::new(MySqlVideoRepository::new(db_pool));

    // Redis
    let redis = RedisPool::connect_with_retry(
        &config.redis.url,
        config.redis.connect_attempts,
        Duration::from_millis(500),
    )
    .await
    .context("Failed to connect to Redis")?;
    let cache = VideoCache::new(Arc::new(RedisCache::new(redis.manager())));
    if let Err(e) = CacheMetrics::register(prometheus::default_registry()) {
        warn!(error = %e, "Failed to register cache metrics");
    }

    // Id generator
    let ids = Snowflake::new(config.snowflake.datacenter_id, config.snowflake.worker_id)
        .context("Invalid snowflake configuration")?
        .with_max_backward_ms(config.snowflake.max_backward_ms);
    info!(
        datacenter_id = ids.datacenter_id(),
        worker_id = ids.worker_id(),
        max_backward_ms = ids.max_backward_ms(),
        "Snowflake id generator ready"
    );

    // Object storage and upload queue
    let blobs: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(&config.s3).await);
    let publisher: Arc<dyn TaskPublisher> = match &config.kafka {
        Some(kafka) => Arc::new(
            KafkaTaskPublisher::new(kafka).context("Failed to create Kafka producer")?,
        ),
        None => {
            warn!("KAFKA_BROKERS not set, upload tasks will not be published");
            Arc::new(NoopTaskPublisher)
        }
    };

    let services = Services::build(ServiceDeps {
        cache,
        repo,
        ids: Arc::new(ids),
        blobs,
        publisher,
        scorer: config.ranking.scorer(),
    });

    let aggregator = services.views.clone().start(config.views.interval());

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    info!("Starting HTTP server on {}", bind_address);

    let app_services = web::Data::new(services);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(app_services.clone())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);

    let stopped_early = tokio::select! {
        result = &mut server_task => Some(result),
        _ = shutdown_signal() => None,
    };
    let server_result = match stopped_early {
        Some(result) => {
            warn!("HTTP server stopped without a shutdown signal");
            result
        }
        None => {
            info!("Shutdown signal received");
            server_handle.stop(true).await;
            server_task.await
        }
    };
    match server_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server exited with error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }

    match aggregator.shutdown(config.views.shutdown_timeout()).await {
        Ok(report) => info!(
            updated = report.updated,
            skipped = report.skipped,
            "View counters flushed"
        ),
        Err(e) => error!(error = %e, "Final view flush incomplete"),
    }

    info!("Video-service shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
