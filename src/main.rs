use candidate_sync::action::{ActionExecutor, DryRunExecutor, WebhookExecutor};
use candidate_sync::breaker::{BreakerRegistry, DependencyClass};
use candidate_sync::config::SyncConfig;
use candidate_sync::feed::{ChangeFeedClient, TopicsClient};
use candidate_sync::lease::{InstanceId, LeaseCoordinator};
use candidate_sync::ledger::IdempotencyLedger;
use candidate_sync::persistence::FilePersistence;
use candidate_sync::store::ObjectStore;
use candidate_sync::store::http::HttpObjectStore;
use candidate_sync::store::memory::MemoryObjectStore;
use candidate_sync::sync::handlers::control_router;
use candidate_sync::sync::{BatchProcessor, DelayPolicy, SyncOrchestrator, SyncWorker};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let program = std::env::args()
                .next()
                .unwrap_or_else(|| "candidate-sync".to_string());
            eprintln!("Error: {:#}", e);
            eprintln!(
                "Usage: {} [--bucket <name>] [--state-dir <dir>] [--instance <label>] [--bind <addr:port>]",
                program
            );
            eprintln!(
                "       [--webhook <url>] [--auto-act] [--poll-secs <n>] [--memory-store] [--breaker <name=t/timeout/reset>]"
            );
            eprintln!("Example: {} --bucket my-bucket --bind 127.0.0.1:8080", program);
            std::process::exit(1);
        }
    };

    let identity = InstanceId::named(&config.instance_label);
    tracing::info!("Starting instance {}", identity);

    // 1. Shared store:
    let store: Arc<dyn ObjectStore> = if config.use_memory_store {
        tracing::info!("Using in-memory store (nothing is shared)");
        Arc::new(MemoryObjectStore::new())
    } else {
        if config.store_access_token.is_none() {
            tracing::warn!("No store access token set, requests are unauthenticated");
        }
        tracing::info!("Using bucket {} at {}", config.bucket, config.store_base_url);
        Arc::new(HttpObjectStore::new(
            &config.store_base_url,
            &config.bucket,
            config.store_access_token.clone(),
            config.request_timeout,
        )?)
    };

    // 2. Local state:
    let persistence = Arc::new(FilePersistence::new(config.state_dir.clone())?);
    let ledger = Arc::new(IdempotencyLedger::load(persistence.clone()));

    // 3. Breakers and action target:
    let breakers = BreakerRegistry::with_settings(config.breaker_settings());
    let executor: Arc<dyn ActionExecutor> = match &config.webhook_url {
        Some(url) => {
            tracing::info!("Posting actions to {}", url);
            Arc::new(WebhookExecutor::new(url, config.request_timeout)?)
        }
        None => {
            tracing::info!("No action target configured, running dry");
            Arc::new(DryRunExecutor)
        }
    };

    // 4. Orchestration:
    let lease = Arc::new(LeaseCoordinator::new(
        store.clone(),
        &config.lease_key,
        identity,
    ));
    let orchestrator = SyncOrchestrator::new(
        ChangeFeedClient::new(store.clone(), &config.document_key),
        lease,
        ledger,
        executor,
        persistence,
        &breakers,
        config.stale_threshold,
    );
    let topics = Arc::new(
        TopicsClient::new(store, &config.topics_key)
            .with_breaker(breakers.get(DependencyClass::Storage)),
    );

    // 5. Background schedule:
    let batch = if config.auto_act && config.webhook_url.is_some() {
        Some(BatchProcessor::new(orchestrator.clone(), DelayPolicy::default()))
    } else {
        if config.auto_act {
            tracing::warn!("--auto-act ignored without --webhook");
        }
        None
    };
    SyncWorker::new(orchestrator.clone(), batch, config.poll_interval).start();

    // 6. Control API:
    let app = control_router(orchestrator, breakers, topics);

    tracing::info!("Control API listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
