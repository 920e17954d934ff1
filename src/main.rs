// src/main.rs
use brokercorp::api::{self, AppState};
use brokercorp::assistant::Assistant;
use brokercorp::chance::ThreadRandom;
use brokercorp::config::{Config, StoreBackend};
use brokercorp::db::{MemoryStore, ScyllaStore, Store};
use brokercorp::llm::OpenAiClient;
use brokercorp::seed::init_dummy_data;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = Config::from_env();
    info!("Starting BrokerCorp trading API with {:?}", config);

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Scylla => {
            match ScyllaStore::connect(&config.database_url, &config.db_name).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to initialize database {}: {}", config.database_url, e);
                    return;
                }
            }
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!("Connected to database...");

    // Seeding must finish before the server accepts traffic.
    let mut rng = StdRng::from_entropy();
    if let Err(e) = init_dummy_data(store.as_ref(), &mut rng).await {
        error!("Failed to seed dummy data: {}", e);
        return;
    }
    info!("Vulnerable stock trading app initialized with dummy data");

    let model = match OpenAiClient::new(
        &config.openai_base_url,
        &config.effective_openai_key(),
        &config.openai_model,
    ) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            error!("Failed to build model client: {}", e);
            return;
        }
    };

    let assistant = Assistant::new(
        store.clone(),
        model,
        Arc::new(ThreadRandom),
        config.assistant.clone(),
        config.reported_openai_key(),
    );
    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState {
        store,
        assistant,
        config,
    });

    info!("Server running on http://{}", bind_addr);
    warp::serve(api::app(state)).run(bind_addr).await;
}
