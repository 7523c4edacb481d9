use events::{EventDispatcher, EventPublisher};
use log::*;
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger, AppState};
use sse::{Broadcaster, SseDomainEventHandler};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = get_config();

    Logger::init_logger(&config as &Config);
    info!("Starting up Pulse Platform API... [{}]", config.runtime_env());

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(db.as_ref(), None).await {
        error!("Failed to apply database migrations: {e}");
        std::process::exit(1);
    }

    // The one connection registry of this process, shared by the stream
    // endpoints and the dispatch task.
    let broadcaster = Arc::new(Broadcaster::with_queue_capacity(config.sse_queue_capacity));
    let publisher = EventPublisher::new()
        .with_handler(Arc::new(SseDomainEventHandler::new(broadcaster.clone())));
    let (event_dispatcher, dispatch_task) =
        EventDispatcher::spawn(publisher, config.event_dispatch_capacity);

    let app_state = AppState::new(config, &db, broadcaster, event_dispatcher);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with an error: {e}");
        std::process::exit(1);
    }

    dispatch_task.abort();
    info!("Pulse Platform API stopped");
}

fn get_config() -> Config {
    Config::new()
}
