use std::sync::Arc;

use chat_backend::config::{get_config, Storage};
use chat_backend::http::Server;
use chat_backend::model::migrate;
use chat_backend::prelude::*;

#[tokio::main]
async fn main() -> Result<(), chat_backend::Error> {
    // Configure logging.
    Logger::init();

    let config = get_config();

    let repository: Arc<dyn Repository> = match config.general.storage {
        Storage::Postgres => {
            let pool = Pool::from_config(&config.database);
            migrate(&pool).await?;
            Arc::new(PostgresRepository::new(pool))
        }

        Storage::Memory => Arc::new(MemoryRepository::new()),
    };

    let service = ChatMessageService::new(repository);

    Server::new(vec![
        ChatMessageController::new(service).rest("/api/chat-messages")
    ])?
    .launch()
    .await?;

    Ok(())
}
