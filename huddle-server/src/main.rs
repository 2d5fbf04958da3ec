use std::{env, sync::Arc};

use huddle_collab::{Huddle, MemoryStore, OllamaClient, Url};
use huddle_core::Config;
use huddle_server::{logging, run_server, ServerContext, ServerSentEvents};
use log::info;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let ai_url = env::var("HUDDLE_OLLAMA_URL")
        .unwrap_or_else(|_| "http://localhost:11434".to_string())
        .parse::<Url>()
        .expect("Ollama URL must be valid");

    let huddle = Arc::new(Huddle::new(
        Config::default(),
        MemoryStore::new(),
        OllamaClient::new(ai_url),
    ));

    huddle.run();

    let sse = ServerSentEvents::new();

    // Fan collab events out to dashboard streams
    let event_huddle = huddle.clone();
    let event_sse = sse.clone();

    tokio::task::spawn_blocking(move || loop {
        let event = event_huddle.wait_for_event();
        event_sse.broadcast(event.into());
    });

    info!("Initialized successfully.");

    run_server(ServerContext { huddle, sse }).await
}
