use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod context;
mod errors;
mod gateway;
mod schemas;
mod serialized;
mod sessions;
mod sse;

pub mod logging;

pub use context::*;
pub use errors::*;
pub use sse::{ServerEvent, ServerSentEvents};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 5001;

pub type Router = axum::Router<ServerContext>;

/// Starts the huddle server
pub async fn run_server(context: ServerContext) {
    let port = env::var("HUDDLE_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/sessions", sessions::router())
        .nest("/events", sse::router())
        .nest("/gateway", gateway::router());

    let app = Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}
