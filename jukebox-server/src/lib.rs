use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod errors;
mod player;
mod rooms;
mod schemas;
mod serialized;
mod session;
mod tracks;

pub mod logging;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9080;

pub type Router = axum::Router<ServerContext>;

/// Starts the jukebox server
pub async fn run_server(context: ServerContext) {
    let port = env::var("JUKEBOX_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/rooms", rooms::router())
        .nest("/player", player::router())
        .route("/search", get(tracks::search))
        .route("/queue", post(tracks::queue))
        .route("/votes", post(player::vote));

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs until shutdown");
}
