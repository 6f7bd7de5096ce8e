use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json,
};
use log::warn;
use serde::Deserialize;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{AuthStatus, AuthUrl},
    session::HostUser,
    Router,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Returns the provider consent URL the host should be sent to
async fn url(State(context): State<ServerContext>, _host: HostUser) -> Json<AuthUrl> {
    Json(AuthUrl {
        url: context.jukebox.tokens.authorize_url(),
    })
}

/// The provider redirects here after the consent screen
async fn callback(
    State(context): State<ServerContext>,
    HostUser(host): HostUser,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    if params.error.is_some() {
        return Redirect::to("/?error=access_denied");
    }

    let Some(code) = params.code else {
        return Redirect::to("/?error=access_denied");
    };

    match context.jukebox.tokens.exchange_code(&host, &code).await {
        Ok(()) => Redirect::to("/"),
        Err(e) => {
            warn!("Code exchange for {host} failed: {e}");
            Redirect::to("/?error=exchange_failed")
        }
    }
}

/// Whether the host has a linked provider account
async fn status(
    State(context): State<ServerContext>,
    HostUser(host): HostUser,
) -> ServerResult<Json<AuthStatus>> {
    let status = context.jukebox.tokens.is_valid(&host).await?;

    Ok(Json(AuthStatus { status }))
}

pub fn router() -> Router {
    Router::new()
        .route("/url", get(url))
        .route("/callback", get(callback))
        .route("/status", get(status))
}
