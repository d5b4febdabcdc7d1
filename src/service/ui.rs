//! Local UI server
//!
//! Serves the rendered view and turns browser requests into [`UiEvent`]s for
//! the controller. It never touches controller state: events go over the
//! controller's channel and views come back through a one-shot reply.
use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::{net::TcpListener, sync::oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    event::{Event, EventSender, UiEvent},
    view::{bid_input_key, Renderer, View},
};

#[derive(Error, Debug)]
pub enum UiError {
    #[error("controller is not running")]
    ControllerGone,

    #[error("rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        let status = match self {
            UiError::ControllerGone => StatusCode::SERVICE_UNAVAILABLE,
            UiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[derive(Clone)]
struct UiState {
    events: EventSender,
    renderer: Arc<Renderer>,
}

impl UiState {
    fn send(&self, event: UiEvent) -> Result<(), UiError> {
        self.events
            .send(Event::Ui(event))
            .map_err(|_| UiError::ControllerGone)
    }

    async fn snapshot(&self) -> Result<View, UiError> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Snapshot(tx))
            .map_err(|_| UiError::ControllerGone)?;
        rx.await.map_err(|_| UiError::ControllerGone)
    }
}

#[derive(Deserialize)]
struct RegisterForm {
    name: String,
}

#[derive(Deserialize)]
struct BidForm {
    product: String,
    amount: String,
}

pub fn router(events: EventSender) -> Result<Router> {
    let state = UiState {
        events,
        renderer: Arc::new(Renderer::new()?),
    };

    Ok(Router::new()
        .route("/", get(page))
        .route("/state", get(view_state))
        .route("/events", post(ui_event))
        .route("/register", post(register_form))
        .route("/bid", post(bid_form))
        .route("/refresh", post(refresh_form))
        .with_state(state))
}

pub async fn run_http_server(
    address: SocketAddr,
    events: EventSender,
    stop: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind ui server to {address}"))?;
    serve(listener, events, stop).await
}

pub async fn serve(listener: TcpListener, events: EventSender, stop: CancellationToken) -> Result<()> {
    let app = router(events)?;
    info!(address = %listener.local_addr()?, "ui server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await
        .context("Failed to run ui server")?;

    info!("ui server stopped");
    Ok(())
}

async fn page(State(state): State<UiState>) -> Result<Html<String>, UiError> {
    let view = state.snapshot().await?;
    Ok(Html(state.renderer.render(&view)?))
}

async fn view_state(State(state): State<UiState>) -> Result<Json<View>, UiError> {
    Ok(Json(state.snapshot().await?))
}

async fn ui_event(
    State(state): State<UiState>,
    Json(event): Json<UiEvent>,
) -> Result<StatusCode, UiError> {
    debug!(?event, "ui event");
    state.send(event)?;
    Ok(StatusCode::ACCEPTED)
}

async fn register_form(
    State(state): State<UiState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, UiError> {
    state.send(UiEvent::Register { name: form.name })?;
    Ok(Redirect::to("/"))
}

/// A plain form carries the typed amount along with the submit
async fn bid_form(
    State(state): State<UiState>,
    Form(form): Form<BidForm>,
) -> Result<Redirect, UiError> {
    state.send(UiEvent::Input {
        key: bid_input_key(&form.product),
        value: form.amount,
        selection: None,
    })?;
    state.send(UiEvent::PlaceBid {
        product: form.product,
    })?;
    Ok(Redirect::to("/"))
}

async fn refresh_form(State(state): State<UiState>) -> Result<Redirect, UiError> {
    state.send(UiEvent::ManualRefresh)?;
    Ok(Redirect::to("/"))
}
