//! Web backend for the slide viewer
//!
//! - `GET /` viewer page, `GET /static/*` assets
//! - `GET /pdf/{name}` the slide deck
//! - `GET /slide_texts` the slide table
//! - `POST /ask_gemini` question about one slide
//! - `POST /process_pdf` start a pipeline job, `GET /jobs[/{id}]` poll it

pub mod handlers;
pub mod json_error;
pub mod state;

pub use state::AppState;

// Server related imports
use axum::{
    http::{self, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

// General imports
use anyhow::{Context, Result};
use tokio::net::TcpListener;

use handlers::{ask_gemini, get_job, healthz, index, list_jobs, process_pdf, serve_pdf, slide_texts};

pub struct AppBuilder {
    app: Router,
}

impl AppBuilder {
    pub fn new(state: AppState) -> Self {
        let static_dir = state.static_dir.clone();
        let app: Router = Router::new()
            .route("/", get(index))
            .route("/healthz", get(healthz))
            .route("/pdf/{*name}", get(serve_pdf))
            .route("/slide_texts", get(slide_texts))
            .route("/ask_gemini", post(ask_gemini))
            .route("/process_pdf", post(process_pdf))
            .route("/jobs", get(list_jobs))
            .route("/jobs/{id}", get(get_job))
            .nest_service("/static", ServeDir::new(static_dir))
            .with_state(state);
        Self { app }
    }

    pub fn with_trace_layer(self) -> Self {
        Self {
            app: self.app.layer(TraceLayer::new_for_http()),
        }
    }

    pub fn with_cors_layer(self) -> Self {
        let cors_layer = if cfg!(debug_assertions) {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([http::header::CONTENT_TYPE])
                .allow_origin(AllowOrigin::any())
        };
        Self {
            app: self.app.layer(cors_layer),
        }
    }

    pub fn build(self) -> Router {
        self.app
    }
}

pub struct Server {
    state: AppState,
    bind: String,
}

impl Server {
    pub fn new(state: AppState, bind: impl Into<String>) -> Self {
        Self {
            state,
            bind: bind.into(),
        }
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let app = AppBuilder::new(self.state)
            .with_trace_layer()
            .with_cors_layer()
            .build();

        let listener = TcpListener::bind(&self.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.bind))?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server shutdown")?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
