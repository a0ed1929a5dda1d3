use actix_web::http::StatusCode;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer, Result as ActixResult};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::scale::{ReadingOutcome, ReadingService, WeightUnit};
use crate::tunnel::TunnelSource;
use crate::utils::error::ScaleError;

pub const NO_READING_MESSAGE: &str = "No reading captured yet";

#[derive(Debug, Serialize)]
pub struct LastReadingResponse {
    pub weight: f64,
    pub unit: WeightUnit,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

// API Service state
#[derive(Clone)]
pub struct ApiServiceState {
    pub reading_service: Arc<ReadingService>,
    pub tunnel: Arc<dyn TunnelSource>,
}

impl ApiServiceState {
    pub fn new(reading_service: Arc<ReadingService>, tunnel: Arc<dyn TunnelSource>) -> Self {
        Self {
            reading_service,
            tunnel,
        }
    }
}

pub struct ApiService {
    state: ApiServiceState,
    server_handle: Option<actix_web::dev::ServerHandle>,
}

impl ApiService {
    pub fn new(state: ApiServiceState) -> Self {
        Self {
            state,
            server_handle: None,
        }
    }

    pub async fn start(&mut self, config: &Config) -> Result<(), ScaleError> {
        let bind_address = config.bind_address();
        info!("🌐 Starting HTTP API server on {}", bind_address);

        let state_data = web::Data::new(self.state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state_data.clone())
                .wrap(Logger::default())
                .configure(configure_routes)
        })
        .bind(&bind_address)
        .map_err(|e| ScaleError::ConfigError(format!("Cannot bind {}: {}", bind_address, e)))?
        .run();

        self.server_handle = Some(server.handle());

        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("❌ HTTP API server error: {}", e);
            }
        });

        info!("✅ HTTP API server listening on {}", bind_address);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), ScaleError> {
        info!("🛑 Stopping HTTP API server...");

        if let Some(handle) = self.server_handle.take() {
            tokio::select! {
                _ = handle.stop(true) => {
                    info!("✅ HTTP API server stopped gracefully");
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(10)) => {
                    warn!("⚠️  HTTP API server shutdown timeout, forcing stop");
                    handle.stop(false).await;
                }
            }
        }

        Ok(())
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/read-scale", web::get().to(read_scale))
        .route("/last-reading", web::get().to(last_reading))
        .route("/tunnel-info", web::get().to(tunnel_info))
        .route("/health", web::get().to(health_check));
}

/// Maps a [`ReadingOutcome`] onto the `/read-scale` wire contract.
pub fn outcome_response(outcome: &ReadingOutcome) -> HttpResponse {
    let status = StatusCode::from_u16(outcome.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(outcome.body())
}

// GET /read-scale
async fn read_scale(state: web::Data<ApiServiceState>) -> ActixResult<HttpResponse> {
    let service = state.reading_service.clone();

    // serial reads block for up to the port timeout
    let outcome = match web::block(move || service.get_weight()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("❌ Scale read task failed: {}", e);
            ReadingOutcome::IoError(e.to_string())
        }
    };

    Ok(outcome_response(&outcome))
}

// GET /last-reading
async fn last_reading(state: web::Data<ApiServiceState>) -> ActixResult<HttpResponse> {
    match state.reading_service.last_reading() {
        Some(reading) => Ok(HttpResponse::Ok().json(LastReadingResponse {
            weight: reading.value,
            unit: reading.unit,
            captured_at: reading.captured_at,
        })),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse::new(NO_READING_MESSAGE))),
    }
}

// GET /tunnel-info
async fn tunnel_info(state: web::Data<ApiServiceState>) -> ActixResult<HttpResponse> {
    let status = state.tunnel.get_tunnel_info().await;
    Ok(HttpResponse::Ok().json(status))
}

// GET /health
async fn health_check(state: web::Data<ApiServiceState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "USB Scale API",
        "has_reading": state.reading_service.last_reading().is_some(),
        "timestamp": Utc::now(),
        "version": crate::VERSION
    })))
}
