//! Prometheus metrics and the health/metrics HTTP server.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `migration_reconcile_total` | Counter | `result` |
//! | `migration_backups_created_total` | Counter | |
//! | `migration_backups_deleted_total` | Counter | |
//! | `migration_policies_applied_total` | Counter | |

use crate::error::ControllerError;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Controller metrics registered on a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
    backups_created_total: IntCounter,
    backups_deleted_total: IntCounter,
    policies_applied_total: IntCounter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconcile_total = IntCounterVec::new(
            Opts::new("migration_reconcile_total", "StatefulMigration reconciles by result"),
            &["result"],
        )?;
        let backups_created_total = IntCounter::new(
            "migration_backups_created_total",
            "CheckpointBackups created",
        )?;
        let backups_deleted_total = IntCounter::new(
            "migration_backups_deleted_total",
            "CheckpointBackups deleted as orphans or during teardown",
        )?;
        let policies_applied_total = IntCounter::new(
            "migration_policies_applied_total",
            "PropagationPolicies created or replaced",
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(backups_created_total.clone()))?;
        registry.register(Box::new(backups_deleted_total.clone()))?;
        registry.register(Box::new(policies_applied_total.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
            backups_created_total,
            backups_deleted_total,
            policies_applied_total,
        })
    }

    pub fn reconcile_succeeded(&self) {
        self.reconcile_total.with_label_values(&["success"]).inc();
    }

    pub fn reconcile_failed(&self) {
        self.reconcile_total.with_label_values(&["error"]).inc();
    }

    pub fn backup_created(&self) {
        self.backups_created_total.inc();
    }

    pub fn backup_deleted(&self) {
        self.backups_deleted_total.inc();
    }

    pub fn policy_applied(&self) {
        self.policies_applied_total.inc();
    }

    /// Current count for a reconcile result label
    pub fn reconcile_count(&self, result: &str) -> u64 {
        self.reconcile_total.with_label_values(&[result]).get()
    }

    pub fn backups_created(&self) -> u64 {
        self.backups_created_total.get()
    }

    pub fn backups_deleted(&self) -> u64 {
        self.backups_deleted_total.get()
    }

    pub fn policies_applied(&self) -> u64 {
        self.policies_applied_total.get()
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode_text(&self) -> Result<String, ControllerError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        text_from_bytes(buffer)
    }
}

fn text_from_bytes(buffer: Vec<u8>) -> Result<String, ControllerError> {
    String::from_utf8(buffer)
        .map_err(|e| ControllerError::Metrics(prometheus::Error::Msg(format!("metrics output is not UTF-8: {}", e))))
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    match metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Routes for liveness, readiness and metrics
pub fn probe_routes(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

/// Serve the probe routes until the listener fails
pub async fn serve_probes(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, probe_routes(metrics)).await?;
    Ok(())
}
