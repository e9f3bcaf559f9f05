//! Health endpoints: liveness, readiness and leadership probes.
//!
//! `/health/leader` reads the same [`LeadershipFlag`] the elector and the
//! heartbeat loop publish to, so it reflects this process's view without
//! touching the coordination store.
use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{AppName, InstanceId, LeadershipFlag};

/// Shared health state for readiness and liveness checks.
/// Track readiness and whether the process should report itself as alive to orchestrators.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger restarts.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Identity and leadership flag of this process.
#[derive(Debug, Clone)]
pub struct LeaderState {
    instance_id: InstanceId,
    app_name: AppName,
    leadership: LeadershipFlag,
}

impl LeaderState {
    /// Bind the probe to an elector's identity and flag.
    pub fn new(instance_id: InstanceId, app_name: AppName, leadership: LeadershipFlag) -> Self {
        Self {
            instance_id,
            app_name,
            leadership,
        }
    }

    fn snapshot(&self) -> LeaderStatusResponse {
        LeaderStatusResponse {
            instance_id: self.instance_id.to_string(),
            app_name: self.app_name.as_str().to_owned(),
            is_leader: self.leadership.is_leader(),
        }
    }
}

/// Body of `/health/leader`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderStatusResponse {
    instance_id: String,
    app_name: String,
    is_leader: bool,
}

/// Readiness probe. Return 200 once the listener is bound; return 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
/// Call `HealthState::mark_unhealthy` before graceful shutdown to surface the drain early.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

/// Leadership probe. Always 200; the body says whether this instance leads.
#[get("/health/leader")]
pub async fn leader(state: web::Data<LeaderState>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(state.snapshot())
}
