use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::load_balancer::Worker;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub workers: Vec<Worker>,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_pools(State(state): State<AdminState>) -> Json<BTreeMap<String, PoolStatus>> {
    let pools = state
        .registry
        .snapshot_all()
        .into_iter()
        .map(|(service, workers)| {
            let status = PoolStatus {
                size: workers.len(),
                workers,
            };
            (service, status)
        })
        .collect();

    Json(pools)
}
