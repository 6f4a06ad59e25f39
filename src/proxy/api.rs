//! Management API handlers under `/1/lb/`.
//!
//! # Responsibilities
//! - Add and remove nodes (`PUT`/`DELETE /1/lb/nodes`)
//! - Report tracked nodes and their routability (`GET /1/lb/nodes`)
//! - Report recent throughput samples (`GET /1/lb/stats`)
//!
//! # Design Decisions
//! - Bodies are parsed by hand so every error answer carries the same
//!   `{"msg": ...}` envelope the success answers use

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::grouper::NodeStatus;
use crate::proxy::server::AppState;
use crate::router::ThroughputStat;

#[derive(Debug, Deserialize)]
struct NodeRequest {
    node: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    msg: String,
}

#[derive(Debug, Serialize)]
struct NodesResponse {
    nodes: BTreeMap<String, NodeStatus>,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    stats: Vec<ThroughputStat>,
}

/// `PUT /1/lb/nodes`
pub(crate) async fn add_node(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_node_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state.grouper.add(&request.node).await {
        Ok(()) => message(StatusCode::OK, "node added"),
        Err(e) => error_response(e),
    }
}

/// `DELETE /1/lb/nodes`
pub(crate) async fn remove_node(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_node_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state.grouper.remove(&request.node).await {
        Ok(()) => message(StatusCode::OK, "node deleted"),
        Err(e) => error_response(e),
    }
}

/// `GET /1/lb/nodes`
pub(crate) async fn list_nodes(State(state): State<AppState>) -> Response {
    Json(NodesResponse {
        nodes: state.grouper.nodes(),
    })
    .into_response()
}

/// `GET /1/lb/stats`
pub(crate) async fn throughput_stats(State(state): State<AppState>) -> Response {
    Json(StatsResponse {
        stats: state.router.stats(),
    })
    .into_response()
}

fn parse_node_request(body: &Bytes) -> Result<NodeRequest, Response> {
    serde_json::from_slice(body)
        .map_err(|e| message(StatusCode::BAD_REQUEST, format!("invalid request body: {}", e)))
}

pub(crate) fn message(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(MessageResponse { msg: msg.into() })).into_response()
}

fn error_response(e: Error) -> Response {
    let status = match &e {
        Error::UnknownNode(_) => StatusCode::NOT_FOUND,
        Error::Unsupported(_) => StatusCode::METHOD_NOT_ALLOWED,
        Error::NoNodes => StatusCode::SERVICE_UNAVAILABLE,
        Error::Store(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    message(status, e.to_string())
}
