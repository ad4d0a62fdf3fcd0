//! REST API handlers.
//!
//! All node operations take query parameters (either verb), mirror their
//! options onto [`NodeOptions`], and answer with node JSON. Rejections are
//! HTTP 400 with a fixed string so operators and scripts can match on them.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use dfsgrid_core::{Period, parse_map};
use dfsgrid_node::{Constraint, NodeError, NodeType};
use dfsgrid_scheduler::{NodeOptions, SchedulerError};

use crate::ApiState;

/// Error body: `{"code": 400, "error": "node not idle"}`.
#[derive(serde::Serialize)]
struct ErrorBody {
    code: u16,
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ErrorBody {
            code: status.as_u16(),
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(msg: &str) -> Response {
    error_response(msg, StatusCode::BAD_REQUEST)
}

fn scheduler_error(e: &SchedulerError) -> Response {
    let msg = match e {
        SchedulerError::Node(NodeError::InvalidExpr(_)) => "invalid node",
        SchedulerError::Node(NodeError::Duplicate(_)) => "duplicate node",
        SchedulerError::Node(NodeError::NotFound(_)) => "node not found",
        SchedulerError::Node(NodeError::NotIdle(_)) => "node not idle",
        SchedulerError::Node(NodeError::Idle(_)) => "node idle",
        SchedulerError::Node(NodeError::External(_)) => "node external",
        SchedulerError::Node(NodeError::InvalidConstraint(_)) => {
            return bad_request(&e.to_string());
        }
        _ => {
            error!(error = %e, "internal error");
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    bad_request(msg)
}

/// The `node` expression parameter, required and non-empty.
fn require_expr(params: &HashMap<String, String>) -> Result<&str, Response> {
    match params.get("node").map(String::as_str) {
        Some(expr) if !expr.is_empty() => Ok(expr),
        _ => Err(bad_request("node required")),
    }
}

/// An empty string clears an optional setting, mirroring the CLI contract.
fn clearable(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Collect node options from query parameters. Absent parameters stay
/// untouched on the target nodes.
fn parse_options(params: &HashMap<String, String>) -> Result<NodeOptions, String> {
    let mut options = NodeOptions::default();

    if let Some(cpus) = params.get("cpus") {
        options.cpus = Some(cpus.parse().map_err(|_| "invalid cpus".to_string())?);
    }
    if let Some(mem) = params.get("mem") {
        options.mem = Some(mem.parse().map_err(|_| "invalid mem".to_string())?);
    }

    if let Some(spec) = params.get("constraints") {
        let entries =
            parse_map(spec, ';').map_err(|e| format!("invalid constraint: {e}"))?;
        let mut constraints = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let constraint: Constraint = value.parse().map_err(|e: NodeError| e.to_string())?;
            constraints.push((name, constraint));
        }
        options.constraints = Some(constraints);
    }

    if let Some(opts) = params.get("executorJvmOpts") {
        options.executor_jvm_opts = Some(clearable(opts));
    }
    if let Some(opts) = params.get("hadoopJvmOpts") {
        options.hadoop_jvm_opts = Some(clearable(opts));
    }

    if let Some(opts) = params.get("coreSiteOpts") {
        let entries = parse_map(opts, ',').map_err(|_| "invalid coreSiteOpts".to_string())?;
        options.core_site_opts = Some(entries.into_iter().collect());
    }
    if let Some(opts) = params.get("hdfsSiteOpts") {
        let entries = parse_map(opts, ',').map_err(|_| "invalid hdfsSiteOpts".to_string())?;
        options.hdfs_site_opts = Some(entries.into_iter().collect());
    }

    if let Some(uri) = params.get("externalFsUri") {
        options.external_fs_uri = Some(clearable(uri));
    }

    if let Some(delay) = params.get("failoverDelay") {
        let delay: Period = delay
            .parse()
            .map_err(|_| "invalid failoverDelay".to_string())?;
        options.failover_delay = Some(delay);
    }
    if let Some(max_delay) = params.get("failoverMaxDelay") {
        let max_delay: Period = max_delay
            .parse()
            .map_err(|_| "invalid failoverMaxDelay".to_string())?;
        options.failover_max_delay = Some(max_delay);
    }
    if let Some(max_tries) = params.get("failoverMaxTries") {
        options.failover_max_tries = if max_tries.is_empty() {
            Some(None)
        } else {
            let tries: u32 = max_tries
                .parse()
                .map_err(|_| "invalid failoverMaxTries".to_string())?;
            Some(Some(tries))
        };
    }

    if let Some(hostname) = params.get("stickinessHostname") {
        options.stickiness_hostname = Some(clearable(hostname));
    }
    if let Some(persist) = params.get("stickinessPersist") {
        options.stickiness_persist = Some(
            persist
                .parse()
                .map_err(|_| "invalid stickinessPersist".to_string())?,
        );
    }
    if let Some(period) = params.get("stickinessPeriod") {
        let period: Period = period
            .parse()
            .map_err(|_| "invalid stickinessPeriod".to_string())?;
        options.stickiness_period = Some(period);
    }

    Ok(options)
}

fn parse_timeout(params: &HashMap<String, String>) -> Result<Period, Response> {
    match params.get("timeout") {
        None => Ok(Period::from_ms(120_000)),
        Some(timeout) => timeout.parse().map_err(|_| bad_request("invalid timeout")),
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET/POST /api/node/list
pub async fn node_list(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = params.get("node").map(String::as_str).unwrap_or("*");
    match state.scheduler.list_nodes(expr).await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => scheduler_error(&e),
    }
}

/// POST /api/node/add
pub async fn node_add(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = match require_expr(&params) {
        Ok(expr) => expr,
        Err(resp) => return resp,
    };
    let Some(kind) = params.get("type") else {
        return bad_request("type required");
    };
    let Ok(kind) = kind.parse::<NodeType>() else {
        return bad_request("invalid type");
    };
    let options = match parse_options(&params) {
        Ok(options) => options,
        Err(msg) => return bad_request(&msg),
    };

    match state.scheduler.add_nodes(expr, kind, &options).await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => scheduler_error(&e),
    }
}

/// POST /api/node/update
pub async fn node_update(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = match require_expr(&params) {
        Ok(expr) => expr,
        Err(resp) => return resp,
    };
    let options = match parse_options(&params) {
        Ok(options) => options,
        Err(msg) => return bad_request(&msg),
    };

    match state.scheduler.update_nodes(expr, &options).await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => scheduler_error(&e),
    }
}

/// POST /api/node/start
pub async fn node_start(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = match require_expr(&params) {
        Ok(expr) => expr,
        Err(resp) => return resp,
    };
    let timeout = match parse_timeout(&params) {
        Ok(timeout) => timeout,
        Err(resp) => return resp,
    };

    match state.scheduler.start_nodes(expr, timeout).await {
        Ok((status, nodes)) => Json(serde_json::json!({
            "status": status,
            "nodes": nodes,
        }))
        .into_response(),
        Err(e) => scheduler_error(&e),
    }
}

/// POST /api/node/stop
pub async fn node_stop(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = match require_expr(&params) {
        Ok(expr) => expr,
        Err(resp) => return resp,
    };
    let timeout = match parse_timeout(&params) {
        Ok(timeout) => timeout,
        Err(resp) => return resp,
    };

    match state.scheduler.stop_nodes(expr, timeout).await {
        Ok((status, nodes)) => Json(serde_json::json!({
            "status": status,
            "nodes": nodes,
        }))
        .into_response(),
        Err(e) => scheduler_error(&e),
    }
}

/// POST /api/node/remove
pub async fn node_remove(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expr = match require_expr(&params) {
        Ok(expr) => expr,
        Err(resp) => return resp,
    };

    match state.scheduler.remove_nodes(expr).await {
        Ok(ids) => Json(ids).into_response(),
        Err(e) => scheduler_error(&e),
    }
}
