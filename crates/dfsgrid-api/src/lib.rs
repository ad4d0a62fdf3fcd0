//! dfsgrid-api — REST control plane for the node cluster.
//!
//! Provides axum route handlers for operating the managed HDFS nodes.
//! Every node route takes an id expression in the `node` query parameter
//! (`nn`, `dn0,dn1`, `dn0..2`, `*`); errors come back as HTTP 400 with a
//! fixed machine-parseable string.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET/POST | `/api/node/list` | List nodes (`node` defaults to `*`) |
//! | POST | `/api/node/add` | Create nodes |
//! | POST | `/api/node/update` | Reconfigure idle nodes |
//! | POST | `/api/node/start` | Start nodes, optionally waiting |
//! | POST | `/api/node/stop` | Stop nodes, optionally waiting |
//! | POST | `/api/node/remove` | Remove idle nodes |
//! | GET | `/health` | Liveness probe |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use dfsgrid_scheduler::Scheduler;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
}

/// Build the complete API router.
pub fn build_router(scheduler: Arc<Scheduler>) -> Router {
    let state = ApiState { scheduler };

    let node_routes = Router::new()
        .route("/list", get(handlers::node_list).post(handlers::node_list))
        .route("/add", post(handlers::node_add))
        .route("/update", post(handlers::node_update))
        .route("/start", post(handlers::node_start))
        .route("/stop", post(handlers::node_stop))
        .route("/remove", post(handlers::node_remove))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/node", node_routes)
}
