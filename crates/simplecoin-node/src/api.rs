use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::protocol::Message;
use crate::NodeChain;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use simplecoin_core::{Block, ChainError, Transaction};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub chain: NodeChain,
    pub broadcaster: Broadcaster,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Head {
    pub height: u64,
    pub hash: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Balance {
    pub id: String,
    pub balance: f64,
}

#[derive(Deserialize)]
struct TxIn {
    from: String,
    to: String,
    amount: f64,
}

#[derive(Serialize)]
struct TxAccepted {
    accepted: bool,
    tx: Transaction,
    broadcast: BroadcastReport,
}

#[derive(Serialize)]
struct Mined {
    block: Block,
    persisted: bool,
    broadcast: BroadcastReport,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        let status = match &e {
            ChainError::NothingToMine => StatusCode::UNPROCESSABLE_ENTITY,
            ChainError::Rejected(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain", get(chain))
        .route("/chain/head", get(head))
        .route("/pool", get(pool))
        .route("/balance/{id}", get(balance))
        .route("/tx", post(submit_tx))
        .route("/mine", post(mine))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.chain.blocks())
}

async fn head(State(state): State<AppState>) -> Json<Head> {
    let tip = state.chain.tip();
    Json(Head {
        height: tip.index,
        hash: tip.hash_hex(),
    })
}

async fn pool(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.chain.pending())
}

async fn balance(State(state): State<AppState>, Path(id): Path<String>) -> Json<Balance> {
    let balance = state.chain.balance(&id);
    Json(Balance { id, balance })
}

async fn submit_tx(State(state): State<AppState>, Json(tx): Json<TxIn>) -> Json<TxAccepted> {
    let tx = Transaction::new(tx.from, tx.to, tx.amount);
    let accepted = state.chain.submit(tx.clone());
    let broadcast = if accepted {
        state.broadcaster.broadcast(&Message::Tx(tx.clone())).await
    } else {
        BroadcastReport::default()
    };
    Json(TxAccepted {
        accepted,
        tx,
        broadcast,
    })
}

async fn mine(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    let chain = state.chain.clone();
    let result = tokio::task::spawn_blocking(move || chain.mine())
        .await
        .map_err(|e| {
            error!("mining task failed: {e}");
            ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    // The block is the tip either way, so peers still get it.
    let (block, persisted) = match result {
        Ok(block) => (block, true),
        Err(ChainError::Unpersisted { block, source }) => {
            error!(index = block.index, "mined block not persisted: {source:#}");
            (*block, false)
        }
        Err(e) => return Err(e.into()),
    };

    info!(index = block.index, hash = %block.hash_hex(), "block mined, broadcasting");
    let broadcast = state.broadcaster.broadcast(&Message::Block(block.clone())).await;
    Ok(Json(Mined {
        block,
        persisted,
        broadcast,
    }))
}
