use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::eta::watch_progress;
use crate::models::order::{OrderRecord, OrderStatus};
use crate::state::AppState;

/// Pushes pending-order snapshots to the client. Each connection holds its
/// own feed subscription, released on disconnect.
pub async fn feed_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_feed_socket(socket, state))
}

async fn handle_feed_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Vec<OrderRecord>>(16);
    let subscription = state.feed.subscribe(move |orders| {
        // A full channel means the client is not keeping up; the next
        // snapshot supersedes the dropped one anyway.
        let _ = tx.try_send(orders.to_vec());
    });

    info!("feed client connected");

    let send_task = tokio::spawn(async move {
        let mut snapshots = ReceiverStream::new(rx);
        while let Some(snapshot) = snapshots.next().await {
            let json = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize feed snapshot for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    subscription.unsubscribe();
    info!("feed client disconnected");
}

/// Streams progress readings for one accepted order until 100 is reached,
/// then closes. The watch timer dies with the connection.
pub async fn track_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.store.read(id).await?;

    let (OrderStatus::Accepted, Some(delivery_date)) = (order.status, order.delivery_date) else {
        return Err(AppError::Validation(format!(
            "order {id} has not been accepted yet"
        )));
    };

    let eta = order.formatted_eta().unwrap_or_default();
    let order_date = order.order_date;
    let tick = state.progress_tick;
    Ok(ws.on_upgrade(move |socket| stream_progress(socket, order_date, delivery_date, eta, tick)))
}

async fn stream_progress(
    mut socket: WebSocket,
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    eta: String,
    tick: std::time::Duration,
) {
    let mut watch = watch_progress(order_date, delivery_date, tick);

    while let Some(percent) = watch.next().await {
        let payload = serde_json::json!({
            "percent": percent,
            "eta": eta,
        });

        if socket.send(Message::Text(payload.to_string())).await.is_err() {
            return;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}
