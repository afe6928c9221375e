use crate::display::client::{WsClient, OUTBOUND_QUEUE_DEPTH};
use crate::display::model::ClientFrame;
use crate::workflow::runner::RelayEvent;
use anchorcore::broadcast::ConnectionId;
use anchorcore::diagnostics::{LogManager, MetricsRecorder};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

type EventSender = mpsc::UnboundedSender<RelayEvent<WsClient>>;

/// HTTP surface: `GET /` liveness, `GET /metrics`, and the `/ws` display socket.
pub fn routes(
    events: EventSender,
    metrics: Arc<MetricsRecorder>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let next_id = Arc::new(AtomicU64::new(1));
    let events_filter = warp::any().map(move || events.clone());
    let ids_filter = warp::any().map(move || next_id.clone());
    let metrics_filter = warp::any().map(move || metrics.clone());

    let health_route = warp::path::end()
        .and(warp::get())
        .map(|| "anchor relay is running");

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(metrics_filter)
        .map(|metrics: Arc<MetricsRecorder>| warp::reply::json(&metrics.snapshot()));

    let ws_route = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(events_filter)
        .and(ids_filter)
        .map(|ws: Ws, events: EventSender, ids: Arc<AtomicU64>| {
            let id = ids.fetch_add(1, Ordering::Relaxed);
            ws.on_upgrade(move |socket| handle_socket(socket, id, events))
        });

    health_route.or(metrics_route).or(ws_route)
}

/// Bridges one websocket to the event queue until either side closes.
async fn handle_socket(socket: WebSocket, id: ConnectionId, events: EventSender) {
    let logger = LogManager::new("display");
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queued) = mpsc::channel::<Message>(OUTBOUND_QUEUE_DEPTH);
    let connected = Arc::new(AtomicBool::new(true));
    logger.record(&format!("connection {} opened", id));

    let writer_flag = connected.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = queued.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        writer_flag.store(false, Ordering::Relaxed);
    });

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                logger.detail(&format!("connection {} read error: {}", id, err));
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Identify { role }) => {
                let client = WsClient::new(id, outbound.clone(), connected.clone());
                if events
                    .send(RelayEvent::Register {
                        connection: client,
                        role,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(err) => logger.detail(&format!("connection {} sent {:?}: {}", id, text, err)),
        }
    }

    connected.store(false, Ordering::Relaxed);
    let _ = events.send(RelayEvent::Deregister(id));
    writer.abort();
    logger.record(&format!("connection {} closed", id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorcore::broadcast::DisplayConnection;
    use anchorcore::wire::{AnchorPair, PositionEstimate};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn health_route_answers() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let filter = routes(tx, Arc::new(MetricsRecorder::new()));
        let response = warp::test::request().path("/").reply(&filter).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "anchor relay is running");
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(MetricsRecorder::new());
        metrics.record_dropped();
        let filter = routes(tx, metrics);

        let response = warp::test::request().path("/metrics").reply(&filter).await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["dropped"], json!(1));
    }

    #[tokio::test]
    async fn websocket_identify_registers_and_close_deregisters() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let filter = routes(tx, Arc::new(MetricsRecorder::new()));
        let mut socket = warp::test::ws()
            .path("/ws")
            .handshake(filter)
            .await
            .expect("handshake");

        socket
            .send_text(r#"{"event":"identify","data":{"type":"react_native"}}"#)
            .await;
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let (client, role) = match event {
            RelayEvent::Register { connection, role } => (connection, role),
            _ => panic!("expected registration"),
        };
        assert_eq!(role, "react_native");
        assert!(client.is_connected());

        let estimate = PositionEstimate {
            x: 3.5,
            y: 1.0,
            obstacle_distance: json!(64),
            anchors: AnchorPair::default(),
        };
        client.deliver(&estimate).unwrap();
        let pushed = timeout(Duration::from_secs(5), socket.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(pushed.to_str().unwrap()).unwrap();
        assert_eq!(value["event"], json!("update_position"));
        assert_eq!(value["data"]["x"], json!(3.5));

        drop(socket);
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, RelayEvent::Deregister(id) if id == client.id()));
    }
}
