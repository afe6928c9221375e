use crate::display::model::ServerFrame;
use anchorcore::broadcast::{ConnectionId, DisplayConnection};
use anchorcore::prelude::{RelayError, RelayResult};
use anchorcore::wire::PositionEstimate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use warp::ws::Message;

/// Frames buffered per socket before further estimates are dropped.
pub const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Registry handle for one websocket. Delivery only queues the frame; the
/// socket's writer task drains the queue. A full queue drops the estimate.
#[derive(Debug, Clone)]
pub struct WsClient {
    id: ConnectionId,
    outbound: mpsc::Sender<Message>,
    connected: Arc<AtomicBool>,
}

impl WsClient {
    pub fn new(
        id: ConnectionId,
        outbound: mpsc::Sender<Message>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            outbound,
            connected,
        }
    }
}

impl DisplayConnection for WsClient {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed) && !self.outbound.is_closed()
    }

    fn deliver(&self, estimate: &PositionEstimate) -> RelayResult<()> {
        let text = serde_json::to_string(&ServerFrame::UpdatePosition(estimate))
            .map_err(|err| RelayError::Delivery(err.to_string()))?;
        self.outbound
            .try_send(Message::text(text))
            .map_err(|err| match err {
                TrySendError::Full(_) => {
                    RelayError::Delivery(format!("connection {} queue full", self.id))
                }
                TrySendError::Closed(_) => {
                    RelayError::Delivery(format!("connection {} closed", self.id))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorcore::wire::AnchorPair;
    use serde_json::json;

    fn estimate() -> PositionEstimate {
        PositionEstimate {
            x: 2.0,
            y: 1.0,
            obstacle_distance: json!(15),
            anchors: AnchorPair::default(),
        }
    }

    #[test]
    fn deliver_queues_update_position_frame() {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let client = WsClient::new(4, tx, Arc::new(AtomicBool::new(true)));
        client.deliver(&estimate()).unwrap();

        let message = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
        assert_eq!(value["event"], json!("update_position"));
        assert_eq!(value["data"]["obstacle_distance"], json!(15));
    }

    #[test]
    fn closed_queue_reads_as_disconnected() {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let flag = Arc::new(AtomicBool::new(true));
        let client = WsClient::new(1, tx, flag.clone());
        assert!(client.is_connected());

        flag.store(false, Ordering::Relaxed);
        assert!(!client.is_connected());

        flag.store(true, Ordering::Relaxed);
        drop(rx);
        assert!(!client.is_connected());
        assert!(client.deliver(&estimate()).is_err());
    }

    #[test]
    fn stalled_reader_drops_estimates_once_queue_fills() {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let client = WsClient::new(9, tx, Arc::new(AtomicBool::new(true)));

        for _ in 0..OUTBOUND_QUEUE_DEPTH {
            client.deliver(&estimate()).unwrap();
        }
        let err = client.deliver(&estimate()).unwrap_err();
        assert!(matches!(err, RelayError::Delivery(msg) if msg.contains("queue full")));
        assert!(client.is_connected());

        rx.try_recv().unwrap();
        client.deliver(&estimate()).unwrap();
    }
}
