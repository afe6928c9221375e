use anchorcore::wire::PositionEstimate;
use serde::{Deserialize, Serialize};

/// Frames a display client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    Identify {
        #[serde(rename = "type")]
        role: String,
    },
}

/// Frames pushed to display clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame<'a> {
    UpdatePosition(&'a PositionEstimate),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorcore::wire::AnchorPair;
    use serde_json::json;

    #[test]
    fn identify_frame_reads_role_from_type() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"event":"identify","data":{"type":"react_native"}}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Identify {
                role: "react_native".into()
            }
        );
    }

    #[test]
    fn update_position_wraps_estimate() {
        let estimate = PositionEstimate {
            x: 1.25,
            y: 0.5,
            obstacle_distance: json!("n/a"),
            anchors: AnchorPair::default(),
        };
        let value = serde_json::to_value(ServerFrame::UpdatePosition(&estimate)).unwrap();
        assert_eq!(value["event"], json!("update_position"));
        assert_eq!(value["data"]["x"], json!(1.25));
        assert_eq!(value["data"]["anchors"]["anchor2"]["x"], json!(5.0));
    }
}
