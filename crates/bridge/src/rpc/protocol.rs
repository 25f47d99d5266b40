//! Wire Protocol Types
//!
//! Message-oriented JSON frames exchanged with the browser extension.
//! Keep them minimal - closed enums at the boundary, no untyped maps
//! flowing past deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing, unique per connection
pub type RequestId = u64;

/// Browser tab identifier reported by the extension
pub type TabId = i64;

/// Methods the bridge sends to the extension.
///
/// The set is closed on purpose: an unknown method is a programming
/// error on our side, not something to discover at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    GetConnectionStatus,
    Evaluate,
    Interact,
    SetStealthMode,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GetConnectionStatus => "getConnectionStatus",
            Method::Evaluate => "evaluate",
            Method::Interact => "interact",
            Method::SetStealthMode => "setStealthMode",
        }
    }
}

/// Request sent to the extension
#[derive(Debug, Clone, Serialize)]
pub struct WireRequest {
    pub id: RequestId,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Correlated response from the extension
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<WireError>,
}

/// Application-level error reported by the extension or the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub message: String,
}

/// Unsolicited notification from the extension (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct WireNotification {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Unified inbound message (response or notification)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireMessage {
    Response(WireResponse),
    Notification(WireNotification),
}

/// One simulated user action inside an `interact` sequence.
///
/// Field names match the extension's wire shapes (`clickCount`,
/// `timeout` in milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionAction {
    Click {
        selector: String,
        #[serde(rename = "clickCount", default = "default_click_count")]
        click_count: u32,
    },
    Type {
        selector: String,
        text: String,
    },
    PressKey {
        key: String,
    },
    ScrollBy {
        x: i64,
        y: i64,
    },
    /// Pure local delay. Never issues an RPC call; exists so
    /// UI-settle pauses and humanized pacing can be expressed
    /// uniformly alongside real actions.
    Wait {
        timeout: u64,
    },
}

fn default_click_count() -> u32 {
    1
}

impl InteractionAction {
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionAction::Click { .. } => "click",
            InteractionAction::Type { .. } => "type",
            InteractionAction::PressKey { .. } => "press_key",
            InteractionAction::ScrollBy { .. } => "scroll_by",
            InteractionAction::Wait { .. } => "wait",
        }
    }
}

/// Snapshot of the bridge's connection state.
///
/// `stealth_mode` and `project_name` are only ever what the extension
/// reported; the bridge never fabricates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    pub connected: bool,
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub stealth_mode: Option<bool>,
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Status fields as the extension reports them, either in a
/// `getConnectionStatus` response or a `statusChanged` notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(default, alias = "connectedTabId")]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub stealth_mode: Option<bool>,
    #[serde(default)]
    pub project_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_serializes_to_camel_case() {
        assert_eq!(
            serde_json::to_value(Method::GetConnectionStatus).unwrap(),
            json!("getConnectionStatus")
        );
        assert_eq!(
            serde_json::to_value(Method::SetStealthMode).unwrap(),
            json!("setStealthMode")
        );
    }

    #[test]
    fn request_omits_missing_params() {
        let req = WireRequest {
            id: 7,
            method: Method::GetConnectionStatus,
            params: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": 7, "method": "getConnectionStatus"})
        );
    }

    #[test]
    fn click_action_wire_shape() {
        let action = InteractionAction::Click {
            selector: "#buy".to_string(),
            click_count: 3,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "click", "selector": "#buy", "clickCount": 3})
        );
    }

    #[test]
    fn click_count_defaults_to_one() {
        let action: InteractionAction =
            serde_json::from_value(json!({"type": "click", "selector": "#a"})).unwrap();
        assert_eq!(
            action,
            InteractionAction::Click {
                selector: "#a".to_string(),
                click_count: 1,
            }
        );
    }

    #[test]
    fn action_variants_round_trip() {
        let actions = vec![
            InteractionAction::Type {
                selector: "input".to_string(),
                text: "x".to_string(),
            },
            InteractionAction::PressKey {
                key: "Enter".to_string(),
            },
            InteractionAction::ScrollBy { x: 0, y: 400 },
            InteractionAction::Wait { timeout: 250 },
        ];
        let value = serde_json::to_value(&actions).unwrap();
        assert_eq!(value[1], json!({"type": "press_key", "key": "Enter"}));
        assert_eq!(value[3], json!({"type": "wait", "timeout": 250}));
        let back: Vec<InteractionAction> = serde_json::from_value(value).unwrap();
        assert_eq!(back, actions);
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let result: std::result::Result<InteractionAction, _> =
            serde_json::from_value(json!({"type": "hover", "selector": "#a"}));
        assert!(result.is_err());
    }

    #[test]
    fn inbound_frame_disambiguates_response_and_notification() {
        let frame = r#"{"id": 3, "result": {"ok": true}}"#;
        match serde_json::from_str::<WireMessage>(frame).unwrap() {
            WireMessage::Response(resp) => assert_eq!(resp.id, 3),
            WireMessage::Notification(_) => panic!("expected response"),
        }

        let frame = r#"{"method": "statusChanged", "params": {"connectedTabId": 12}}"#;
        match serde_json::from_str::<WireMessage>(frame).unwrap() {
            WireMessage::Notification(n) => assert_eq!(n.method, "statusChanged"),
            WireMessage::Response(_) => panic!("expected notification"),
        }
    }

    #[test]
    fn malformed_frame_fails_to_parse() {
        assert!(serde_json::from_str::<WireMessage>(r#"{"neither": true}"#).is_err());
        assert!(serde_json::from_str::<WireMessage>("not json").is_err());
    }

    #[test]
    fn status_report_accepts_extension_field_names() {
        let report: StatusReport = serde_json::from_value(json!({
            "connectedTabId": 42,
            "stealthMode": true,
            "projectName": "market"
        }))
        .unwrap();
        assert_eq!(report.tab_id, Some(42));
        assert_eq!(report.stealth_mode, Some(true));
        assert_eq!(report.project_name.as_deref(), Some("market"));
    }
}
