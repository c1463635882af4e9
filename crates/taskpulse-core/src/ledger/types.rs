use serde::{Deserialize, Serialize};

/// Identity key of a notification.
///
/// The server sends numeric ids for persisted rows and string ids for
/// synthetic pushes; both are valid. When a wire item carries no id at all,
/// its timestamp stands in (see [`WireNotification::effective_id`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationId::Number(n) => write!(f, "{}", n),
            NotificationId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(n: i64) -> Self {
        NotificationId::Number(n)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        NotificationId::Text(s.to_string())
    }
}

/// Notification payload as delivered by the server.
///
/// Both transports produce this shape: the poll endpoint returns an array
/// of them, the push channel one per frame. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    /// Server-side creation time, ISO 8601.
    #[serde(default)]
    pub timestamp: String,
}

impl WireNotification {
    /// Identity key for deduplication: the id, or the timestamp when absent.
    pub fn effective_id(&self) -> NotificationId {
        self.id
            .clone()
            .unwrap_or_else(|| NotificationId::Text(self.timestamp.clone()))
    }
}

/// A notification as held in the ledger and persisted to the store.
///
/// Serialized field names match the persisted history record, which keeps
/// the server's snake_case fields plus a camelCase `receivedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub timestamp: String,
    /// When the engine observed the item: the source timestamp for replace
    /// deliveries, the arrival instant for append deliveries.
    #[serde(rename = "receivedAt", default)]
    pub received_at: String,
    #[serde(default)]
    pub read: bool,
}

/// How a delivery is folded into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// The delivery is the authoritative full current set; ledger content
    /// is substituted wholesale.
    Replace,
    /// Each delivered item is merged into a bounded rolling history,
    /// newest first.
    Append,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_id_untagged_roundtrip() {
        let numeric: NotificationId = serde_json::from_str("17").unwrap();
        assert_eq!(numeric, NotificationId::Number(17));

        let text: NotificationId = serde_json::from_str(r#""evt-9""#).unwrap();
        assert_eq!(text, NotificationId::Text("evt-9".to_string()));

        assert_eq!(serde_json::to_string(&numeric).unwrap(), "17");
        assert_eq!(serde_json::to_string(&text).unwrap(), r#""evt-9""#);
    }

    #[test]
    fn test_effective_id_falls_back_to_timestamp() {
        let wire: WireNotification = serde_json::from_str(
            r#"{"title":"t","content":"c","timestamp":"2026-03-01T09:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            wire.effective_id(),
            NotificationId::Text("2026-03-01T09:00:00Z".to_string())
        );
    }

    #[test]
    fn test_wire_notification_parses_server_shape() {
        let wire: WireNotification = serde_json::from_str(
            r#"{"id":3,"title":"新任务","content":"请响应","task_id":12,"timestamp":"2026-03-01T09:00:00Z","type":"新任务"}"#,
        )
        .unwrap();
        assert_eq!(wire.id, Some(NotificationId::Number(3)));
        assert_eq!(wire.task_id, Some(12));
        assert_eq!(wire.title, "新任务");
    }

    #[test]
    fn test_notification_persisted_field_names() {
        let notification = Notification {
            id: NotificationId::Number(1),
            title: "t".to_string(),
            content: "c".to_string(),
            task_id: Some(5),
            timestamp: "2026-03-01T09:00:00Z".to_string(),
            received_at: "2026-03-01T09:00:01Z".to_string(),
            read: false,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains(r#""receivedAt":"2026-03-01T09:00:01Z""#));
        assert!(json.contains(r#""task_id":5"#));
    }
}
