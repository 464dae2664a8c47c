//! Registry snapshot records

use serde::Serialize;

use crate::registry::{ConnectionId, UserId};

/// One live connection at the time of the snapshot
///
/// A copy, never a live view. Serialized with the field names used by the
/// `/status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    #[serde(rename = "ClientID")]
    pub connection_id: ConnectionId,
    #[serde(rename = "UserID")]
    pub user_id: UserId,
    #[serde(rename = "Type")]
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_names() {
        let stats = HubStats {
            connection_id: ConnectionId(3),
            user_id: 42,
            category: "web".into(),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ClientID": 3, "UserID": 42, "Type": "web" })
        );
    }
}
