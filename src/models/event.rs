use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Event type reported when a player joins the server.
pub const JOIN_EVENT: &str = "server.join";

/// Identity used to key queued actions and reported events.
///
/// UUIDs are only trustworthy when the server (or the proxy in front of it)
/// authenticates players. Offline-mode servers fall back to the display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerKey {
    Uuid(Uuid),
    Name(String),
}

impl PlayerKey {
    /// Pick the key the webstore knows this player by.
    pub fn resolve(online_mode: bool, uuid: Option<Uuid>, name: &str) -> Self {
        match uuid {
            Some(uuid) if online_mode => PlayerKey::Uuid(uuid),
            _ => PlayerKey::Name(name.to_string()),
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerKey::Uuid(uuid) => write!(f, "{}", uuid),
            PlayerKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<Uuid> for PlayerKey {
    fn from(uuid: Uuid) -> Self {
        PlayerKey::Uuid(uuid)
    }
}

impl From<&str> for PlayerKey {
    fn from(name: &str) -> Self {
        PlayerKey::Name(name.to_string())
    }
}

/// A locally generated event waiting to be reported to the webstore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub player_key: PlayerKey,
    pub timestamp: DateTime<Utc>,
    pub metadata: EventMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    pub ip: Option<String>,
}

impl PendingEvent {
    /// Build a join event stamped with the current time.
    pub fn join(player_key: PlayerKey, username: &str, ip: Option<String>) -> Self {
        Self {
            player_key,
            timestamp: Utc::now(),
            metadata: EventMetadata {
                kind: JOIN_EVENT.to_string(),
                username: username.to_string(),
                ip,
            },
        }
    }
}

/// In-game effect to run for a player once they are reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Server command with player placeholders already substituted.
    pub command: String,
    /// Free inventory slots the effect needs; zero when it gives no items.
    #[serde(default)]
    pub required_slots: u32,
}

impl Action {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            required_slots: 0,
        }
    }

    pub fn with_required_slots(mut self, slots: u32) -> Self {
        self.required_slots = slots;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub player_key: PlayerKey,
    pub payload: Action,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedAction {
    pub fn new(player_key: PlayerKey, payload: Action) -> Self {
        Self {
            player_key,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_online_mode_uses_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(PlayerKey::resolve(true, Some(id), "Steve"), PlayerKey::Uuid(id));
    }

    #[test]
    fn test_resolve_offline_mode_uses_name() {
        let id = Uuid::new_v4();
        assert_eq!(
            PlayerKey::resolve(false, Some(id), "Steve"),
            PlayerKey::Name("Steve".to_string())
        );
        assert_eq!(
            PlayerKey::resolve(true, None, "Alex"),
            PlayerKey::Name("Alex".to_string())
        );
    }

    #[test]
    fn test_join_event_metadata() {
        let event = PendingEvent::join("Steve".into(), "Steve", Some("127.0.0.1".to_string()));
        assert_eq!(event.metadata.kind, JOIN_EVENT);
        assert_eq!(event.metadata.ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_action_builder() {
        let action = Action::command("give Steve diamond 64").with_required_slots(1);
        assert_eq!(action.required_slots, 1);
        assert_eq!(action.command, "give Steve diamond 64");
    }
}
