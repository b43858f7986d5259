//! Target selection shared by the control-plane resolvers and the worker's
//! local resolution path.

use serde::Deserialize;

use crate::proto;

/// Query parameters selecting one or more connections.
///
/// Exactly one selector is authoritative. When several are supplied on a
/// single request the deterministic precedence is:
/// **connection id > channel > user (+session)**. `session` is never a
/// selector on its own; it filters the user and channel selectors.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TargetQuery {
    /// Connection id selector.
    #[serde(default)]
    pub id: String,
    /// User selector.
    #[serde(default)]
    pub user: String,
    /// Session filter for the user/channel selectors.
    #[serde(default)]
    pub session: String,
    /// Channel selector.
    #[serde(default)]
    pub channel: String,
}

impl TargetQuery {
    /// True when no selector is set (session alone selects nothing).
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.user.is_empty() && self.channel.is_empty()
    }

    pub fn to_proto(&self) -> proto::Target {
        proto::Target {
            connection: self.id.clone(),
            user: self.user.clone(),
            session: self.session.clone(),
            channel: self.channel.clone(),
        }
    }

    pub fn from_proto(target: &proto::Target) -> Self {
        Self {
            id: target.connection.clone(),
            user: target.user.clone(),
            session: target.session.clone(),
            channel: target.channel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_when_only_session_set() {
        let query = TargetQuery {
            session: "s".to_string(),
            ..Default::default()
        };
        assert!(query.is_empty());

        let query = TargetQuery {
            channel: "c".to_string(),
            ..Default::default()
        };
        assert!(!query.is_empty());
    }

    #[test]
    fn proto_round_trip() {
        let query = TargetQuery {
            id: "conn-1".to_string(),
            user: "u".to_string(),
            session: "s".to_string(),
            channel: "c".to_string(),
        };

        let restored = TargetQuery::from_proto(&query.to_proto());
        assert_eq!(restored.id, "conn-1");
        assert_eq!(restored.user, "u");
        assert_eq!(restored.session, "s");
        assert_eq!(restored.channel, "c");
    }
}
