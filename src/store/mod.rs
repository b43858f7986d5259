//! Shared directory store (Redis).
//!
//! Authoritative cross-worker state: connection records, user/channel/claim
//! indexes, and worker registrations, all with expiry so records from
//! crashed workers disappear without explicit cleanup. Every method is a
//! single logical round trip; multi-key mutations go through one pipeline.
//!
//! Key schema:
//! - `conn:<id>` hash: user, workerId, session?, channels, lastPing (TTL)
//! - `user:<user>`, `user-session:<user>-<session>`, `channel:<name>`:
//!   sets of connection ids
//! - `claim:<id>` hash: user, session?, channels, expiration (TTL = expiration)
//! - `claim-user:<user>`, `claim-user-session:<user>-<session>`,
//!   `claim-channel:<name>`: sets of claim ids
//! - `worker:<id>` hash: lastPing, address? (TTL)
//!
//! Pub/sub channels: `<workerId>` for messages, `<workerId>:channel` for
//! channel actions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::util::split_channels;

pub mod keys {
    pub fn connection(id: &str) -> String {
        format!("conn:{id}")
    }

    pub fn user(user: &str) -> String {
        format!("user:{user}")
    }

    pub fn user_session(user: &str, session: &str) -> String {
        format!("user-session:{user}-{session}")
    }

    pub fn channel(name: &str) -> String {
        format!("channel:{name}")
    }

    pub fn claim(id: &str) -> String {
        format!("claim:{id}")
    }

    pub fn claim_user(user: &str) -> String {
        format!("claim-user:{user}")
    }

    pub fn claim_user_session(user: &str, session: &str) -> String {
        format!("claim-user-session:{user}-{session}")
    }

    pub fn claim_channel(name: &str) -> String {
        format!("claim-channel:{name}")
    }

    pub fn worker(id: &str) -> String {
        format!("worker:{id}")
    }

    /// Pub/sub channel carrying messages for a worker.
    pub fn worker_messages(worker_id: &str) -> String {
        worker_id.to_string()
    }

    /// Pub/sub channel carrying channel actions for a worker. The suffix
    /// lets the worker demultiplex by kind without inspecting the payload.
    pub fn worker_channel_actions(worker_id: &str) -> String {
        format!("{worker_id}:channel")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp; malformed values collapse to the epoch rather
/// than failing reads, matching the staleness-tolerant read paths.
fn parse_time_lossy(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Store copy of a live connection. The owning worker's in-memory registry
/// is authoritative; this replica has bounded staleness.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub id: String,
    pub user: String,
    pub worker_id: String,
    pub session: Option<String>,
    pub channels: Vec<String>,
    pub last_ping: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Rebuild from a `conn:<id>` hash. Empty hashes (expired or never
    /// written) and hashes without a worker id read as absent.
    pub fn from_map(id: &str, map: &HashMap<String, String>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }
        let worker_id = map.get("workerId")?.clone();

        Some(Self {
            id: id.to_string(),
            user: map.get("user").cloned().unwrap_or_default(),
            worker_id,
            session: map.get("session").cloned().filter(|s| !s.is_empty()),
            channels: split_channels(map.get("channels").map(String::as_str).unwrap_or("")),
            last_ping: parse_time_lossy(map.get("lastPing").map(String::as_str).unwrap_or("")),
        })
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("user", self.user.clone()),
            ("workerId", self.worker_id.clone()),
            ("lastPing", rfc3339(self.last_ping)),
        ];
        if let Some(session) = &self.session {
            fields.push(("session", session.clone()));
        }
        if !self.channels.is_empty() {
            fields.push(("channels", self.channels.join(",")));
        }
        fields
    }
}

/// A pending one-time authentication ticket.
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub id: String,
    pub user: String,
    pub session: Option<String>,
    pub channels: Vec<String>,
    pub expiration: DateTime<Utc>,
}

impl ClaimRecord {
    /// Rebuild from a `claim:<id>` hash. An empty hash or one without a
    /// user reads as absent; an unparsable expiration is a store-level
    /// error (the record can never be validated).
    pub fn from_map(id: &str, map: &HashMap<String, String>) -> Result<Option<Self>, StoreError> {
        if map.is_empty() {
            return Ok(None);
        }
        let Some(user) = map.get("user").filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let raw_expiration = map.get("expiration").map(String::as_str).unwrap_or("");
        let expiration = DateTime::parse_from_rfc3339(raw_expiration)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|_| {
                StoreError::MalformedRecord(format!(
                    "claim {id} has unparsable expiration {raw_expiration:?}"
                ))
            })?;

        Ok(Some(Self {
            id: id.to_string(),
            user: user.clone(),
            session: map.get("session").cloned().filter(|s| !s.is_empty()),
            channels: split_channels(map.get("channels").map(String::as_str).unwrap_or("")),
            expiration,
        }))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("user", self.user.clone()),
            ("expiration", rfc3339(self.expiration)),
        ];
        if let Some(session) = &self.session {
            fields.push(("session", session.clone()));
        }
        if !self.channels.is_empty() {
            fields.push(("channels", self.channels.join(",")));
        }
        fields
    }
}

/// A running worker process.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub id: String,
    pub last_ping: DateTime<Utc>,
    pub address: Option<String>,
}

impl WorkerRecord {
    pub fn from_map(id: &str, map: &HashMap<String, String>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            last_ping: parse_time_lossy(map.get("lastPing").map(String::as_str).unwrap_or("")),
            address: map.get("address").cloned().filter(|a| !a.is_empty()),
        })
    }
}

/// One claim-channel mutation applied by the control plane to a pending
/// claim (subscribe/unsubscribe arriving before the socket connects).
#[derive(Debug)]
pub struct ClaimChannelUpdate {
    pub claim_id: String,
    pub channel: String,
    pub subscribe: bool,
    /// Full channel list after the change, persisted to the claim hash.
    pub channels: Vec<String>,
}

/// Handle to the shared directory store. Cheap to clone; all methods take
/// `&self` and share one multiplexed connection, established lazily on
/// first use so a handle can exist before Redis is reachable.
#[derive(Clone)]
pub struct DirectoryStore {
    client: redis::Client,
    manager: Arc<OnceCell<ConnectionManager>>,
}

impl DirectoryStore {
    /// Parse the URL and build a handle. No connection is made until the
    /// first store operation; `ping` forces one.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;

        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
        })
    }

    async fn conn(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut con = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    // --- Claims ---

    pub async fn claim_exists(&self, id: &str) -> Result<bool, StoreError> {
        let mut con = self.conn().await?;
        let exists: bool = con.exists(keys::claim(id)).await?;
        Ok(exists)
    }

    /// Write the claim hash (TTL = expiration) and add its id to the
    /// by-user, by-user-session, and by-channel indexes.
    pub async fn create_claim(&self, claim: &ClaimRecord) -> Result<(), StoreError> {
        let claim_key = keys::claim(&claim.id);
        let mut pipe = redis::pipe();

        pipe.hset_multiple(&claim_key, &claim.to_fields()).ignore();
        pipe.expire_at(&claim_key, claim.expiration.timestamp()).ignore();
        pipe.sadd(keys::claim_user(&claim.user), &claim.id).ignore();
        if let Some(session) = &claim.session {
            pipe.sadd(keys::claim_user_session(&claim.user, session), &claim.id)
                .ignore();
        }
        for channel in &claim.channels {
            pipe.sadd(keys::claim_channel(channel), &claim.id).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    pub async fn get_claim(&self, id: &str) -> Result<Option<ClaimRecord>, StoreError> {
        let mut con = self.conn().await?;
        let map: HashMap<String, String> = con.hgetall(keys::claim(id)).await?;
        ClaimRecord::from_map(id, &map)
    }

    /// Batched claim reads; absent claims come back as `None`. Malformed
    /// expirations also read as `None` here (resolution paths skip them).
    pub async fn get_claims(&self, ids: &[String]) -> Result<Vec<Option<ClaimRecord>>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(keys::claim(id));
        }

        let mut con = self.conn().await?;
        let maps: Vec<HashMap<String, String>> = pipe.query_async(&mut con).await?;

        Ok(ids
            .iter()
            .zip(maps.iter())
            .map(|(id, map)| ClaimRecord::from_map(id, map).ok().flatten())
            .collect())
    }

    /// Consume a claim: delete its hash and remove it from every index it
    /// appears in. One pipeline, symmetric with `create_claim`.
    pub async fn delete_claim(&self, claim: &ClaimRecord) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();

        pipe.del(keys::claim(&claim.id)).ignore();
        pipe.srem(keys::claim_user(&claim.user), &claim.id).ignore();
        if let Some(session) = &claim.session {
            pipe.srem(keys::claim_user_session(&claim.user, session), &claim.id)
                .ignore();
        }
        for channel in &claim.channels {
            pipe.srem(keys::claim_channel(channel), &claim.id).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Force-expire a batch of pending claims (disconnect with
    /// keepClaims=false): delete the hashes and remove the ids from the
    /// indexes named by the target's selectors.
    pub async fn purge_claims(
        &self,
        claim_ids: &[String],
        user: &str,
        session: &str,
        channel: &str,
    ) -> Result<(), StoreError> {
        if claim_ids.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();

        if !user.is_empty() {
            pipe.srem(keys::claim_user(user), claim_ids).ignore();
            if !session.is_empty() {
                pipe.srem(keys::claim_user_session(user, session), claim_ids)
                    .ignore();
            }
        }
        if !channel.is_empty() {
            pipe.srem(keys::claim_channel(channel), claim_ids).ignore();
        }
        for id in claim_ids {
            pipe.del(keys::claim(id)).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Apply subscribe/unsubscribe changes to pending claims: the claim
    /// hash's channel list and the by-channel index, in one pipeline.
    pub async fn apply_claim_channel_updates(
        &self,
        updates: &[ClaimChannelUpdate],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for update in updates {
            if update.subscribe {
                pipe.sadd(keys::claim_channel(&update.channel), &update.claim_id)
                    .ignore();
            } else {
                pipe.srem(keys::claim_channel(&update.channel), &update.claim_id)
                    .ignore();
            }
            pipe.hset(
                keys::claim(&update.claim_id),
                "channels",
                update.channels.join(","),
            )
            .ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    pub async fn claims_for_user(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let ids: Vec<String> = con.smembers(keys::claim_user(user)).await?;
        Ok(ids)
    }

    pub async fn claims_for_user_session(
        &self,
        user: &str,
        session: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let ids: Vec<String> = con.smembers(keys::claim_user_session(user, session)).await?;
        Ok(ids)
    }

    pub async fn claims_for_channel(&self, channel: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let ids: Vec<String> = con.smembers(keys::claim_channel(channel)).await?;
        Ok(ids)
    }

    // --- Connections ---

    pub async fn get_connection(&self, id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        let mut con = self.conn().await?;
        let map: HashMap<String, String> = con.hgetall(keys::connection(id)).await?;
        Ok(ConnectionRecord::from_map(id, &map))
    }

    /// Batched connection reads (one pipeline = one round trip for the
    /// whole fan-out). Absent connections come back as `None`.
    pub async fn get_connections(
        &self,
        ids: &[String],
    ) -> Result<Vec<Option<ConnectionRecord>>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(keys::connection(id));
        }

        let mut con = self.conn().await?;
        let maps: Vec<HashMap<String, String>> = pipe.query_async(&mut con).await?;

        Ok(ids
            .iter()
            .zip(maps.iter())
            .map(|(id, map)| ConnectionRecord::from_map(id, map))
            .collect())
    }

    /// Mirror a freshly admitted connection: hash + expiry + every index.
    pub async fn admit_connection(
        &self,
        record: &ConnectionRecord,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let conn_key = keys::connection(&record.id);
        let mut pipe = redis::pipe();

        pipe.hset_multiple(&conn_key, &record.to_fields()).ignore();
        pipe.expire(&conn_key, ttl_seconds).ignore();
        pipe.sadd(keys::user(&record.user), &record.id).ignore();
        if let Some(session) = &record.session {
            pipe.sadd(keys::user_session(&record.user, session), &record.id)
                .ignore();
        }
        for channel in &record.channels {
            pipe.sadd(keys::channel(channel), &record.id).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Remove a closed connection from the store: every index touched on
    /// admit is touched here. `channels` must be the connection's current
    /// channel set (it may have changed since admission).
    pub async fn remove_connection(
        &self,
        record: &ConnectionRecord,
        channels: &[String],
    ) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();

        pipe.del(keys::connection(&record.id)).ignore();
        pipe.srem(keys::user(&record.user), &record.id).ignore();
        if let Some(session) = &record.session {
            pipe.srem(keys::user_session(&record.user, session), &record.id)
                .ignore();
        }
        for channel in channels {
            pipe.srem(keys::channel(channel), &record.id).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Refresh a connection's liveness timestamp (inbound ping/pong).
    pub async fn touch_connection(
        &self,
        id: &str,
        last_ping: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let conn_key = keys::connection(id);
        let mut pipe = redis::pipe();
        pipe.hset(&conn_key, "lastPing", rfc3339(last_ping)).ignore();
        pipe.expire(&conn_key, ttl_seconds).ignore();

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Persist a subscribe/unsubscribe on a live connection: the global
    /// channel set and the connection hash's channel list together.
    pub async fn set_connection_channels(
        &self,
        id: &str,
        channel: &str,
        subscribe: bool,
        channels: &[String],
    ) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();

        if subscribe {
            pipe.sadd(keys::channel(channel), id).ignore();
        } else {
            pipe.srem(keys::channel(channel), id).ignore();
        }
        pipe.hset(keys::connection(id), "channels", channels.join(","))
            .ignore();

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    pub async fn user_connections(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let ids: Vec<String> = con.smembers(keys::user(user)).await?;
        Ok(ids)
    }

    pub async fn channel_connections(&self, channel: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.conn().await?;
        let ids: Vec<String> = con.smembers(keys::channel(channel)).await?;
        Ok(ids)
    }

    // --- Workers ---

    /// Register this worker; `address` is advertised only in direct mode.
    pub async fn register_worker(
        &self,
        worker_id: &str,
        address: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let worker_key = keys::worker(worker_id);
        let mut fields = vec![("lastPing", rfc3339(Utc::now()))];
        if let Some(address) = address {
            fields.push(("address", address.to_string()));
        }

        let mut pipe = redis::pipe();
        pipe.hset_multiple(&worker_key, &fields).ignore();
        pipe.expire(&worker_key, ttl_seconds).ignore();

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    pub async fn deregister_worker(&self, worker_id: &str) -> Result<(), StoreError> {
        let mut con = self.conn().await?;
        let _: () = con.del(keys::worker(worker_id)).await?;
        Ok(())
    }

    pub async fn get_workers(
        &self,
        ids: &[String],
    ) -> Result<Vec<Option<WorkerRecord>>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(keys::worker(id));
        }

        let mut con = self.conn().await?;
        let maps: Vec<HashMap<String, String>> = pipe.query_async(&mut con).await?;

        Ok(ids
            .iter()
            .zip(maps.iter())
            .map(|(id, map)| WorkerRecord::from_map(id, map))
            .collect())
    }

    /// One batched round trip refreshing the worker record and the expiry
    /// of every connection this worker owns. The sole liveness mechanism:
    /// records of crashed workers simply stop being refreshed.
    pub async fn refresh_ttls(
        &self,
        worker_id: &str,
        connection_ids: &[String],
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        let worker_key = keys::worker(worker_id);
        let mut pipe = redis::pipe();

        pipe.hset(&worker_key, "lastPing", rfc3339(Utc::now())).ignore();
        pipe.expire(&worker_key, ttl_seconds).ignore();
        for id in connection_ids {
            pipe.expire(keys::connection(id), ttl_seconds).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    // --- Pub/sub ---

    /// Publish one payload to each worker's channel in a single pipeline.
    /// `channel_action` selects the `:channel` suffixed channel so workers
    /// can demultiplex by kind.
    pub async fn publish_to_workers(
        &self,
        worker_ids: &[String],
        channel_action: bool,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        if worker_ids.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for worker_id in worker_ids {
            let channel = if channel_action {
                keys::worker_channel_actions(worker_id)
            } else {
                keys::worker_messages(worker_id)
            };
            pipe.publish(channel, payload).ignore();
        }

        let mut con = self.conn().await?;
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    /// Open a dedicated pub/sub connection subscribed to `channel`.
    pub async fn subscriber(&self, channel: &str) -> Result<redis::aio::PubSub, StoreError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        Ok(pubsub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_record_from_map() {
        let mut map = HashMap::new();
        map.insert("user".to_string(), "u".to_string());
        map.insert("workerId".to_string(), "w1".to_string());
        map.insert("channels".to_string(), "a,b".to_string());
        map.insert("lastPing".to_string(), "2026-01-01T00:00:00Z".to_string());

        let record = ConnectionRecord::from_map("c1", &map).unwrap();
        assert_eq!(record.user, "u");
        assert_eq!(record.worker_id, "w1");
        assert_eq!(record.session, None);
        assert_eq!(record.channels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(record.last_ping.timestamp(), 1767225600);
    }

    #[test]
    fn connection_record_absent_without_worker_id() {
        let mut map = HashMap::new();
        map.insert("user".to_string(), "u".to_string());
        assert!(ConnectionRecord::from_map("c1", &map).is_none());
        assert!(ConnectionRecord::from_map("c1", &HashMap::new()).is_none());
    }

    #[test]
    fn connection_record_lossy_last_ping() {
        let mut map = HashMap::new();
        map.insert("workerId".to_string(), "w1".to_string());
        map.insert("lastPing".to_string(), "not-a-time".to_string());

        let record = ConnectionRecord::from_map("c1", &map).unwrap();
        assert_eq!(record.last_ping, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn claim_record_requires_parsable_expiration() {
        let mut map = HashMap::new();
        map.insert("user".to_string(), "u".to_string());
        map.insert("expiration".to_string(), "garbage".to_string());

        assert!(ClaimRecord::from_map("k1", &map).is_err());

        map.insert("expiration".to_string(), "2026-01-01T00:00:00Z".to_string());
        let record = ClaimRecord::from_map("k1", &map).unwrap().unwrap();
        assert!(record.is_expired(Utc::now()));
    }

    #[test]
    fn claim_record_absent_cases() {
        assert!(ClaimRecord::from_map("k1", &HashMap::new()).unwrap().is_none());

        let mut map = HashMap::new();
        map.insert("expiration".to_string(), "2026-01-01T00:00:00Z".to_string());
        // No user: unusable, reads as absent
        assert!(ClaimRecord::from_map("k1", &map).unwrap().is_none());
    }

    #[test]
    fn record_fields_round_trip() {
        let record = ConnectionRecord {
            id: "c1".to_string(),
            user: "u".to_string(),
            worker_id: "w1".to_string(),
            session: Some("s".to_string()),
            channels: vec!["a".to_string()],
            last_ping: Utc::now(),
        };

        let map: HashMap<String, String> = record
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let restored = ConnectionRecord::from_map("c1", &map).unwrap();

        assert_eq!(restored.user, record.user);
        assert_eq!(restored.session, record.session);
        assert_eq!(restored.channels, record.channels);
    }

    #[test]
    fn key_prefixes() {
        assert_eq!(keys::connection("c"), "conn:c");
        assert_eq!(keys::user_session("u", "s"), "user-session:u-s");
        assert_eq!(keys::claim_channel("ch"), "claim-channel:ch");
        assert_eq!(keys::worker_messages("w"), "w");
        assert_eq!(keys::worker_channel_actions("w"), "w:channel");
    }
}
