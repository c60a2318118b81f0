use crate::config::StoreConfig;
use crate::error::{BridgeError, Result};
use crate::store::{ChangeEvent, ChangeFeed, NotificationSource, Store};
use crate::types::StoreAddress;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use r2d2::Pool;
use redis::Commands;
use std::collections::HashMap;
use std::pin::Pin;
use tracing::{debug, info, trace};

type StorePool = Pool<redis::Client>;

/// Redis implementation of the Store trait
///
/// Reads and writes go through a pool so the synchronizer and the relay
/// can check out connections concurrently. Subscriptions use their own
/// dedicated async connection.
pub struct RedisStore {
    client: redis::Client,
    pool: StorePool,
    keyspace_events: String,
    pattern: String,
}

impl RedisStore {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let db = client.get_connection_info().redis.db;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(1))
            .connection_timeout(config.connect_timeout())
            .build(client.clone())?;

        info!(
            "Connected to store at {} (db {}, pool size {})",
            config.url, db, config.pool_size
        );

        Ok(RedisStore {
            client,
            pool,
            keyspace_events: config.keyspace_events.clone(),
            pattern: keyspace_pattern(db, &config.key_pattern),
        })
    }

    /// Turn on keyspace notifications for the commands the bridge follows
    fn enable_notifications(&self) -> Result<()> {
        let mut conn = self.pool.get()?;
        notify_keyspace_events(&self.keyspace_events).query::<()>(&mut *conn)?;
        debug!("notify-keyspace-events set to {}", self.keyspace_events);
        Ok(())
    }
}

/// Keyspace channel pattern for keys of one database
fn keyspace_pattern(db: i64, key_pattern: &str) -> String {
    format!("__keyspace@{}__:{}", db, key_pattern)
}

fn notify_keyspace_events(events: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("CONFIG");
    cmd.arg("SET").arg("notify-keyspace-events").arg(events);
    cmd
}

impl Store for RedisStore {
    fn get(&self, address: &StoreAddress) -> Result<Option<String>> {
        let mut conn = self.pool.get()?;
        let value: Option<String> = match address {
            StoreAddress::Key(key) => conn.get(key)?,
            StoreAddress::Field { container, field } => conn.hget(container, field)?,
        };
        Ok(value)
    }

    fn set(&self, address: &StoreAddress, value: &str) -> Result<()> {
        let mut conn = self.pool.get()?;
        match address {
            StoreAddress::Key(key) => conn.set::<_, _, ()>(key, value)?,
            StoreAddress::Field { container, field } => {
                conn.hset::<_, _, _, ()>(container, field, value)?
            }
        }
        trace!("SET {} = {}", address, value);
        Ok(())
    }

    fn read_record(&self, container: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.pool.get()?;
        let fields: HashMap<String, String> = conn.hgetall(container)?;
        Ok(fields)
    }
}

#[async_trait]
impl NotificationSource for RedisStore {
    async fn subscribe(&self) -> Result<Box<dyn ChangeFeed>> {
        self.enable_notifications()?;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(&self.pattern).await?;
        info!("Subscribed to {}", self.pattern);

        Ok(Box::new(RedisFeed {
            messages: Box::pin(pubsub.into_on_message()),
        }))
    }
}

type MessageStream = Pin<Box<dyn Stream<Item = redis::Msg> + Send>>;

/// Keyspace notifications from one pattern subscription
struct RedisFeed {
    messages: MessageStream,
}

#[async_trait]
impl ChangeFeed for RedisFeed {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            let msg = match self.messages.next().await {
                Some(msg) => msg,
                None => return Ok(None),
            };

            let payload: String = msg
                .get_payload()
                .map_err(|e| BridgeError::Transport(format!("bad notification: {}", e)))?;

            match ChangeEvent::from_keyspace(msg.get_channel_name(), &payload) {
                Some(event) => return Ok(Some(event)),
                None => trace!(
                    "Ignoring {} on {}",
                    payload,
                    msg.get_channel_name()
                ),
            }
        }
    }
}
