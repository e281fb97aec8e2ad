//! Named database connections.
//!
//! A [`ConnectionRegistry`] owns every [`Connection`] of a process (or of a test) and
//! guarantees at most one connection per database name. Opening is started by
//! [`ConnectionRegistry::create_connection`] and finishes in the background; the
//! returned handle becomes usable once [`Connection::ready`] resolves.
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{connection::{ConnectionConfig, ConnectionRegistry, NoEvents}, memory::InMemoryConnector};
//!
//! let registry = Arc::new(ConnectionRegistry::new(InMemoryConnector::new()));
//! let connection = registry
//!     .create_connection(ConnectionConfig::new("memory://").with_db_name("shop"), NoEvents)
//!     .await;
//! connection.ready().await?;
//! ```

use mea::mutex::Mutex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    backend::{StoreBackend, StoreConnector},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Database name used when none is configured.
pub const DEFAULT_DB_NAME: &str = "default";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Settings for opening one named connection.
///
/// Deserializable so hosts can keep it in their own configuration files; every field
/// except `connection_string` has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Driver connection string, e.g. `mongodb://localhost:27017`.
    pub connection_string: String,
    /// Registry key and database name. Defaults to `"default"`.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Optional user name for authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Optional password for authentication.
    #[serde(default)]
    pub pass: Option<String>,
    /// Time allowed for establishing the connection. Defaults to 10000 ms.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Time allowed for a single store round trip. Defaults to 10000 ms.
    #[serde(default = "default_timeout_ms")]
    pub socket_timeout_ms: u64,
}

impl ConnectionConfig {
    /// Creates a configuration with defaults for everything but the connection string.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            db_name: default_db_name(),
            user: None,
            pass: None,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            socket_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_socket_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.socket_timeout_ms = timeout_ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

/// Notifications about the outcome of opening a connection.
///
/// Only newly created connections report; asking the registry for an existing name
/// never fires either callback.
pub trait ConnectionEvents: Send + Sync {
    /// Called once the connection is open and usable.
    fn on_connection(&self, _connection: &Connection) {}

    /// Called when opening failed. The connection stays in the failed state.
    fn on_error(&self, _error: &DocumentStoreError) {}
}

/// Ignores both notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl ConnectionEvents for NoEvents {}

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// The open is in flight.
    Connecting,
    /// The session is usable.
    Open(Arc<dyn StoreBackend>),
    /// The open failed; not retried.
    Failed(DocumentStoreError),
    /// Removed from the registry.
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open(_))
    }
}

/// Handle to one named database session. Owned by the [`ConnectionRegistry`].
#[derive(Debug)]
pub struct Connection {
    name: String,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    fn new(name: String) -> Self {
        Self {
            name,
            state: watch::Sender::new(ConnectionState::Connecting),
        }
    }

    /// The database name this connection is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Waits until the open has finished and returns the backend.
    ///
    /// # Errors
    ///
    /// Returns the open failure as [`DocumentStoreError::Connection`], or
    /// [`DocumentStoreError::NotConnected`] once the connection has been removed.
    pub async fn ready(&self) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
        let mut receiver = self.state.subscribe();
        let state = receiver
            .wait_for(|state| !matches!(state, ConnectionState::Connecting))
            .await
            .map_err(|_| DocumentStoreError::NotConnected(self.name.clone()))?;

        match &*state {
            ConnectionState::Open(backend) => Ok(backend.clone()),
            ConnectionState::Failed(err) => Err(err.clone()),
            ConnectionState::Connecting | ConnectionState::Closed => {
                Err(DocumentStoreError::NotConnected(self.name.clone()))
            }
        }
    }

    /// Returns a clone of the concrete driver if the connection is open and backed by `B`.
    pub fn backend_as<B>(&self) -> Option<B>
    where
        B: StoreBackend + Clone + 'static,
    {
        match &*self.state.borrow() {
            ConnectionState::Open(backend) => backend.as_any().downcast_ref::<B>().cloned(),
            _ => None,
        }
    }

    /// Moves `Connecting` to `Open`. Returns `false` if the connection was closed meanwhile.
    fn mark_open(&self, backend: Arc<dyn StoreBackend>) -> bool {
        self.state.send_if_modified(|state| match state {
            ConnectionState::Connecting => {
                *state = ConnectionState::Open(backend);
                true
            }
            _ => false,
        })
    }

    /// Moves `Connecting` to `Failed`. Returns `false` if the connection was closed meanwhile.
    fn mark_failed(&self, error: DocumentStoreError) -> bool {
        self.state.send_if_modified(|state| match state {
            ConnectionState::Connecting => {
                *state = ConnectionState::Failed(error);
                true
            }
            _ => false,
        })
    }

    /// Marks the connection closed and hands back the backend, if it was open.
    fn close(&self) -> Option<Arc<dyn StoreBackend>> {
        match self.state.send_replace(ConnectionState::Closed) {
            ConnectionState::Open(backend) => Some(backend),
            _ => None,
        }
    }
}

/// Table of named connections sharing one [`StoreConnector`].
///
/// Creation for a given name is serialized by the registry lock, so concurrent
/// callers asking for the same name share a single open.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connector: Arc<dyn StoreConnector>,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry opening sessions through `connector`.
    pub fn new(connector: impl StoreConnector + 'static) -> Self {
        Self {
            connector: Arc::new(connector),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the connection for `config.db_name`, starting an open if there is none.
    ///
    /// The open runs on the current tokio runtime; this call only waits for the
    /// registry lock. `events` is notified when a new open succeeds or fails and is
    /// dropped unused when the name is already registered or is removed before the
    /// open finishes.
    pub async fn create_connection(
        &self,
        config: ConnectionConfig,
        events: impl ConnectionEvents + 'static,
    ) -> Arc<Connection> {
        let mut connections = self.connections.lock().await;

        if let Some(existing) = connections.get(&config.db_name) {
            debug!(db_name = %config.db_name, "reusing registered connection");
            return existing.clone();
        }

        let connection = Arc::new(Connection::new(config.db_name.clone()));
        connections.insert(config.db_name.clone(), connection.clone());
        drop(connections);

        let connector = self.connector.clone();
        let opening = connection.clone();

        tokio::spawn(async move {
            match connector.connect(&config).await {
                Ok(backend) => {
                    if opening.mark_open(backend.clone()) {
                        info!(db_name = %config.db_name, "connection opened");
                        events.on_connection(&opening);
                    } else if let Err(err) = backend.shutdown().await {
                        warn!(db_name = %config.db_name, error = %err, "shutdown of orphaned connection failed");
                    }
                }
                Err(err) => {
                    if opening.mark_failed(err.clone()) {
                        warn!(db_name = %config.db_name, error = %err, "connection failed");
                        events.on_error(&err);
                    } else {
                        debug!(db_name = %config.db_name, error = %err, "open of removed connection failed");
                    }
                }
            }
        });

        connection
    }

    /// Returns the connection registered under `db_name`.
    pub async fn get_connection(&self, db_name: &str) -> Option<Arc<Connection>> {
        self.connections
            .lock()
            .await
            .get(db_name)
            .cloned()
    }

    /// Removes the connection registered under `db_name`.
    ///
    /// Outstanding handles observe the closed state. Releasing the session itself is
    /// left to the driver when its last handle is dropped; use [`Self::teardown`] for an
    /// explicit shutdown. Returns whether an entry was removed.
    pub async fn delete_connection(&self, db_name: &str) -> bool {
        match self.connections.lock().await.remove(db_name) {
            Some(connection) => {
                connection.close();
                debug!(db_name, "connection removed");
                true
            }
            None => false,
        }
    }

    /// Removes every connection.
    pub async fn clear_connections(&self) {
        let drained = self
            .connections
            .lock()
            .await
            .drain()
            .map(|(_, connection)| connection)
            .collect::<Vec<_>>();

        for connection in drained {
            connection.close();
        }
    }

    /// Names of all registered connections, sorted.
    pub async fn connection_names(&self) -> Vec<String> {
        let mut names = self
            .connections
            .lock()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Removes every connection and shuts down each open backend.
    ///
    /// All backends are shut down even if one fails; the first failure is returned.
    pub async fn teardown(&self) -> DocumentStoreResult<()> {
        let drained = self
            .connections
            .lock()
            .await
            .drain()
            .collect::<Vec<_>>();
        let mut result = Ok(());

        for (name, connection) in drained {
            if let Some(backend) = connection.close() {
                if let Err(err) = backend.shutdown().await {
                    warn!(db_name = %name, error = %err, "backend shutdown failed");
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
        }

        result
    }
}
