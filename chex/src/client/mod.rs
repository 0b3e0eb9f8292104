//! Client surface over a pluggable transport
//!
//! The marshalling core does not speak the wire protocol itself. A
//! [`Transport`] moves blocks to and from a server; [`Client`] adds the
//! host-facing conveniences on top (row projection across result blocks,
//! the `pong` liveness reply, option validation).

mod error;
mod memory;

pub use error::{ClientError, ErrorKind, ErrorPayload};
pub use memory::MemoryTransport;

use serde::Deserialize;

use crate::block::Block;
use crate::data::Row;
use crate::decode::block_to_rows;
use crate::Result;

/// Block compression negotiated with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub compression: Compression,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            database: None,
            user: None,
            password: None,
            compression: Compression::None,
        }
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    (!value.is_empty()).then_some(value)
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    /// Empty strings leave the server default in place
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = non_empty(database);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = non_empty(user);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = non_empty(password);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Parse options from a JSON object; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut options: ClientOptions = serde_json::from_str(json)?;
        options.database = options.database.and_then(non_empty);
        options.user = options.user.and_then(non_empty);
        options.password = options.password.and_then(non_empty);
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> std::result::Result<(), ClientError> {
        if self.host.is_empty() {
            return Err(ClientError::Validation("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::Validation("port must be non-zero".into()));
        }
        Ok(())
    }
}

/// Moves blocks between the client and a server
pub trait Transport {
    /// Round-trip a liveness check
    fn ping(&mut self) -> Result<()>;

    /// Run a statement that returns no data
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Send one block of rows into `table`
    fn insert(&mut self, table: &str, block: &Block) -> Result<()>;

    /// Run a query, handing each result block to `on_block` as it arrives
    fn select(&mut self, sql: &str, on_block: &mut dyn FnMut(&Block) -> Result<()>) -> Result<()>;

    /// Drop and re-establish the underlying connection
    fn reset_connection(&mut self) -> Result<()>;
}

/// Host-facing client
pub struct Client {
    options: ClientOptions,
    transport: Box<dyn Transport + Send>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("options", &self.options).finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(options: ClientOptions, transport: Box<dyn Transport + Send>) -> Result<Self> {
        options.validate()?;
        log::info!("client for {}:{} created", options.host, options.port);
        Ok(Self { options, transport })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns `"pong"` when the server answers
    pub fn ping(&mut self) -> Result<&'static str> {
        self.transport.ping()?;
        Ok("pong")
    }

    pub fn execute(&mut self, sql: &str) -> Result<()> {
        log::debug!("execute: {}", sql);
        self.transport.execute(sql)
    }

    pub fn insert(&mut self, table: &str, block: &Block) -> Result<()> {
        log::debug!("insert {} rows into {}", block.row_count(), table);
        self.transport.insert(table, block)
    }

    /// Run a query and collect the rows of every result block in order
    pub fn select(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.transport.select(sql, &mut |block: &Block| {
            if block.column_count() == 0 {
                log::warn!("skipping result block without columns");
                return Ok(());
            }
            rows.extend(block_to_rows(block)?);
            Ok(())
        })?;
        log::debug!("select returned {} rows", rows.len());
        Ok(rows)
    }

    /// Run a query and hand each result block to `on_block`
    pub fn select_blocks(&mut self, sql: &str, on_block: &mut dyn FnMut(&Block) -> Result<()>) -> Result<()> {
        self.transport.select(sql, on_block)
    }

    pub fn reset_connection(&mut self) -> Result<()> {
        log::info!("resetting connection to {}:{}", self.options.host, self.options.port);
        self.transport.reset_connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::data::Value;
    use crate::ChexError;

    fn block(ids: Vec<u64>) -> Block {
        let mut block = Block::new();
        block.append_column("id", Column::UInt64(ids)).unwrap();
        block
    }

    #[test]
    fn test_options_defaults_and_json() {
        let options = ClientOptions::default();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 9000);

        let options = ClientOptions::from_json(r#"{"host":"db","database":"","compression":"lz4"}"#).unwrap();
        assert_eq!(options.host, "db");
        assert_eq!(options.port, 9000);
        assert_eq!(options.database, None);
        assert_eq!(options.compression, Compression::Lz4);

        assert!(ClientOptions::from_json(r#"{"port":0}"#).is_err());
        assert_eq!(ClientOptions::new("h", 1).with_user("").user, None);
    }

    #[test]
    fn test_ping_and_select_across_blocks() {
        let mut transport = MemoryTransport::new();
        transport.register_result("SELECT id FROM t", vec![block(vec![1, 2]), Block::new(), block(vec![3])]);
        let mut client = Client::new(ClientOptions::default(), Box::new(transport)).unwrap();

        assert_eq!(client.ping().unwrap(), "pong");
        let rows = client.select("SELECT id FROM t").unwrap();
        let ids: Vec<&Value> = rows.iter().filter_map(|r| r.get("id")).collect();
        assert_eq!(ids, vec![&Value::UInt64(1), &Value::UInt64(2), &Value::UInt64(3)]);
        assert!(client.select("SELECT 1").unwrap().is_empty());
    }

    #[test]
    fn test_transport_errors_propagate() {
        let mut transport = MemoryTransport::new();
        transport.fail_next(ClientError::Connection { code: 111, message: "refused".into() });
        let mut client = Client::new(ClientOptions::default(), Box::new(transport)).unwrap();
        assert!(matches!(
            client.ping(),
            Err(ChexError::Client(ClientError::Connection { code: 111, .. }))
        ));
        assert_eq!(client.ping().unwrap(), "pong");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ClientOptions::new("", 9000);
        assert!(Client::new(options, Box::new(MemoryTransport::new())).is_err());
    }
}
