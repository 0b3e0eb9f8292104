//! In-process transport that records traffic and replays canned results

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use super::{ClientError, Transport};
use crate::block::Block;
use crate::Result;

#[derive(Debug, Default)]
struct State {
    executed: Vec<String>,
    inserted: Vec<(String, Block)>,
    results: AHashMap<String, Vec<Block>>,
    failures: VecDeque<ClientError>,
    resets: usize,
}

/// Transport backed by memory.
///
/// Clones share state, so a test can keep a handle after boxing one into a
/// [`Client`](super::Client).
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks returned by `select` for exactly this SQL text
    pub fn register_result(&mut self, sql: &str, blocks: Vec<Block>) {
        self.state.lock().results.insert(sql.to_string(), blocks);
    }

    /// Make the next transport call fail with `err`
    pub fn fail_next(&mut self, err: ClientError) {
        self.state.lock().failures.push_back(err);
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    pub fn inserted(&self) -> Vec<(String, Block)> {
        self.state.lock().inserted.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().resets
    }

    fn check_failure(&self) -> Result<()> {
        match self.state.lock().failures.pop_front() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

impl Transport for MemoryTransport {
    fn ping(&mut self) -> Result<()> {
        self.check_failure()
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.check_failure()?;
        self.state.lock().executed.push(sql.to_string());
        Ok(())
    }

    fn insert(&mut self, table: &str, block: &Block) -> Result<()> {
        self.check_failure()?;
        self.state.lock().inserted.push((table.to_string(), block.clone()));
        Ok(())
    }

    fn select(&mut self, sql: &str, on_block: &mut dyn FnMut(&Block) -> Result<()>) -> Result<()> {
        self.check_failure()?;
        // Release the lock before running the callback
        let blocks = self.state.lock().results.get(sql).cloned().unwrap_or_default();
        for block in &blocks {
            on_block(block)?;
        }
        Ok(())
    }

    fn reset_connection(&mut self) -> Result<()> {
        self.check_failure()?;
        self.state.lock().resets += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, ClientOptions};
    use crate::column::Column;

    #[test]
    fn test_records_traffic() {
        let transport = MemoryTransport::new();
        let mut client = Client::new(ClientOptions::default(), Box::new(transport.clone())).unwrap();

        client.execute("CREATE TABLE t (id UInt64) ENGINE = Memory").unwrap();
        let mut block = Block::new();
        block.append_column("id", Column::UInt64(vec![1])).unwrap();
        client.insert("t", &block).unwrap();
        client.reset_connection().unwrap();

        assert_eq!(transport.executed(), vec!["CREATE TABLE t (id UInt64) ENGINE = Memory".to_string()]);
        let inserted = transport.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, "t");
        assert_eq!(inserted[0].1, block);
        assert_eq!(transport.reset_count(), 1);
    }

    #[test]
    fn test_failure_is_consumed_once() {
        let mut transport = MemoryTransport::new();
        transport.fail_next(ClientError::Protocol("bad packet".into()));
        assert!(transport.execute("SELECT 1").is_err());
        assert!(transport.execute("SELECT 1").is_ok());
        assert_eq!(transport.executed().len(), 1);
    }
}
