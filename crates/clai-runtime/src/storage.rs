use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use clai_store::Store;

use crate::Result;

/// Shared access to the store: one writer connection behind a mutex (the
/// ingest thread is its only steady-state user) and a pool of read-only
/// connections for suggest/query readers. In-memory databases cannot be
/// shared across connections, so the pool is empty there and reads fall
/// back to the writer connection.
pub struct StoreHandle {
    writer: Mutex<Store>,
    readers: Vec<Mutex<Store>>,
    next_reader: AtomicUsize,
}

impl StoreHandle {
    pub fn open(db_path: &Path, busy_timeout_ms: u64, reader_pool_size: usize) -> Result<Arc<Self>> {
        let writer = Store::open_with_busy_timeout(db_path, busy_timeout_ms)?;

        let mut readers = Vec::with_capacity(reader_pool_size);
        for _ in 0..reader_pool_size {
            readers.push(Mutex::new(Store::open_reader(db_path)?));
        }

        Ok(Arc::new(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        }))
    }

    pub fn open_in_memory() -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            writer: Mutex::new(Store::open_in_memory()?),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        }))
    }

    /// Run a mutation on the writer connection.
    pub fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.writer.lock().unwrap();
        f(&mut store)
    }

    /// Run a read, preferring a pooled read-only connection.
    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        if self.readers.is_empty() {
            let store = self.writer.lock().unwrap();
            return f(&store);
        }
        let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let store = self.readers[index].lock().unwrap();
        f(&store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clai_store::{AggregateTuning, EventApply, NewCommandEvent};

    fn apply(cmd: &str) -> EventApply {
        EventApply {
            event: NewCommandEvent {
                session_id: "s1".to_string(),
                command_id: cmd.to_string(),
                ts_ms: 1,
                cwd: "/tmp".to_string(),
                repo_key: None,
                branch: None,
                cmd_raw: cmd.to_string(),
                cmd_norm: cmd.to_string(),
                cmd_truncated: false,
                template_id: cmd.to_string(),
                exit_code: Some(0),
                duration_ms: Some(1),
            },
            slots: Vec::new(),
            prev_template_id: None,
            scopes: vec!["global".to_string()],
            tuning: AggregateTuning::default(),
            defer_decay: false,
        }
    }

    #[test]
    fn pooled_readers_observe_writer_commits() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::open(&dir.path().join("state.db"), 50, 2).unwrap();

        handle
            .write(|store| store.apply_command_end(&apply("git status")))
            .unwrap();

        let rows = handle.read(|store| store.top_stats("global", None, 10)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn in_memory_reads_share_the_writer() {
        let handle = StoreHandle::open_in_memory().unwrap();
        handle.write(|store| store.apply_command_end(&apply("ls"))).unwrap();
        let rows = handle.read(|store| store.top_stats("global", None, 10)).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
