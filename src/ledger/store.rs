use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use uuid::Uuid;

use super::transaction::Transaction;

/// Durable slot for a user's full transaction set. One slot per user,
/// overwritten whole on every save, read once on sign-in.
pub trait LedgerStore {
    fn load(&self, user_id: Uuid) -> anyhow::Result<Option<Vec<Transaction>>>;
    fn save(&self, user_id: Uuid, transactions: &[Transaction]) -> anyhow::Result<()>;
}

/// JSON file per user under a directory, named after the owning user id.
pub struct JsonFileLedgerStore {
    dir: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn slot_path(&self, user_id: Uuid) -> PathBuf {
        self.dir.join(format!("transactions_{user_id}.json"))
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self, user_id: Uuid) -> anyhow::Result<Option<Vec<Transaction>>> {
        let contents = match fs::read_to_string(self.slot_path(user_id)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, user_id: Uuid, transactions: &[Transaction]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string(transactions)?;
        fs::write(self.slot_path(user_id), contents)?;
        Ok(())
    }
}

/// In-memory slots, for tests and demos.
#[derive(Default)]
pub struct MemoryLedgerStore {
    slots: Mutex<HashMap<Uuid, Vec<Transaction>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self, user_id: Uuid) -> anyhow::Result<Option<Vec<Transaction>>> {
        let slots = self.slots.lock().expect("ledger store lock poisoned");
        Ok(slots.get(&user_id).cloned())
    }

    fn save(&self, user_id: Uuid, transactions: &[Transaction]) -> anyhow::Result<()> {
        let mut slots = self.slots.lock().expect("ledger store lock poisoned");
        slots.insert(user_id, transactions.to_vec());
        Ok(())
    }
}
