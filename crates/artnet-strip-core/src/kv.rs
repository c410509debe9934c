//! Flat key/value namespace
//!
//! [`KeyValueStore`] is the contract the settings store persists through.
//! [`RecordKvStore`] implements it by keeping every entry in memory and
//! writing the whole table as one [`PersistentStorage`] record on commit.

use heapless::{String, Vec};
use log::{info, warn};

use crate::storage::{Encodable, PersistentStorage, StorageDriver, StorageError};

/// Size of the storage block holding the table.
pub const KV_BLOCK_SIZE: usize = 2048;
pub const MAX_ENTRIES: usize = 20;
pub const MAX_KEY_LEN: usize = 15;
pub const MAX_STR_LEN: usize = 64;

pub type Key = String<MAX_KEY_LEN>;
pub type StoredStr = String<MAX_STR_LEN>;

const TAG_BOOL: u8 = 1;
const TAG_I32: u8 = 2;
const TAG_U32: u8 = 3;
const TAG_STR: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvError {
    Storage(StorageError),
    KeyTooLong,
    ValueTooLong,
    /// No room for another key
    Full,
}

impl From<StorageError> for KvError {
    fn from(error: StorageError) -> Self {
        KvError::Storage(error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    Str(StoredStr),
}

/// Typed access to a flat key/value namespace.
///
/// Getters return `None` when the key is absent or holds another type.
/// Puts are staged until [`commit`](KeyValueStore::commit).
pub trait KeyValueStore {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_i32(&self, key: &str) -> Option<i32>;
    fn get_u32(&self, key: &str) -> Option<u32>;
    fn get_str(&self, key: &str) -> Option<&str>;

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), KvError>;
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), KvError>;
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), KvError>;
    fn put_str(&mut self, key: &str, value: &str) -> Result<(), KvError>;

    /// Makes staged puts durable. On failure the staged puts are discarded.
    fn commit(&mut self) -> Result<(), KvError>;

    /// Discards staged puts, returning to the last committed state.
    fn rollback(&mut self);
}

/// In-memory entry table with a binary record encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entries {
    items: Vec<(Key, StoredValue), MAX_ENTRIES>,
}

impl Entries {
    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        self.items
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts or replaces the value under `key`.
    pub fn set(&mut self, key: &str, value: StoredValue) -> Result<(), KvError> {
        if let Some((_, slot)) = self.items.iter_mut().find(|(k, _)| k.as_str() == key) {
            *slot = value;
            return Ok(());
        }
        let mut owned = Key::new();
        owned.push_str(key).map_err(|()| KvError::KeyTooLong)?;
        self.items.push((owned, value)).map_err(|_| KvError::Full)
    }
}

impl Encodable for Entries {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let mut writer = Writer { buffer, pos: 0 };
        #[allow(clippy::cast_possible_truncation)]
        writer.put(&[self.items.len() as u8])?;
        for (key, value) in &self.items {
            #[allow(clippy::cast_possible_truncation)]
            writer.put(&[key.len() as u8])?;
            writer.put(key.as_bytes())?;
            match value {
                StoredValue::Bool(v) => writer.put(&[TAG_BOOL, u8::from(*v)])?,
                StoredValue::I32(v) => {
                    writer.put(&[TAG_I32])?;
                    writer.put(&v.to_le_bytes())?;
                }
                StoredValue::U32(v) => {
                    writer.put(&[TAG_U32])?;
                    writer.put(&v.to_le_bytes())?;
                }
                StoredValue::Str(v) => {
                    #[allow(clippy::cast_possible_truncation)]
                    writer.put(&[TAG_STR, v.len() as u8])?;
                    writer.put(v.as_bytes())?;
                }
            }
        }
        Ok(writer.pos)
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut reader = Reader { data, pos: 0 };
        let count = usize::from(reader.byte()?);
        if count > MAX_ENTRIES {
            return None;
        }

        let mut entries = Entries::default();
        for _ in 0..count {
            let key_len = usize::from(reader.byte()?);
            let key = core::str::from_utf8(reader.take(key_len)?).ok()?;
            let value = match reader.byte()? {
                TAG_BOOL => StoredValue::Bool(reader.byte()? != 0),
                TAG_I32 => StoredValue::I32(i32::from_le_bytes(reader.word()?)),
                TAG_U32 => StoredValue::U32(u32::from_le_bytes(reader.word()?)),
                TAG_STR => {
                    let len = usize::from(reader.byte()?);
                    let text = core::str::from_utf8(reader.take(len)?).ok()?;
                    let mut value = StoredStr::new();
                    value.push_str(text).ok()?;
                    StoredValue::Str(value)
                }
                _ => return None,
            };
            entries.set(key, value).ok()?;
        }
        Some(entries)
    }
}

struct Writer<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let end = self.pos + bytes.len();
        let target = self
            .buffer
            .get_mut(self.pos..end)
            .ok_or(StorageError::Overflow)?;
        target.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.data.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(bytes)
    }

    fn byte(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn word(&mut self) -> Option<[u8; 4]> {
        self.take(4)?.try_into().ok()
    }
}

/// Key/value store persisted as a single record in one storage block.
pub struct RecordKvStore<D: StorageDriver<KV_BLOCK_SIZE>> {
    storage: PersistentStorage<D, KV_BLOCK_SIZE>,
    entries: Entries,
    /// Entries as last read from or written to storage
    committed: Entries,
    dirty: bool,
}

impl<D: StorageDriver<KV_BLOCK_SIZE>> RecordKvStore<D> {
    /// Opens the namespace. Unreadable storage opens as an empty namespace.
    pub fn open(driver: D) -> Self {
        let storage = PersistentStorage::new(driver);
        let entries = match storage.load::<Entries>() {
            Ok(entries) => entries,
            Err(StorageError::InvalidMagicHeader) => {
                info!("kv: no record found, starting empty");
                Entries::default()
            }
            Err(e) => {
                warn!("kv: failed to read record: {:?}", e);
                Entries::default()
            }
        };
        Self {
            storage,
            committed: entries.clone(),
            entries,
            dirty: false,
        }
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn driver(&self) -> &D {
        self.storage.driver()
    }

    fn stage(&mut self, key: &str, value: StoredValue) -> Result<(), KvError> {
        if self.entries.get(key) == Some(&value) {
            return Ok(());
        }
        self.entries.set(key, value)?;
        self.dirty = true;
        Ok(())
    }
}

impl<D: StorageDriver<KV_BLOCK_SIZE>> KeyValueStore for RecordKvStore<D> {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            StoredValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn get_i32(&self, key: &str) -> Option<i32> {
        match self.entries.get(key)? {
            StoredValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        match self.entries.get(key)? {
            StoredValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            StoredValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), KvError> {
        self.stage(key, StoredValue::Bool(value))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), KvError> {
        self.stage(key, StoredValue::I32(value))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), KvError> {
        self.stage(key, StoredValue::U32(value))
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let mut stored = StoredStr::new();
        stored
            .push_str(value)
            .map_err(|()| KvError::ValueTooLong)?;
        self.stage(key, StoredValue::Str(stored))
    }

    fn commit(&mut self) -> Result<(), KvError> {
        if !self.dirty {
            return Ok(());
        }
        if let Err(e) = self.storage.save(&self.entries) {
            self.rollback();
            return Err(e.into());
        }
        self.committed = self.entries.clone();
        self.dirty = false;
        Ok(())
    }

    fn rollback(&mut self) {
        if self.dirty {
            self.entries = self.committed.clone();
            self.dirty = false;
        }
    }
}
