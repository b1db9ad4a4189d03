//! Flash persistence of the configuration document.
//!
//! The document is the same JSON object the control protocol exchanges
//! (sixteen slot records, no descriptions), stored as a single item in a
//! `sequential-storage` map so that a successful write fully replaces the
//! previous document. One storage operation per call; no flash handle is
//! held between calls.

use core::ops::Range;

use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use heapless::Vec;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};
use sequential_storage::Error as SsError;
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::profile::{MacroTable, SlotPatch, SlotRecord, PATCH_LIST_CAP};
use crate::KEY_COUNT;

/// Map key of the configuration document.
const CONFIG_KEY: u32 = 0;

/// Buffer size for the serialized document and the storage scratch space;
/// a full sixteen-slot document is well under this.
const DOC_CAP: usize = 2048;

#[derive(Serialize)]
struct SavedConfig {
    macros: [SlotRecord; KEY_COUNT],
}

#[derive(Deserialize)]
struct StoredConfig {
    macros: Vec<SlotPatch, PATCH_LIST_CAP>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No document has ever been stored.
    Missing,
    /// The stored document does not parse or holds fewer than sixteen
    /// slots.
    Corrupted,
    /// The serialized document does not fit the storage buffer.
    Overflow,
    /// The flash backend failed.
    Flash,
}

impl<E> From<SsError<E>> for StorageError {
    fn from(err: SsError<E>) -> Self {
        match err {
            SsError::Corrupted { .. } => StorageError::Corrupted,
            _ => StorageError::Flash,
        }
    }
}

pub struct Storage<F: AsyncNorFlash> {
    flash: F,
    range: Range<u32>,
}

impl<F: AsyncNorFlash> Storage<F> {
    pub fn new(flash: F, config: &StorageConfig) -> Self {
        let range = config.start_addr
            ..config.start_addr + config.num_sectors as u32 * F::ERASE_SIZE as u32;
        Self { flash, range }
    }

    /// Read the stored document and merge it over the default profile.
    ///
    /// Each of the sixteen slots takes its fields from the document where
    /// present and from the default profile where absent, so a partial
    /// document never leaves a slot half-initialized. Callers fall back to
    /// the default table on any error.
    pub async fn load(&mut self) -> Result<MacroTable, StorageError> {
        let mut buffer = [0u8; DOC_CAP];
        let raw: Option<&[u8]> = fetch_item::<u32, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buffer,
            &CONFIG_KEY,
        )
        .await?;
        let Some(raw) = raw else {
            return Err(StorageError::Missing);
        };
        let (document, _) = serde_json_core::de::from_slice::<StoredConfig>(raw)
            .map_err(|_| StorageError::Corrupted)?;
        let table = MacroTable::from_stored(&document.macros).ok_or(StorageError::Corrupted)?;
        info!("configuration loaded from flash");
        Ok(table)
    }

    /// Serialize the table and store it, replacing the previous document.
    pub async fn save(&mut self, table: &MacroTable) -> Result<(), StorageError> {
        let document = SavedConfig {
            macros: table.records(),
        };
        let mut serialized = [0u8; DOC_CAP];
        let len = serde_json_core::ser::to_slice(&document, &mut serialized)
            .map_err(|_| StorageError::Overflow)?;

        let mut buffer = [0u8; DOC_CAP];
        let payload: &[u8] = &serialized[..len];
        store_item::<u32, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buffer,
            &CONFIG_KEY,
            &payload,
        )
        .await?;
        info!("configuration saved to flash");
        Ok(())
    }

    /// Wipe the storage region. Used when the stored document turns out to
    /// be corrupted, so the next boot starts from a clean map.
    pub async fn erase(&mut self) -> Result<(), StorageError> {
        sequential_storage::erase_all(&mut self.flash, self.range.clone())
            .await
            .map_err(StorageError::from)
    }
}
