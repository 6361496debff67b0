use std::{
    fs,
    path::PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

use crate::core::KotonoteError;


const APP_NAME: &str = "kotonote";

pub const TAGS_KEY: &str = "travel_note_tags_v1";
pub const CARDS_KEY: &str = "travel_note_cards_v1";
/// Reserved blob key kept for layout compatibility; never read at runtime.
pub const APP_NAME_KEY: &str = "travel_note_app_name_v1";

const BLOB_VERSION: u32 = 1;

/// Envelope written around every persisted payload so future shape changes can
/// migrate instead of silently corrupting old data.
#[derive(Serialize, Deserialize)]
struct VersionedBlob<T> {
    version: u32,
    data: T,
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join(APP_NAME)
    } else {
        PathBuf::from(".")
    }
}

/// JSON blob store bound to one directory; each key becomes `<key>.json`.
pub struct JsonStorage {
    dir: PathBuf,
}

impl JsonStorage {
    pub fn new() -> Self {
        Self::with_dir(default_data_dir())
    }

    /// Bind the store to an explicit directory (tests point this at a temp dir).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn save<T: Serialize>(&self, data: &T, key: &str) -> Result<(), KotonoteError> {
        fs::create_dir_all(&self.dir)?;
        let blob = VersionedBlob { version: BLOB_VERSION, data };
        let json = serde_json::to_string_pretty(&blob)?;
        let path = self.file_path(key);
        fs::write(&path, json)?;
        debug!(path = %path.display(), "blob saved");
        Ok(())
    }

    pub fn load<T: for<'de> Deserialize<'de> + Default>(
        &self,
        key: &str,
    ) -> Result<T, KotonoteError> {
        let path = self.file_path(key);

        if !path.exists() {
            return Ok(T::default());
        }

        let json = fs::read_to_string(&path)?;
        match serde_json::from_str::<VersionedBlob<T>>(&json) {
            Ok(blob) if blob.version <= BLOB_VERSION => Ok(blob.data),
            Ok(blob) => Err(KotonoteError::Custom(format!(
                "unsupported blob version {} for {}",
                blob.version, key
            ))),
            // Pre-envelope payloads were written bare; read them as version 0 and
            // let the next save rewrite the envelope.
            Err(_) => Ok(serde_json::from_str::<T>(&json)?),
        }
    }

    pub fn load_or_default<T: for<'de> Deserialize<'de> + Default>(&self, key: &str) -> T {
        match self.load(key) {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "failed to load blob, using defaults");
                T::default()
            }
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.file_path(key).exists()
    }

    pub fn delete(&self, key: &str) -> Result<(), KotonoteError> {
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

impl Default for JsonStorage {
    fn default() -> Self {
        Self::new()
    }
}
