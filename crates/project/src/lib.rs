mod load;
mod save;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod transport;

pub use load::decode;
pub use save::{encode, encoded_len};
pub use service::SaveService;
pub use snapshot::Snapshot;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{Base64Transport, TextTransport};

/// Leading fence of every envelope. Changing the layout means changing this.
pub const HEADER: &str = "drum-save-v0.2";
/// Trailing fence of every envelope.
pub const TAIL: &str = "drum-done";
/// Key prefix for saved slots. Includes the header so a format bump leaves
/// older slots unreachable instead of misreading them.
pub const SAVE_PREFIX: &str = "PREF-drum-save-v0.2";

/// The buffer is not a valid envelope of this format version.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorruptionError {
    #[error("envelope truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { needed: usize, offset: usize },

    #[error("bad save header: {found:?}")]
    HeaderMismatch { found: String },

    #[error("bad save tail: {found:?}")]
    TailMismatch { found: String },

    #[error("{count} unexpected bytes after save tail")]
    TrailingBytes { count: usize },

    #[error("program has {expected} pads but the save holds {found}")]
    PadCountMismatch { expected: usize, found: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not decode transport string: {0}")]
    Decode(#[from] base64::DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences file error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no save in slot {slot}")]
    Missing { slot: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Corrupt(#[from] CorruptionError),
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to store save: {0}")]
    Store(#[from] StoreError),
}
