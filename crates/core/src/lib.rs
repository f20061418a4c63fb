pub mod config;
pub mod session;

pub use config::Config;
pub use session::Session;

pub use drum_program::{
    DEFAULT_PAD_COUNT, EFFECT_CONFIG_SLOTS, Effect, EffectChain, EffectKind, MAX_PAD_COUNT,
    PadSlot, Program,
};
pub use drum_project::{
    Base64Transport, CorruptionError, FileStore, KeyValueStore, LoadError, MemoryStore,
    SaveError, SaveService, Snapshot, StoreError, TextTransport, TransportError,
};
