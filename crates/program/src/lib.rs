//! In-memory model of a drum program: pad assignments, tempo and the effect chain.
//!
//! These types are mutated continuously by the live application and are the
//! source and destination of every save/load performed by `drum_project`.

pub mod effect;
pub mod program;

pub use effect::{EFFECT_CONFIG_SLOTS, Effect, EffectChain, EffectKind};
pub use program::{DEFAULT_PAD_COUNT, MAX_PAD_COUNT, PadSlot, Program};
