//! Detached copy of every field the save format persists.
//!
//! Decoding fills a `Snapshot` first and only touches live state once the
//! whole envelope, tail included, has been validated.

use crate::CorruptionError;
use drum_program::{EffectChain, EffectKind, PadSlot, Program};

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub banks: i32,
    pub tempo: i16,
    pub tempo_multiplier: i8,
    pub active_voice: i8,
    pub pads: Vec<PadSlot>,
    pub enabled_mask: u16,
    /// Compressor config slots 0 and 1
    pub compressor: [f32; 2],
}

impl Snapshot {
    pub fn capture(program: &Program, effects: &EffectChain) -> Self {
        let comp = effects.effect(EffectKind::Compressor);
        Self {
            banks: program.raw_banks(),
            tempo: program.tempo(),
            tempo_multiplier: program.tempo_multiplier(),
            active_voice: program.active_voice(),
            pads: program.pads().to_vec(),
            enabled_mask: effects.enabled_raw(),
            compressor: [
                comp.config(0).unwrap_or_default(),
                comp.config(1).unwrap_or_default(),
            ],
        }
    }

    /// Write every persisted field into live state.
    ///
    /// Non-compressor effects and compressor slots past 1 are left as they are.
    /// Nothing is written if the pad counts disagree.
    pub fn apply(
        self,
        program: &mut Program,
        effects: &mut EffectChain,
    ) -> Result<(), CorruptionError> {
        if self.pads.len() != program.pad_count() {
            return Err(CorruptionError::PadCountMismatch {
                expected: program.pad_count(),
                found: self.pads.len(),
            });
        }

        program.set_raw_banks(self.banks);
        program.set_tempo(self.tempo);
        program.set_tempo_multiplier(self.tempo_multiplier);
        program.set_active_voice(self.active_voice);
        program.pads_mut().copy_from_slice(&self.pads);

        effects.set_enabled_raw(self.enabled_mask);
        let comp = effects.effect_mut(EffectKind::Compressor);
        comp.set_config(0, self.compressor[0]);
        comp.set_config(1, self.compressor[1]);

        Ok(())
    }
}
