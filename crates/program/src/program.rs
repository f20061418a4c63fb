use serde::{Deserialize, Serialize};

/// Number of pads on the stock drum layout.
pub const DEFAULT_PAD_COUNT: usize = 8;

/// Largest pad count a configured layout may ask for.
pub const MAX_PAD_COUNT: usize = 256;

/// Per-pad sample parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadSlot {
    /// Raw sample assignment word for the pad
    pub raw_assignment: i32,
    pub sample_variant: i8,
    /// Linear gain, 1.0 is unity
    pub volume: f32,
    pub volume_variation: i16,
}

impl Default for PadSlot {
    fn default() -> Self {
        Self {
            raw_assignment: 0,
            sample_variant: 0,
            volume: 1.0,
            volume_variation: 0,
        }
    }
}

/// One editable drum program.
///
/// The pad count is fixed when the program is created. Nothing in this type
/// can grow or shrink `pads` afterwards, so a saved program is always decoded
/// against the same layout it was encoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Packed per-pad bank bitfield, stored and restored as a single word
    banks: i32,
    tempo: i16,
    tempo_multiplier: i8,
    active_voice: i8,
    pads: Vec<PadSlot>,
}

impl Program {
    pub fn new(pad_count: usize) -> Self {
        Self {
            banks: 0,
            tempo: 120,
            tempo_multiplier: 1,
            active_voice: 0,
            pads: vec![PadSlot::default(); pad_count],
        }
    }

    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    pub fn raw_banks(&self) -> i32 {
        self.banks
    }

    pub fn set_raw_banks(&mut self, banks: i32) {
        self.banks = banks;
    }

    pub fn tempo(&self) -> i16 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: i16) {
        self.tempo = tempo;
    }

    pub fn tempo_multiplier(&self) -> i8 {
        self.tempo_multiplier
    }

    pub fn set_tempo_multiplier(&mut self, multiplier: i8) {
        self.tempo_multiplier = multiplier;
    }

    pub fn active_voice(&self) -> i8 {
        self.active_voice
    }

    pub fn set_active_voice(&mut self, voice: i8) {
        self.active_voice = voice;
    }

    pub fn pads(&self) -> &[PadSlot] {
        &self.pads
    }

    /// Mutable view of every pad. The slice length cannot change.
    pub fn pads_mut(&mut self) -> &mut [PadSlot] {
        &mut self.pads
    }

    pub fn pad(&self, index: usize) -> Option<&PadSlot> {
        self.pads.get(index)
    }

    pub fn pad_mut(&mut self, index: usize) -> Option<&mut PadSlot> {
        self.pads.get_mut(index)
    }

    pub fn sample_variant(&self, index: usize) -> Option<i8> {
        self.pad(index).map(|pad| pad.sample_variant)
    }

    pub fn set_sample_variant(&mut self, index: usize, variant: i8) {
        if let Some(pad) = self.pad_mut(index) {
            pad.sample_variant = variant;
        }
    }

    pub fn volume(&self, index: usize) -> Option<f32> {
        self.pad(index).map(|pad| pad.volume)
    }

    pub fn set_volume(&mut self, index: usize, volume: f32) {
        if let Some(pad) = self.pad_mut(index) {
            pad.volume = volume;
        }
    }

    pub fn volume_variation(&self, index: usize) -> Option<i16> {
        self.pad(index).map(|pad| pad.volume_variation)
    }

    pub fn set_volume_variation(&mut self, index: usize, variation: i16) {
        if let Some(pad) = self.pad_mut(index) {
            pad.volume_variation = variation;
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new(DEFAULT_PAD_COUNT)
    }
}
