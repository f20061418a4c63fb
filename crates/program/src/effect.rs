use serde::{Deserialize, Serialize};

/// Number of configuration parameters carried by every effect.
pub const EFFECT_CONFIG_SLOTS: usize = 4;

/// The closed set of effects in the mixer chain.
///
/// The discriminant is the effect's bit position in [`EffectChain::enabled_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Compressor = 0,
    Delay = 1,
    Filter = 2,
    Reverb = 3,
}

impl EffectKind {
    pub const COUNT: usize = 4;

    pub const ALL: [EffectKind; Self::COUNT] = [
        EffectKind::Compressor,
        EffectKind::Delay,
        EffectKind::Filter,
        EffectKind::Reverb,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Compressor => "compressor",
            EffectKind::Delay => "delay",
            EffectKind::Filter => "filter",
            EffectKind::Reverb => "reverb",
        }
    }

    #[inline]
    fn bit(self) -> u16 {
        1 << self.index()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    kind: EffectKind,
    config: [f32; EFFECT_CONFIG_SLOTS],
}

impl Effect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            config: [0.0; EFFECT_CONFIG_SLOTS],
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn config(&self, slot: usize) -> Option<f32> {
        self.config.get(slot).copied()
    }

    /// Set a configuration parameter. Slots past [`EFFECT_CONFIG_SLOTS`] are ignored.
    pub fn set_config(&mut self, slot: usize, value: f32) {
        if let Some(entry) = self.config.get_mut(slot) {
            *entry = value;
        }
    }

    pub fn configs(&self) -> &[f32; EFFECT_CONFIG_SLOTS] {
        &self.config
    }
}

/// Mixer effect chain with one [`Effect`] per [`EffectKind`].
///
/// Activation is tracked as a bitmask rather than per effect so the whole
/// chain state can be read and restored as a single 16-bit word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEffectChain")]
pub struct EffectChain {
    enabled_mask: u16,
    effects: [Effect; EffectKind::COUNT],
}

/// Unchecked serde form of [`EffectChain`].
#[derive(Deserialize)]
struct RawEffectChain {
    enabled_mask: u16,
    effects: Vec<Effect>,
}

impl TryFrom<RawEffectChain> for EffectChain {
    type Error = String;

    /// Effects must list every kind exactly once, in index order.
    fn try_from(raw: RawEffectChain) -> Result<Self, Self::Error> {
        let found = raw.effects.len();
        let effects: [Effect; EffectKind::COUNT] = raw.effects.try_into().map_err(|_| {
            format!(
                "effect chain needs {} effects, found {found}",
                EffectKind::COUNT
            )
        })?;
        for (effect, kind) in effects.iter().zip(EffectKind::ALL) {
            if effect.kind != kind {
                return Err(format!(
                    "expected {} at index {}, found {}",
                    kind.name(),
                    kind.index(),
                    effect.kind.name()
                ));
            }
        }
        Ok(Self {
            enabled_mask: raw.enabled_mask,
            effects,
        })
    }
}

impl EffectChain {
    pub fn new() -> Self {
        Self {
            enabled_mask: 0,
            effects: EffectKind::ALL.map(Effect::new),
        }
    }

    pub fn effect(&self, kind: EffectKind) -> &Effect {
        &self.effects[kind.index()]
    }

    pub fn effect_mut(&mut self, kind: EffectKind) -> &mut Effect {
        &mut self.effects[kind.index()]
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_enabled(&self, kind: EffectKind) -> bool {
        self.enabled_mask & kind.bit() != 0
    }

    pub fn set_enabled(&mut self, kind: EffectKind, enabled: bool) {
        if enabled {
            self.enabled_mask |= kind.bit();
        } else {
            self.enabled_mask &= !kind.bit();
        }
    }

    pub fn enabled_raw(&self) -> u16 {
        self.enabled_mask
    }

    /// Replace the whole activation mask. Bits above the known kinds are kept
    /// as-is so a mask written by a newer build survives a load/save cycle.
    pub fn set_enabled_raw(&mut self, mask: u16) {
        self.enabled_mask = mask;
    }

    pub fn iter_enabled(&self) -> impl Iterator<Item = &Effect> + '_ {
        self.effects
            .iter()
            .filter(|effect| self.is_enabled(effect.kind))
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}
