use crate::{HEADER, TAIL};
use drum_program::{EffectChain, EffectKind, Program};

/// Wire size of one pad record: assignment, variant, volume, variation.
pub(crate) const PAD_RECORD_LEN: usize = 4 + 1 + 4 + 2;

// Everything except the pad records.
const FIXED_LEN: usize = (2 + HEADER.len())
    + (4 + 2 + 1 + 1)
    + 3 * 4
    + (2 + 2)
    + 2 * 4
    + 4 * 4
    + (2 + TAIL.len());

/// Exact size of an envelope for a program with `pad_count` pads.
pub fn encoded_len(pad_count: usize) -> usize {
    FIXED_LEN + pad_count * PAD_RECORD_LEN
}

/// Big-endian writer over a growable buffer.
struct EnvelopeWriter {
    buf: Vec<u8>,
}

impl EnvelopeWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Length-prefixed string fence.
    fn write_fence(&mut self, text: &str) {
        debug_assert!(text.len() <= u16::MAX as usize);
        self.write_u16(text.len() as u16);
        self.buf.extend_from_slice(text.as_bytes());
    }

    fn write_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Serialize the persisted part of a program and its effect chain.
pub fn encode(program: &Program, effects: &EffectChain) -> Vec<u8> {
    let mut w = EnvelopeWriter::with_capacity(encoded_len(program.pad_count()));

    w.write_fence(HEADER);

    w.write_i32(program.raw_banks());
    w.write_i16(program.tempo());
    w.write_i8(program.tempo_multiplier());
    w.write_i8(program.active_voice());
    for _ in 0..3 {
        w.write_i32(0); // pad
    }

    for pad in program.pads() {
        w.write_i32(pad.raw_assignment);
        w.write_i8(pad.sample_variant);
        w.write_f32(pad.volume);
        w.write_i16(pad.volume_variation);
    }

    w.write_u16(effects.enabled_raw());
    w.write_u16(0); // reserved

    let comp = effects.effect(EffectKind::Compressor);
    w.write_f32(comp.config(0).unwrap_or_default());
    w.write_f32(comp.config(1).unwrap_or_default());

    for _ in 0..4 {
        w.write_f32(0.0); // reserved
    }

    w.write_fence(TAIL);

    w.finish()
}
