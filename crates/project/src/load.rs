use crate::save::PAD_RECORD_LEN;
use crate::{CorruptionError, HEADER, Snapshot, TAIL};
use drum_program::PadSlot;

/// Big-endian cursor over an envelope.
struct EnvelopeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> EnvelopeReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CorruptionError> {
        let bytes = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_slice(&mut self, n: usize) -> Result<&'a [u8], CorruptionError> {
        let remaining = self.data.len() - self.pos;
        if n > remaining {
            return Err(CorruptionError::Truncated {
                needed: n - remaining,
                offset: self.pos,
            });
        }
        let data = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<(), CorruptionError> {
        self.take_slice(n).map(|_| ())
    }

    fn read_i8(&mut self) -> Result<i8, CorruptionError> {
        self.take().map(i8::from_be_bytes)
    }

    fn read_i16(&mut self) -> Result<i16, CorruptionError> {
        self.take().map(i16::from_be_bytes)
    }

    fn read_u16(&mut self) -> Result<u16, CorruptionError> {
        self.take().map(u16::from_be_bytes)
    }

    fn read_i32(&mut self) -> Result<i32, CorruptionError> {
        self.take().map(i32::from_be_bytes)
    }

    fn read_f32(&mut self) -> Result<f32, CorruptionError> {
        self.take().map(f32::from_be_bytes)
    }

    /// Read a length-prefixed fence and compare it with `expected`.
    ///
    /// A length that differs from the literal is rejected before the text is
    /// read, so a damaged prefix reports a mismatch rather than truncation.
    fn expect_fence(
        &mut self,
        expected: &str,
        mismatch: fn(String) -> CorruptionError,
    ) -> Result<(), CorruptionError> {
        let len = self.read_u16()? as usize;
        if len != expected.len() {
            return Err(mismatch(format!("<{len}-byte string>")));
        }
        let text = self.take_slice(len)?;
        if text != expected.as_bytes() {
            return Err(mismatch(String::from_utf8_lossy(text).into_owned()));
        }
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Decode an envelope written for a program with `pad_count` pads.
///
/// Reserved words are skipped without being checked. The result is detached
/// from live state; see [`Snapshot::apply`].
pub fn decode(bytes: &[u8], pad_count: usize) -> Result<Snapshot, CorruptionError> {
    let mut r = EnvelopeReader::new(bytes);

    r.expect_fence(HEADER, |found| CorruptionError::HeaderMismatch { found })?;

    let banks = r.read_i32()?;
    let tempo = r.read_i16()?;
    let tempo_multiplier = r.read_i8()?;
    let active_voice = r.read_i8()?;
    r.skip(3 * 4)?; // pad

    // the pad count comes from the caller, so never reserve more than the bytes can hold
    let mut pads = Vec::with_capacity(pad_count.min(r.remaining() / PAD_RECORD_LEN));
    for _ in 0..pad_count {
        pads.push(PadSlot {
            raw_assignment: r.read_i32()?,
            sample_variant: r.read_i8()?,
            volume: r.read_f32()?,
            volume_variation: r.read_i16()?,
        });
    }

    let enabled_mask = r.read_u16()?;
    r.skip(2)?; // reserved

    let compressor = [r.read_f32()?, r.read_f32()?];
    r.skip(4 * 4)?; // reserved

    r.expect_fence(TAIL, |found| CorruptionError::TailMismatch { found })?;

    if r.remaining() > 0 {
        return Err(CorruptionError::TrailingBytes {
            count: r.remaining(),
        });
    }

    Ok(Snapshot {
        banks,
        tempo,
        tempo_multiplier,
        active_voice,
        pads,
        enabled_mask,
        compressor,
    })
}
