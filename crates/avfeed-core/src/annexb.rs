//! # Annex-B Reframing
//!
//! Capture sources deliver H.264 as a concatenation of length-prefixed
//! records (`[u32 BE length][NAL unit]`, AVCC style). Byte-stream decoders
//! expect every NAL unit behind a `00 00 00 01` start code instead.
//!
//! [`records`] walks the length-prefixed layout and yields the raw NAL
//! units; [`frames`] yields them already prefixed with the start code.
//! Both stop at the first framing violation: a truncated length field or a
//! declared length that runs past the end of the buffer. Nothing after the
//! violation is yielded, and a NAL unit is never yielded partially.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Annex-B start code placed in front of every NAL unit.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Size of the big-endian length field in front of each record.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Framing violation in a length-prefixed buffer.
///
/// `needed` is the number of bytes the record required at `offset`
/// (the length field itself, or the declared NAL length), `remaining` what
/// the buffer actually had left.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record at offset {offset} needs {needed} bytes, {remaining} remaining")]
pub struct FramingError {
    pub offset: usize,
    pub needed: usize,
    pub remaining: usize,
}

/// Iterator over the NAL units of a length-prefixed buffer.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

/// Iterates the raw NAL units of `buf` without copying.
pub fn records(buf: &[u8]) -> Records<'_> {
    Records {
        buf,
        offset: 0,
        failed: false,
    }
}

impl Records<'_> {
    fn fail(&mut self, needed: usize, remaining: usize) -> FramingError {
        self.failed = true;
        FramingError {
            offset: self.offset,
            needed,
            remaining,
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<&'a [u8], FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset == self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.offset..];
        if rest.len() < LENGTH_FIELD_LEN {
            return Some(Err(self.fail(LENGTH_FIELD_LEN, rest.len())));
        }

        let declared = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let body = &rest[LENGTH_FIELD_LEN..];
        if declared > body.len() {
            return Some(Err(self.fail(declared, body.len())));
        }

        self.offset += LENGTH_FIELD_LEN + declared;
        Some(Ok(&body[..declared]))
    }
}

impl std::iter::FusedIterator for Records<'_> {}

/// Iterator over Annex-B elementary frames of a length-prefixed buffer.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    records: Records<'a>,
}

/// Iterates `buf` as start-code-prefixed elementary frames.
pub fn frames(buf: &[u8]) -> Frames<'_> {
    Frames {
        records: records(buf),
    }
}

impl Iterator for Frames<'_> {
    type Item = Result<Bytes, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|r| r.map(with_start_code))
    }
}

impl std::iter::FusedIterator for Frames<'_> {}

/// Copies `nal` behind an Annex-B start code.
pub fn with_start_code(nal: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(START_CODE.len() + nal.len());
    out.put_slice(&START_CODE);
    out.put_slice(nal);
    out.freeze()
}

/// Returns the NAL unit of an elementary frame produced by [`with_start_code`].
pub fn strip_start_code(frame: &[u8]) -> Option<&[u8]> {
    frame.strip_prefix(&START_CODE[..])
}
