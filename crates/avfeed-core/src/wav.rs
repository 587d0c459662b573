//! # WAV Header Synthesis
//!
//! The audio branch of the downstream pipeline parses a RIFF/WAVE stream, so
//! the first buffer of every session is a canonical 44-byte PCM header.
//! The PCM length is not known up front; the data chunk claims
//! `header_duration_secs` worth of audio and the parser is expected to
//! ignore the declared length.
//!
//! ```text
//!  0  "RIFF"           4  riff size (36 + data)   8  "WAVE"
//! 12  "fmt "          16  16 (fmt chunk size)     20  1 (PCM)
//! 22  channels        24  sample rate             28  byte rate
//! 32  block align     34  bits per sample
//! 36  "data"          40  data size
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::AudioFormat;

pub const WAV_HEADER_LEN: usize = 44;

const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Builds the placeholder WAV header for `format`.
pub fn header(format: &AudioFormat) -> Bytes {
    let block_align = format.block_align();
    let byte_rate = format.byte_rate();
    let data_len = format
        .placeholder_data_len()
        .unwrap_or(u32::MAX - (WAV_HEADER_LEN as u32 - 8));

    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN);
    buf.put_slice(b"RIFF");
    buf.put_u32_le(data_len + (WAV_HEADER_LEN as u32 - 8));
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_LEN);
    buf.put_u16_le(FORMAT_PCM);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(format.bits_per_sample);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);

    buf.freeze()
}
