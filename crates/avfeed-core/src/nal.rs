//! # H.264 NAL Header Classification
//!
//! Reads the one-byte H.264 NAL header (`forbidden(1) | nal_ref_idc(2) |
//! nal_type(5)`) of reframed units so delivered buffers can be tagged as
//! parameter sets, keyframes, or delta frames without the engine re-parsing
//! the stream.

/// Classification result of a NAL unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalClass {
    /// SPS, PPS, SPS extension.
    ParameterSet,
    /// IDR slice.
    Keyframe,
    /// Non-IDR slice or data partition referenced by other frames.
    Reference,
    /// Non-reference slice, SEI, access unit delimiter.
    NonReference,
    Unknown,
}

/// Parsed NAL header info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalInfo {
    pub nal_type: u8,
    pub nal_ref_idc: u8,
    pub class: NalClass,
}

/// Parses the header of a NAL unit (no start code).
///
/// Returns `None` for an empty unit.
pub fn parse_h264_nal(nal: &[u8]) -> Option<NalInfo> {
    let header = *nal.first()?;
    let nal_type = header & 0x1F;
    let nal_ref_idc = (header >> 5) & 0x03;

    let class = match nal_type {
        7 | 8 | 13 => NalClass::ParameterSet,
        5 => NalClass::Keyframe,
        1 if nal_ref_idc > 0 => NalClass::Reference,
        1 => NalClass::NonReference,
        2..=4 => NalClass::Reference,
        6 | 9 => NalClass::NonReference,
        _ => NalClass::Unknown,
    };

    Some(NalInfo {
        nal_type,
        nal_ref_idc,
        class,
    })
}

/// Short name of an H.264 NAL unit type, for logs.
pub fn nal_type_name(nal_type: u8) -> &'static str {
    match nal_type {
        1 => "slice",
        2..=4 => "partition",
        5 => "idr",
        6 => "sei",
        7 => "sps",
        8 => "pps",
        9 => "aud",
        10 => "end-of-seq",
        11 => "end-of-stream",
        12 => "filler",
        13 => "sps-ext",
        _ => "other",
    }
}
