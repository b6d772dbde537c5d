//! Copying encoder output out of native buffers.

use bytes::{BufMut, Bytes, BytesMut};

/// One NAL unit as reported by the encoder, start code included.
///
/// Borrows encoder-owned memory that is reused by the next encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nal<'a> {
    pub payload: &'a [u8],
}

impl<'a> Nal<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn unit_type(&self) -> Option<u8> {
        nal_unit_type(self.payload)
    }
}

/// How encoded NAL units are handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Packaging {
    /// One buffer per NAL unit.
    PerNalBuffers,
    /// All NAL units of the frame back to back, in encoder order.
    #[default]
    SingleConcatenatedBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedOutput {
    PerNal(Vec<Bytes>),
    Concatenated(Bytes),
}

impl EncodedOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::PerNal(units) => units.iter().all(|unit| unit.is_empty()),
            Self::Concatenated(buffer) => buffer.is_empty(),
        }
    }

    /// Total payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::PerNal(units) => units.iter().map(Bytes::len).sum(),
            Self::Concatenated(buffer) => buffer.len(),
        }
    }

    pub fn into_units(self) -> Vec<Bytes> {
        match self {
            Self::PerNal(units) => units,
            Self::Concatenated(buffer) if buffer.is_empty() => Vec::new(),
            Self::Concatenated(buffer) => vec![buffer],
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::PerNal(units) => concatenate(units.iter().map(|unit| unit.as_ref())),
            Self::Concatenated(buffer) => buffer,
        }
    }
}

/// Copies `nals` into caller-owned buffers.
pub fn package(nals: &[Nal<'_>], packaging: Packaging) -> EncodedOutput {
    match packaging {
        Packaging::PerNalBuffers => EncodedOutput::PerNal(
            nals.iter()
                .map(|nal| Bytes::copy_from_slice(nal.payload))
                .collect(),
        ),
        Packaging::SingleConcatenatedBuffer => {
            EncodedOutput::Concatenated(concatenate(nals.iter().map(|nal| nal.payload)))
        }
    }
}

fn concatenate<'a>(payloads: impl Iterator<Item = &'a [u8]> + Clone) -> Bytes {
    let total_size = payloads.clone().map(<[u8]>::len).sum();
    let mut buffer = BytesMut::with_capacity(total_size);
    for payload in payloads {
        buffer.put_slice(payload);
    }
    buffer.freeze()
}

/// Finds the next Annex-B start code, returning its offset and length (3 or 4).
pub fn find_start_code(data: &[u8]) -> Option<(usize, usize)> {
    let len = data.len();
    if len < 3 {
        return None;
    }

    for i in 0..len - 2 {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                return Some((i, 3));
            } else if i + 3 < len && data[i + 2] == 0 && data[i + 3] == 1 {
                return Some((i, 4));
            }
        }
    }

    None
}

/// Splits an Annex-B access unit into its NAL units.
///
/// Each unit keeps its leading start code, so the units concatenate back to
/// `data` byte for byte. Bytes before the first start code form their own unit.
pub fn split_annexb(data: &[u8]) -> Vec<Nal<'_>> {
    let mut nals = Vec::new();
    let mut start = 0;

    while start < data.len() {
        // Skip past the start code that opens the current unit.
        let body = match find_start_code(&data[start..]) {
            Some((0, code_len)) => start + code_len,
            _ => start,
        };

        let end = match find_start_code(&data[body..]) {
            Some((offset, _)) => body + offset,
            None => data.len(),
        };

        nals.push(Nal::new(&data[start..end]));
        start = end;
    }

    nals
}

/// `nal_unit_type` of an Annex-B payload.
pub fn nal_unit_type(payload: &[u8]) -> Option<u8> {
    match find_start_code(payload) {
        Some((0, code_len)) => payload.get(code_len).map(|header| header & 0x1F),
        _ => None,
    }
}

pub mod unit_type {
    pub const SLICE: u8 = 1;
    pub const IDR: u8 = 5;
    pub const SEI: u8 = 6;
    pub const SPS: u8 = 7;
    pub const PPS: u8 = 8;
}
