//! Fixed, versioned, little-endian wire layout for patch transfers.
//!
//! One message carries one work item: a 16-byte [`WireHdr`] followed by
//! `n_values` little-endian `f64` (component-major, axis 0 fastest).

use crate::patch_error::PatchSieveError;
use crate::Real;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Message kind for a packed patch region.
pub const KIND_PATCH_REGION: u16 = 1;

/// All multi-byte integers are stored pre-LE with `.to_le()` and decoded with `from_le`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub n_values_le: u32,
    pub src_index_le: u32,
    pub dst_index_le: u32,
}

const_assert_eq!(size_of::<WireHdr>(), 16);

impl WireHdr {
    /// Header for one item; counts and indices must fit the 32-bit wire fields.
    pub fn new(n_values: usize, src_index: usize, dst_index: usize) -> Result<Self, PatchSieveError> {
        let field = |what: &str, v: usize| {
            u32::try_from(v).map_err(|_| {
                PatchSieveError::Configuration(format!("{what} {v} does not fit the wire header"))
            })
        };
        Ok(Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: KIND_PATCH_REGION.to_le(),
            n_values_le: field("value count", n_values)?.to_le(),
            src_index_le: field("source index", src_index)?.to_le(),
            dst_index_le: field("destination index", dst_index)?.to_le(),
        })
    }

    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn n_values(&self) -> usize {
        u32::from_le(self.n_values_le) as usize
    }
    pub fn src_index(&self) -> usize {
        u32::from_le(self.src_index_le) as usize
    }
    pub fn dst_index(&self) -> usize {
        u32::from_le(self.dst_index_le) as usize
    }
}

/// Total message length for `n_values` reals.
pub const fn message_len(n_values: usize) -> usize {
    size_of::<WireHdr>() + n_values * size_of::<u64>()
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Header plus values, ready for `isend`.
pub fn encode_values(hdr: WireHdr, values: &[Real]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message_len(values.len()));
    out.extend_from_slice(bytemuck::bytes_of(&hdr));
    for v in values {
        out.extend_from_slice(&v.to_bits().to_le_bytes());
    }
    out
}

/// Decode a message, checking it against the header the receiver expects.
pub fn decode_values(bytes: &[u8], expected: &WireHdr) -> Result<Vec<Real>, String> {
    let n = expected.n_values();
    expect_exact_len(bytes.len(), message_len(n))?;
    let (head, body) = bytes.split_at(size_of::<WireHdr>());
    let hdr: WireHdr = bytemuck::pod_read_unaligned(head);
    if hdr.version() != WIRE_VERSION || hdr.kind() != KIND_PATCH_REGION {
        return Err(format!(
            "unexpected wire version/kind {}/{}",
            hdr.version(),
            hdr.kind()
        ));
    }
    if (hdr.n_values(), hdr.src_index(), hdr.dst_index())
        != (n, expected.src_index(), expected.dst_index())
    {
        return Err(format!(
            "header ({}, {}→{}) does not match plan ({}, {}→{})",
            hdr.n_values(),
            hdr.src_index(),
            hdr.dst_index(),
            n,
            expected.src_index(),
            expected.dst_index()
        ));
    }
    Ok(body
        .chunks_exact(size_of::<u64>())
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            Real::from_bits(u64::from_le_bytes(raw))
        })
        .collect())
}
