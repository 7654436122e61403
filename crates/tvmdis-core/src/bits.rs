//! Owned bit buffers.
//!
//! `BitString` stores bits MSB-first within bytes and keeps an exact bit
//! length, so windows taken at arbitrary offsets stay exact. The `Display`
//! form is the `x{…}` hex literal with a 4-bit completion tag: the bits
//! `01` print as `x{6_}` (append `1`, pad with `0` to a nibble boundary,
//! mark the padding with `_`).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use core::fmt;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Growable bit buffer with an exact bit length.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    data: Vec<u8>,
    len: usize,
}

impl BitString {
    /// Creates an empty bit string.
    pub fn new() -> Self {
        Self { data: Vec::new(), len: 0 }
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw byte image; bits past `len` are zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Appends a single bit.
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Builds a bit string from raw bytes and an explicit bit length.
    ///
    /// Returns `None` if `len` exceeds the provided bytes. Unused tail
    /// bits are normalized to zero so equality stays bit-exact.
    pub fn from_raw(data: Vec<u8>, len: usize) -> Option<Self> {
        if len > data.len() * 8 {
            return None;
        }
        let mut data = data;
        data.truncate(len.div_ceil(8));
        if len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last &= !(0xffu8 >> (len % 8));
            }
        }
        Some(Self { data, len })
    }

    /// Parses a `0`/`1` string, e.g. `"0110"`.
    pub fn from_binary(s: &str) -> Option<Self> {
        let mut out = Self::new();
        for c in s.chars() {
            match c {
                '0' => out.push(false),
                '1' => out.push(true),
                _ => return None,
            }
        }
        Some(out)
    }

    /// Reads the bit at `idx`, if in range.
    pub fn get(&self, idx: usize) -> Option<bool> {
        (idx < self.len).then(|| self.bit(idx))
    }

    /// Copies the window `[offset, offset + len)` into a fresh buffer.
    ///
    /// Returns `None` if the window runs past the end.
    pub fn subslice(&self, offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }
        let mut out = Self::new();
        for idx in offset..end {
            out.push(self.bit(idx));
        }
        Some(out)
    }

    /// Byte image padded with a completion tag.
    ///
    /// When the length is not byte-aligned, the bit just past the end is
    /// set and the remainder of the byte is zero. Used for the standard
    /// cell representation fed to the content hash.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.len % 8 != 0 {
            out[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        out
    }

    fn bit(&self, idx: usize) -> bool {
        self.data[idx / 8] & (0x80 >> (idx % 8)) != 0
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("x{")?;
        let tagged = self.len % 4 != 0;
        let total = if tagged { (self.len / 4 + 1) * 4 } else { self.len };
        let mut idx = 0;
        while idx < total {
            let mut nib = 0u8;
            for k in idx..idx + 4 {
                // completion tag: one `1` just past the end, zeros after
                let bit = if k < self.len { self.bit(k) } else { k == self.len };
                nib = (nib << 1) | u8::from(bit);
            }
            write!(f, "{}", HEX[nib as usize] as char)?;
            idx += 4;
        }
        if tagged {
            f.write_str("_")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({}, {} bits)", self, self.len)
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
