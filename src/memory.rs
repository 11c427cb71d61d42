//! Flat byte-addressed memory
//!
//! A single contiguous array of bytes, indexed by a 32-bit address,
//! with little-endian multi-byte accesses that may straddle any
//! boundary. There is no notion of alignment, protection, or device
//! memory: the whole address space is plain RAM.

use std::path::Path;

use thiserror::Error;

/// Byte used to fill freshly allocated memory. Chosen to be visibly
/// non-zero in a hex dump, so uninitialised reads stand out from
/// reads of data the program actually wrote.
const FILL_BYTE: u8 = 0xA5;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not open image {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("program too big: image is {image_len} bytes, memory is {mem_len} bytes")]
    TooBig { image_len: usize, mem_len: usize },
}

fn round_up_to_16(size: usize) -> usize {
    (size + 15) & !15
}

#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Allocate `round_up(size, 16)` bytes, filled with `FILL_BYTE`.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![FILL_BYTE; round_up_to_16(size)],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn in_range(&self, addr: u32) -> bool {
        (addr as usize) < self.data.len()
    }

    pub fn load8(&self, addr: u32) -> u8 {
        if !self.in_range(addr) {
            log::warn!("load8 out of range at 0x{addr:08x}");
            return 0;
        }
        self.data[addr as usize]
    }

    /// Each byte is range-checked independently, so a halfword that
    /// straddles the end of memory reads its in-range byte normally
    /// and only the out-of-range byte as zero.
    pub fn load16(&self, addr: u32) -> u16 {
        u16::from_le_bytes([self.load8(addr), self.load8(addr + 1)])
    }

    /// Each byte is range-checked independently, so a word that
    /// straddles the end of memory reads its in-range bytes normally
    /// and only the out-of-range bytes as zero.
    pub fn load32(&self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.load8(addr),
            self.load8(addr + 1),
            self.load8(addr + 2),
            self.load8(addr + 3),
        ])
    }

    pub fn load8_sx(&self, addr: u32) -> i32 {
        (self.load8(addr) as i8) as i32
    }

    pub fn load16_sx(&self, addr: u32) -> i32 {
        (self.load16(addr) as i16) as i32
    }

    pub fn store8(&mut self, addr: u32, value: u8) {
        if !self.in_range(addr) {
            log::warn!("store8 out of range at 0x{addr:08x}");
            return;
        }
        self.data[addr as usize] = value;
    }

    /// Each byte is range-checked and written independently, so a
    /// halfword that straddles the end of memory writes its in-range
    /// byte normally and drops only the out-of-range one.
    pub fn store16(&mut self, addr: u32, value: u16) {
        let bytes = value.to_le_bytes();
        self.store8(addr, bytes[0]);
        self.store8(addr + 1, bytes[1]);
    }

    /// Each byte is range-checked and written independently, so a word
    /// that straddles the end of memory writes its in-range bytes
    /// normally and drops only the out-of-range ones.
    pub fn store32(&mut self, addr: u32, value: u32) {
        let bytes = value.to_le_bytes();
        self.store8(addr, bytes[0]);
        self.store8(addr + 1, bytes[1]);
        self.store8(addr + 2, bytes[2]);
        self.store8(addr + 3, bytes[3]);
    }

    /// Byte-for-byte copy of `path` into memory starting at address
    /// 0. If the file is larger than this memory, loading stops at
    /// the overflow and an error is returned (the part of the image
    /// that did fit has already been written).
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ImageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        if bytes.len() > self.data.len() {
            log::warn!(
                "image is {} bytes but memory is only {} bytes",
                bytes.len(),
                self.data.len()
            );
            self.data[..].copy_from_slice(&bytes[..self.data.len()]);
            return Err(ImageError::TooBig {
                image_len: bytes.len(),
                mem_len: self.data.len(),
            });
        }
        self.data[..bytes.len()].copy_from_slice(&bytes);
        log::info!("loaded {} byte image from {}", bytes.len(), path.display());
        Ok(())
    }

    /// Canonical 16-byte-per-row hex + ASCII dump of the whole
    /// address space.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.data.chunks(16).enumerate() {
            out.push_str(&format!("{:08x}: ", row * 16));
            for (i, b) in chunk.iter().enumerate() {
                out.push_str(&format!("{b:02x} "));
                if i == 7 {
                    out.push(' ');
                }
            }
            out.push('*');
            for b in chunk {
                let ch = *b as char;
                if ch.is_ascii_graphic() || ch == ' ' {
                    out.push(ch);
                } else {
                    out.push('.');
                }
            }
            out.push_str("*\n");
        }
        out
    }
}
