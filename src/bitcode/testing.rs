// SPDX-License-Identifier: BSD-3-Clause
//! Writer for hand-built bitstreams in unit tests.

/// Abbreviation id width at the top level of a stream.
const TOP_LEVEL_ABBREV_WIDTH: u32 = 2;

/// The first id a block's own abbreviations get.
const FIRST_APPLICATION_ABBREV: u64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AbbrevOp {
    Literal(u64),
    Blob,
}

#[derive(Debug)]
struct OpenBlock {
    /// Byte offset of the length word.
    at: usize,
    abbrev_width: u32,
    next_abbrev: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    buf: Vec<u8>,
    bit: usize,
    blocks: Vec<OpenBlock>,
}

impl BitWriter {
    fn width(&self) -> u32 {
        self.blocks
            .last()
            .map_or(TOP_LEVEL_ABBREV_WIDTH, |b| b.abbrev_width)
    }

    pub(crate) fn emit(&mut self, value: u64, width: u32) {
        for i in 0..width {
            if self.bit / 8 >= self.buf.len() {
                self.buf.push(0);
            }
            if (value >> i) & 1 == 1 {
                self.buf[self.bit / 8] |= 1 << (self.bit % 8);
            }
            self.bit += 1;
        }
    }

    pub(crate) fn emit_vbr(&mut self, mut value: u64, width: u32) {
        let threshold = 1u64 << (width - 1);
        while value >= threshold {
            self.emit((value & (threshold - 1)) | threshold, width);
            value >>= width - 1;
        }
        self.emit(value, width);
    }

    pub(crate) fn align32(&mut self) {
        self.bit = (self.bit + 31) & !31;
        self.buf.resize(self.bit / 8, 0);
    }

    pub(crate) fn bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.emit(u64::from(*b), 8);
        }
    }

    pub(crate) fn magic(&mut self) {
        self.bytes(b"BC\xC0\xDE");
    }

    pub(crate) fn abbrev_id(&mut self, id: u64) {
        let width = self.width();
        self.emit(id, width);
    }

    pub(crate) fn enter_block(&mut self, id: u32, abbrev_width: u32) {
        self.abbrev_id(1);
        self.emit_vbr(u64::from(id), 8);
        self.emit_vbr(u64::from(abbrev_width), 4);
        self.align32();
        let at = self.bit / 8;
        self.emit(0, 32);
        self.blocks.push(OpenBlock {
            at,
            abbrev_width,
            next_abbrev: FIRST_APPLICATION_ABBREV,
        });
    }

    pub(crate) fn end_block(&mut self) {
        self.abbrev_id(0);
        self.align32();
        if let Some(OpenBlock { at, .. }) = self.blocks.pop() {
            let words = ((self.bit / 8 - (at + 4)) / 4) as u32;
            self.buf[at..at + 4].copy_from_slice(&words.to_le_bytes());
        }
    }

    pub(crate) fn unabbrev_record(&mut self, code: u32, ops: &[u64]) {
        self.abbrev_id(3);
        self.emit_vbr(u64::from(code), 6);
        self.emit_vbr(ops.len() as u64, 6);
        for op in ops {
            self.emit_vbr(*op, 6);
        }
    }

    /// Define an abbreviation in the current block and return its id.
    fn define_abbrev(&mut self, ops: &[AbbrevOp]) -> u64 {
        self.abbrev_id(2);
        self.emit_vbr(ops.len() as u64, 5);
        for op in ops {
            match op {
                AbbrevOp::Literal(v) => {
                    self.emit(1, 1);
                    self.emit_vbr(*v, 8);
                }
                AbbrevOp::Blob => {
                    self.emit(0, 1);
                    self.emit(5, 3);
                }
            }
        }
        let block = self
            .blocks
            .last_mut()
            .expect("abbreviations are defined inside a block");
        let id = block.next_abbrev;
        block.next_abbrev += 1;
        id
    }

    /// A record holding one blob, the way string tables are written.
    pub(crate) fn blob_record(&mut self, code: u32, blob: &[u8]) {
        let id = self.define_abbrev(&[AbbrevOp::Literal(u64::from(code)), AbbrevOp::Blob]);
        self.abbrev_id(id);
        self.emit_vbr(blob.len() as u64, 6);
        self.align32();
        self.bytes(blob);
        self.align32();
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.align32();
        self.buf
    }
}
