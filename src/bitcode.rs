// SPDX-License-Identifier: BSD-3-Clause
//! Splitting a bitcode file into the modules it contains.
//!
//! A bitcode file may hold several modules (e.g. the output of `llvm-cat -b`
//! or a split ThinLTO unit). `llvm-ir` only parses a single module per
//! buffer, so the top-level blocks are walked here and each module is cut
//! out into a standalone buffer with its identification block and the
//! string table it refers to.
//!
//! Only block headers are read here: each top-level block is skipped by
//! its length word. The contents of module blocks are read with
//! `llvm-bitcode` (see [`blocks`]).

use std::borrow::Cow;
use std::ops::Range;

use crate::diagnostic::Diagnostic;

use self::blocks::Block;

pub(crate) mod blocks;
mod error;
pub use error::*;
pub mod summary;
#[cfg(test)]
pub(crate) mod testing;

pub use summary::SummaryIndex;

const MAGIC: &[u8; 4] = b"BC\xC0\xDE";
const WRAPPER_MAGIC: u32 = 0x0B17_C0DE;
const WRAPPER_HEADER_LEN: usize = 20;

/// Abbreviation id width at the top level of a stream.
const TOP_LEVEL_ABBREV_WIDTH: u32 = 2;
const ENTER_SUBBLOCK: u32 = 1;
/// Widest abbreviation id a block may declare.
const MAX_ABBREV_WIDTH: u32 = 32;

pub(crate) const MODULE_BLOCK_ID: u32 = 8;
pub(crate) const IDENTIFICATION_BLOCK_ID: u32 = 13;
pub(crate) const GLOBALVAL_SUMMARY_BLOCK_ID: u32 = 20;
pub(crate) const STRTAB_BLOCK_ID: u32 = 23;
pub(crate) const FULL_LTO_GLOBALVAL_SUMMARY_BLOCK_ID: u32 = 24;
pub(crate) const SYMTAB_BLOCK_ID: u32 = 25;

/// `FS_FLAGS` bit recording `-fsplit-lto-unit`.
const SPLIT_LTO_UNIT_FLAG: u64 = 0x8;

/// What a module says about link-time optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LtoInfo {
    pub has_summary: bool,
    pub is_thin_lto: bool,
    pub enable_split_lto_unit: bool,
}

/// One module of a bitcode file, as byte ranges into the bitcode (with any
/// wrapper header already removed).
#[derive(Clone, Debug)]
pub struct BitcodeModule<'a> {
    index: usize,
    /// The whole input, wrapper header included.
    file: &'a [u8],
    bitcode: &'a [u8],
    only_module: bool,
    identification: Option<Range<usize>>,
    module: Range<usize>,
    strtab: Option<Range<usize>>,
    symtab: Option<Range<usize>>,
}

impl<'a> BitcodeModule<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// A buffer that LLVM can parse as a single-module bitcode file.
    pub fn bytes(&self) -> Cow<'a, [u8]> {
        if self.only_module {
            return Cow::Borrowed(self.file);
        }
        self.cut(&[
            self.identification.as_ref(),
            Some(&self.module),
            self.strtab.as_ref(),
            self.symtab.as_ref(),
        ])
    }

    fn cut(&self, ranges: &[Option<&Range<usize>>]) -> Cow<'a, [u8]> {
        let ranges = ranges.iter().flatten();
        let len = ranges.clone().map(|r| r.len()).sum::<usize>();
        let mut out = Vec::with_capacity(MAGIC.len() + len);
        out.extend_from_slice(MAGIC);
        for r in ranges {
            out.extend_from_slice(&self.bitcode[(*r).clone()]);
        }
        Cow::Owned(out)
    }

    /// The module block and its string table, decoded.
    fn analysis_blocks(&self) -> Result<(Block, Option<Block>), Error> {
        let buffer = self.cut(&[Some(&self.module), self.strtab.as_ref()]);
        let mut blocks = blocks::read(
            &buffer,
            &[
                MODULE_BLOCK_ID,
                GLOBALVAL_SUMMARY_BLOCK_ID,
                FULL_LTO_GLOBALVAL_SUMMARY_BLOCK_ID,
                STRTAB_BLOCK_ID,
            ],
        )?
        .into_iter();
        let module = blocks
            .next()
            .filter(|b| b.id == MODULE_BLOCK_ID)
            .ok_or(Error::NoModules)?;
        let strtab = blocks.find(|b| b.id == STRTAB_BLOCK_ID);
        Ok((module, strtab))
    }

    /// Look for a summary block in the module block.
    pub fn lto_info(&self) -> Result<LtoInfo, Error> {
        let (module, _) = self.analysis_blocks()?;
        Ok(read_lto_info(&module))
    }

    /// Decode the module's summary index, if it has one.
    pub fn summary(&self, module_path: &str) -> Result<Option<SummaryIndex>, Error> {
        let (module, strtab) = self.analysis_blocks()?;
        SummaryIndex::read(&module, strtab.as_ref(), module_path)
    }
}

fn read_lto_info(module: &Block) -> LtoInfo {
    let (summary, is_thin_lto) = match module.block(GLOBALVAL_SUMMARY_BLOCK_ID) {
        Some(b) => (b, true),
        None => match module.block(FULL_LTO_GLOBALVAL_SUMMARY_BLOCK_ID) {
            Some(b) => (b, false),
            None => return LtoInfo::default(),
        },
    };
    let flags = summary
        .records(summary::FS_FLAGS)
        .last()
        .and_then(|r| r.ops.first().copied());
    LtoInfo {
        has_summary: true,
        is_thin_lto,
        enable_split_lto_unit: flags.map_or(false, |f| f & SPLIT_LTO_UNIT_FLAG != 0),
    }
}

/// The modules found in one bitcode file.
#[derive(Debug)]
pub struct BitcodeFileContents<'a> {
    pub modules: Vec<BitcodeModule<'a>>,
    /// Non-fatal oddities found while walking the file.
    pub warnings: Vec<Diagnostic>,
}

fn read_u32_le(bytes: &[u8], at: usize) -> Option<u32> {
    let word = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

/// Strip a bitcode wrapper header (as produced for Darwin targets), if any.
fn unwrap_bitcode(bytes: &[u8]) -> Result<&[u8], Error> {
    if read_u32_le(bytes, 0) != Some(WRAPPER_MAGIC) {
        return Ok(bytes);
    }
    if bytes.len() < WRAPPER_HEADER_LEN {
        return Err(Error::InvalidWrapper);
    }
    let offset = read_u32_le(bytes, 8).ok_or(Error::InvalidWrapper)? as usize;
    let size = read_u32_le(bytes, 12).ok_or(Error::InvalidWrapper)? as usize;
    let end = offset.checked_add(size).ok_or(Error::InvalidWrapper)?;
    bytes.get(offset..end).ok_or(Error::InvalidWrapper)
}

/// Bits of one header word, read least significant first.
struct HeaderBits {
    word: u32,
    at: u32,
}

impl HeaderBits {
    fn read(&mut self, width: u32) -> Result<u32, Error> {
        if self.at + width > 32 {
            return Err(Error::InvalidBlockHeader);
        }
        let value = (self.word >> self.at) & ((1u32 << width) - 1);
        self.at += width;
        Ok(value)
    }

    fn read_vbr(&mut self, width: u32) -> Result<u32, Error> {
        let continuation = 1 << (width - 1);
        let mut value = 0u32;
        let mut shift = 0;
        loop {
            let chunk = self.read(width)?;
            value |= (chunk & (continuation - 1)) << shift;
            if chunk & continuation == 0 {
                return Ok(value);
            }
            shift += width - 1;
        }
    }
}

/// Read the `ENTER_SUBBLOCK` at byte `pos`: the block id and the bytes the
/// whole block spans, header and length word included.
fn top_level_block(bitcode: &[u8], pos: usize) -> Result<(u32, Range<usize>), Error> {
    let word = read_u32_le(bitcode, pos).ok_or(Error::TruncatedBlock)?;
    let mut bits = HeaderBits { word, at: 0 };
    let abbrev = bits.read(TOP_LEVEL_ABBREV_WIDTH)?;
    if abbrev != ENTER_SUBBLOCK {
        // Only blocks live at the top level.
        return Err(Error::TopLevelRecord(abbrev.into()));
    }
    let id = bits.read_vbr(8)?;
    let width = bits.read_vbr(4)?;
    if width == 0 || width > MAX_ABBREV_WIDTH {
        return Err(Error::AbbrevWidth(width));
    }
    let words = read_u32_le(bitcode, pos + 4).ok_or(Error::TruncatedBlock)?;
    let end = (words as usize)
        .checked_mul(4)
        .and_then(|len| len.checked_add(pos + 8))
        .ok_or(Error::TruncatedBlock)?;
    if end > bitcode.len() {
        return Err(Error::TruncatedBlock);
    }
    Ok((id, pos..end))
}

/// Walk the top-level blocks of a bitcode file and collect its modules.
pub fn get_bitcode_file_contents(file: &[u8]) -> Result<BitcodeFileContents<'_>, Error> {
    let bitcode = unwrap_bitcode(file)?;
    if bitcode.len() < MAGIC.len() || &bitcode[..MAGIC.len()] != MAGIC {
        return Err(Error::InvalidSignature);
    }

    let mut modules: Vec<BitcodeModule<'_>> = Vec::new();
    let mut warnings = Vec::new();
    let mut identification = None;
    let mut pos = MAGIC.len();
    // Fewer than a block header's worth of bytes left is trailing padding.
    while pos + 8 < bitcode.len() {
        let (id, range) = top_level_block(bitcode, pos)?;
        tracing::trace!(id, start = range.start, end = range.end, "top-level block");
        pos = range.end;
        match id {
            IDENTIFICATION_BLOCK_ID => identification = Some(range),
            MODULE_BLOCK_ID => modules.push(BitcodeModule {
                index: modules.len(),
                file,
                bitcode,
                only_module: false,
                identification: identification.take(),
                module: range,
                strtab: None,
                symtab: None,
            }),
            STRTAB_BLOCK_ID => {
                for m in modules.iter_mut().filter(|m| m.strtab.is_none()) {
                    m.strtab = Some(range.clone());
                }
            }
            SYMTAB_BLOCK_ID => {
                for m in modules.iter_mut().filter(|m| m.symtab.is_none()) {
                    m.symtab = Some(range.clone());
                }
            }
            id => warnings.push(Diagnostic::warning(format!(
                "ignoring unknown top-level block id {id}"
            ))),
        }
    }

    if modules.is_empty() {
        return Err(Error::NoModules);
    }
    if modules.len() == 1 {
        modules[0].only_module = true;
    }
    Ok(BitcodeFileContents { modules, warnings })
}
