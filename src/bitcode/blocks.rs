// SPDX-License-Identifier: BSD-3-Clause
//! Owned copies of the blocks the summary and LTO readers look at.
//!
//! `llvm-bitcode` hands out records as borrowing iterators; the readers
//! here want to look at a module's records after seeing its sub-blocks,
//! so wanted blocks are drained into plain vectors up front.

use llvm_bitcode::bitcode::{Payload, Signature};
use llvm_bitcode::read::{BlockItem, BlockIter};
use llvm_bitcode::BitStreamReader;

use super::error::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Record {
    pub code: u32,
    /// Scalar operands followed by any array operand.
    pub ops: Vec<u64>,
    pub blob: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Block {
    pub id: u32,
    pub records: Vec<Record>,
    pub blocks: Vec<Block>,
}

impl Block {
    pub fn block(&self, id: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn records(&self, code: u32) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.code == code)
    }
}

/// Read the top-level blocks of `file` whose id is in `wanted`, with their
/// wanted sub-blocks. Everything else is read past.
pub(crate) fn read(file: &[u8], wanted: &[u32]) -> Result<Vec<Block>, Error> {
    let (_, bitcode) = Signature::parse(file).ok_or(Error::InvalidSignature)?;
    let mut reader = BitStreamReader::new();
    let mut top = reader.iter_bitcode(bitcode);
    let mut blocks = Vec::new();
    while let Some(item) = top.next()? {
        if let BlockItem::Block(b) = item {
            if let Some(block) = drain(b, wanted)? {
                blocks.push(block);
            }
        }
    }
    Ok(blocks)
}

fn drain(mut iter: BlockIter, wanted: &[u32]) -> Result<Option<Block>, Error> {
    let keep = wanted.contains(&(iter.id as u32));
    let mut block = Block {
        id: iter.id as u32,
        ..Block::default()
    };
    while let Some(item) = iter.next()? {
        match item {
            BlockItem::Block(b) => {
                if let Some(sub) = drain(b, wanted)? {
                    block.blocks.push(sub);
                }
            }
            BlockItem::Record(mut r) => {
                let code = r.id as u32;
                let mut ops = r
                    .by_ref()
                    .map(|f| f.map(|f| f as u64))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut blob = None;
                match r.payload()? {
                    Some(Payload::Array(a)) => ops.extend(a.iter().map(|&c| c as u64)),
                    Some(Payload::Char6String(s)) => ops.extend(s.bytes().map(u64::from)),
                    Some(Payload::Blob(b)) => blob = Some(b.to_vec()),
                    None => (),
                }
                if keep {
                    block.records.push(Record { code, ops, blob });
                }
            }
        }
    }
    Ok(keep.then_some(block))
}
