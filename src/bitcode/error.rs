// SPDX-License-Identifier: BSD-3-Clause
#[derive(Clone, Debug, Hash, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid bitcode wrapper header")]
    InvalidWrapper,
    #[error("invalid bitcode signature")]
    InvalidSignature,
    #[error("invalid record at top level (abbreviation id {0})")]
    TopLevelRecord(u64),
    #[error("invalid block header")]
    InvalidBlockHeader,
    #[error("invalid abbreviation width {0}")]
    AbbrevWidth(u32),
    #[error("block extends past end of bitstream")]
    TruncatedBlock,
    #[error("file contains no modules")]
    NoModules,
    #[error("malformed bitstream: {0}")]
    Bitstream(String),
    #[error("malformed summary record {code}: {reason}")]
    MalformedSummary { code: u32, reason: &'static str },
}

impl From<llvm_bitcode::read::Error> for Error {
    fn from(e: llvm_bitcode::read::Error) -> Self {
        Error::Bitstream(e.to_string())
    }
}
