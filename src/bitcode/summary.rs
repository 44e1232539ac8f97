// SPDX-License-Identifier: BSD-3-Clause
//! The per-module ThinLTO summary index, printed the way `llvm-dis` prints
//! summaries.
//!
//! Summary records refer to values by module-local value id. Names come
//! from the module's global value records, whose order assigns those ids,
//! and the string table they point into. Slots are numbered in record
//! order (summaries first, then values only referenced), not by GUID, and
//! GUIDs are not printed.

use std::fmt::{self, Display};

use rustc_hash::FxHashMap;

use super::blocks::{Block, Record};
use super::error::Error;
use super::{FULL_LTO_GLOBALVAL_SUMMARY_BLOCK_ID, GLOBALVAL_SUMMARY_BLOCK_ID};

pub(crate) const FS_PERMODULE: u32 = 1;
pub(crate) const FS_PERMODULE_PROFILE: u32 = 2;
pub(crate) const FS_PERMODULE_GLOBALVAR_INIT_REFS: u32 = 3;
pub(crate) const FS_ALIAS: u32 = 7;
pub(crate) const FS_VERSION: u32 = 10;
pub(crate) const FS_PERMODULE_RELBF: u32 = 19;
pub(crate) const FS_FLAGS: u32 = 20;
pub(crate) const FS_BLOCK_COUNT: u32 = 24;

pub(crate) const MODULE_CODE_VERSION: u32 = 1;
pub(crate) const MODULE_CODE_GLOBALVAR: u32 = 7;
pub(crate) const MODULE_CODE_FUNCTION: u32 = 8;
pub(crate) const MODULE_CODE_ALIAS: u32 = 14;
pub(crate) const MODULE_CODE_IFUNC: u32 = 15;
pub(crate) const MODULE_CODE_HASH: u32 = 17;

pub(crate) const STRTAB_BLOB: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryKind {
    ThinLto,
    FullLto,
}

/// Raw global value summary flags, with the summary version that decides
/// how old summaries read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalValueFlags {
    pub raw: u64,
    pub version: u64,
}

impl GlobalValueFlags {
    pub fn linkage(&self) -> &'static str {
        match self.raw & 0xf {
            0 => "external",
            1 => "available_externally",
            2 => "linkonce",
            3 => "linkonce_odr",
            4 => "weak",
            5 => "weak_odr",
            6 => "appending",
            7 => "internal",
            8 => "private",
            9 => "extern_weak",
            10 => "common",
            _ => "external",
        }
    }

    pub fn visibility(&self) -> &'static str {
        match (self.raw >> 8) & 3 {
            1 => "hidden",
            2 => "protected",
            _ => "default",
        }
    }

    fn bit(&self, n: u32) -> bool {
        (self.raw >> 4) & (1 << n) != 0
    }

    pub fn not_eligible_to_import(&self) -> bool {
        self.bit(0) || self.version < 3
    }

    pub fn live(&self) -> bool {
        self.bit(1) || self.version < 3
    }

    pub fn dso_local(&self) -> bool {
        self.bit(2)
    }

    pub fn can_auto_hide(&self) -> bool {
        self.bit(3)
    }
}

impl Display for GlobalValueFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(linkage: {}, visibility: {}, notEligibleToImport: {}, live: {}, dsoLocal: {}, canAutoHide: {})",
            self.linkage(),
            self.visibility(),
            u8::from(self.not_eligible_to_import()),
            u8::from(self.live()),
            u8::from(self.dso_local()),
            u8::from(self.can_auto_hide()),
        )
    }
}

const FUNC_FLAG_NAMES: [&str; 10] = [
    "readNone",
    "readOnly",
    "noRecurse",
    "returnDoesNotAlias",
    "noInline",
    "alwaysInline",
    "noUnwind",
    "mayThrow",
    "hasUnknownCall",
    "mustBeUnreachable",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefAccess {
    #[default]
    Any,
    ReadOnly,
    WriteOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ref {
    pub value_id: u64,
    pub access: RefAccess,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallInfo {
    #[default]
    None,
    Hotness(u64),
    RelBlockFreq(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call {
    pub callee: u64,
    pub info: CallInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSummary {
    pub value_id: u64,
    pub flags: GlobalValueFlags,
    pub insts: u64,
    pub func_flags: u64,
    pub refs: Vec<Ref>,
    pub calls: Vec<Call>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSummary {
    pub value_id: u64,
    pub flags: GlobalValueFlags,
    pub var_flags: Option<u64>,
    pub refs: Vec<Ref>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasSummary {
    pub value_id: u64,
    pub flags: GlobalValueFlags,
    pub aliasee: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryEntry {
    Function(FunctionSummary),
    Variable(VariableSummary),
    Alias(AliasSummary),
}

impl SummaryEntry {
    pub fn value_id(&self) -> u64 {
        match self {
            SummaryEntry::Function(s) => s.value_id,
            SummaryEntry::Variable(s) => s.value_id,
            SummaryEntry::Alias(s) => s.value_id,
        }
    }

    /// Every value the summary points at, in printing order.
    fn referenced(&self) -> Vec<u64> {
        match self {
            SummaryEntry::Function(s) => s
                .calls
                .iter()
                .map(|c| c.callee)
                .chain(s.refs.iter().map(|r| r.value_id))
                .collect(),
            SummaryEntry::Variable(s) => s.refs.iter().map(|r| r.value_id).collect(),
            SummaryEntry::Alias(s) => vec![s.aliasee],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryIndex {
    pub kind: SummaryKind,
    pub module_path: String,
    pub module_hash: [u64; 5],
    pub version: Option<u64>,
    pub flags: Option<u64>,
    pub block_count: Option<u64>,
    /// Global value names, indexed by value id.
    pub names: Vec<Option<String>>,
    pub entries: Vec<SummaryEntry>,
    /// Records this reader does not interpret, as `(code, operands)`.
    pub other: Vec<(u32, Vec<u64>)>,
}

fn malformed(code: u32, reason: &'static str) -> Error {
    Error::MalformedSummary { code, reason }
}

/// Pop operands off the front of a record.
struct Ops<'r> {
    code: u32,
    ops: &'r [u64],
}

impl<'r> Ops<'r> {
    fn next(&mut self) -> Result<u64, Error> {
        let (first, rest) = self
            .ops
            .split_first()
            .ok_or_else(|| malformed(self.code, "too few operands"))?;
        self.ops = rest;
        Ok(*first)
    }

    fn take(&mut self, n: u64) -> Result<&'r [u64], Error> {
        let n = usize::try_from(n).map_err(|_| malformed(self.code, "bad count"))?;
        if n > self.ops.len() {
            return Err(malformed(self.code, "count exceeds operands"));
        }
        let (head, rest) = self.ops.split_at(n);
        self.ops = rest;
        Ok(head)
    }
}

/// Mark the trailing `read_only + write_only` references of a list; the
/// write-only ones come last.
fn ref_list(
    code: u32,
    ids: &[u64],
    read_only: u64,
    write_only: u64,
) -> Result<Vec<Ref>, Error> {
    let len = ids.len() as u64;
    let tagged = read_only
        .checked_add(write_only)
        .filter(|n| *n <= len)
        .ok_or_else(|| malformed(code, "access counts exceed references"))?;
    let first_ro = len - tagged;
    let first_wo = len - write_only;
    Ok(ids
        .iter()
        .enumerate()
        .map(|(i, &value_id)| {
            let i = i as u64;
            let access = if i >= first_wo {
                RefAccess::WriteOnly
            } else if i >= first_ro {
                RefAccess::ReadOnly
            } else {
                RefAccess::Any
            };
            Ref { value_id, access }
        })
        .collect())
}

/// The module's global value names, in value id order. Before module
/// version 2 names live in the symbol table instead, and are not read.
fn value_names(module: &Block, strtab: Option<&Block>) -> Vec<Option<String>> {
    let version = module
        .records(MODULE_CODE_VERSION)
        .next()
        .and_then(|r| r.ops.first().copied())
        .unwrap_or(0);
    let table: Option<Vec<u8>> = strtab
        .and_then(|b| b.records(STRTAB_BLOB).next())
        .map(|r| match &r.blob {
            Some(blob) => blob.clone(),
            None => r.ops.iter().map(|&op| op as u8).collect(),
        });
    module
        .records
        .iter()
        .filter(|r| {
            matches!(
                r.code,
                MODULE_CODE_GLOBALVAR | MODULE_CODE_FUNCTION | MODULE_CODE_ALIAS | MODULE_CODE_IFUNC
            )
        })
        .map(|r| {
            if version < 2 {
                return None;
            }
            let table = table.as_ref()?;
            let offset = usize::try_from(*r.ops.first()?).ok()?;
            let size = usize::try_from(*r.ops.get(1)?).ok()?;
            let bytes = table.get(offset..offset.checked_add(size)?)?;
            Some(String::from_utf8_lossy(bytes).into_owned())
        })
        .collect()
}

impl SummaryIndex {
    fn new(kind: SummaryKind, module_path: &str) -> Self {
        SummaryIndex {
            kind,
            module_path: module_path.to_string(),
            module_hash: [0; 5],
            version: None,
            flags: None,
            block_count: None,
            names: Vec::new(),
            entries: Vec::new(),
            other: Vec::new(),
        }
    }

    /// Decode the summary block inside a module block, if there is one.
    pub(crate) fn read(
        module: &Block,
        strtab: Option<&Block>,
        module_path: &str,
    ) -> Result<Option<Self>, Error> {
        let (block, kind) = match module.block(GLOBALVAL_SUMMARY_BLOCK_ID) {
            Some(b) => (b, SummaryKind::ThinLto),
            None => match module.block(FULL_LTO_GLOBALVAL_SUMMARY_BLOCK_ID) {
                Some(b) => (b, SummaryKind::FullLto),
                None => return Ok(None),
            },
        };
        let mut index = Self::new(kind, module_path);
        index.names = value_names(module, strtab);
        if let Some(hash) = module.records(MODULE_CODE_HASH).next() {
            for (slot, word) in index.module_hash.iter_mut().zip(&hash.ops) {
                *slot = *word;
            }
        }
        for r in &block.records {
            index.record(r)?;
        }
        Ok(Some(index))
    }

    fn version(&self) -> u64 {
        // Summaries without FS_VERSION predate it; treat them as version 1.
        self.version.unwrap_or(1)
    }

    fn flags(&self, raw: u64) -> GlobalValueFlags {
        GlobalValueFlags {
            raw,
            version: self.version(),
        }
    }

    fn record(&mut self, r: &Record) -> Result<(), Error> {
        let mut ops = Ops {
            code: r.code,
            ops: &r.ops,
        };
        match r.code {
            FS_VERSION => self.version = Some(ops.next()?),
            FS_FLAGS => self.flags = Some(ops.next()?),
            FS_BLOCK_COUNT => self.block_count = Some(ops.next()?),
            FS_PERMODULE | FS_PERMODULE_PROFILE | FS_PERMODULE_RELBF => {
                let value_id = ops.next()?;
                let flags = self.flags(ops.next()?);
                let insts = ops.next()?;
                let func_flags = if self.version() >= 4 { ops.next()? } else { 0 };
                let num_refs = ops.next()?;
                let read_only = if self.version() >= 5 { ops.next()? } else { 0 };
                let write_only = if self.version() >= 7 { ops.next()? } else { 0 };
                let refs = ref_list(r.code, ops.take(num_refs)?, read_only, write_only)?;
                let calls = match r.code {
                    FS_PERMODULE => ops
                        .ops
                        .iter()
                        .map(|&callee| Call {
                            callee,
                            info: CallInfo::None,
                        })
                        .collect(),
                    code => {
                        if ops.ops.len() % 2 != 0 {
                            return Err(malformed(code, "unpaired call operand"));
                        }
                        ops.ops
                            .chunks_exact(2)
                            .map(|pair| Call {
                                callee: pair[0],
                                info: match (code, pair[1]) {
                                    (_, 0) => CallInfo::None,
                                    (FS_PERMODULE_PROFILE, h) => CallInfo::Hotness(h),
                                    (_, freq) => CallInfo::RelBlockFreq(freq),
                                },
                            })
                            .collect()
                    }
                };
                self.entries.push(SummaryEntry::Function(FunctionSummary {
                    value_id,
                    flags,
                    insts,
                    func_flags,
                    refs,
                    calls,
                }));
            }
            FS_PERMODULE_GLOBALVAR_INIT_REFS => {
                let value_id = ops.next()?;
                let flags = self.flags(ops.next()?);
                let var_flags = if self.version() >= 5 {
                    Some(ops.next()?)
                } else {
                    None
                };
                self.entries.push(SummaryEntry::Variable(VariableSummary {
                    value_id,
                    flags,
                    var_flags,
                    refs: ref_list(r.code, ops.ops, 0, 0)?,
                }));
            }
            FS_ALIAS => {
                let value_id = ops.next()?;
                let flags = self.flags(ops.next()?);
                let aliasee = ops.next()?;
                self.entries.push(SummaryEntry::Alias(AliasSummary {
                    value_id,
                    flags,
                    aliasee,
                }));
            }
            code => self.other.push((code, r.ops.clone())),
        }
        Ok(())
    }

    fn name(&self, value_id: u64) -> Option<&str> {
        let i = usize::try_from(value_id).ok()?;
        self.names.get(i)?.as_deref()
    }

    /// Slot numbers: `^0` is the module, then summaries in record order,
    /// then values that are only referenced.
    fn slots(&self) -> (FxHashMap<u64, usize>, Vec<u64>) {
        let mut slots = FxHashMap::default();
        let mut order = Vec::new();
        let ids = self
            .entries
            .iter()
            .map(SummaryEntry::value_id)
            .chain(self.entries.iter().flat_map(SummaryEntry::referenced));
        for id in ids {
            if !slots.contains_key(&id) {
                slots.insert(id, order.len() + 1);
                order.push(id);
            }
        }
        (slots, order)
    }
}

fn hotness(h: u64) -> &'static str {
    match h {
        1 => "cold",
        2 => "none",
        3 => "hot",
        4 => "critical",
        _ => "unknown",
    }
}

struct Printer<'a> {
    index: &'a SummaryIndex,
    slots: FxHashMap<u64, usize>,
}

impl Printer<'_> {
    fn slot(&self, id: u64) -> usize {
        self.slots.get(&id).copied().unwrap_or(0)
    }

    fn refs(&self, f: &mut fmt::Formatter<'_>, refs: &[Ref]) -> fmt::Result {
        if refs.is_empty() {
            return Ok(());
        }
        write!(f, ", refs: (")?;
        for (i, r) in refs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match r.access {
                RefAccess::ReadOnly => write!(f, "readonly ")?,
                RefAccess::WriteOnly => write!(f, "writeonly ")?,
                RefAccess::Any => (),
            }
            write!(f, "^{}", self.slot(r.value_id))?;
        }
        write!(f, ")")
    }

    fn function(&self, f: &mut fmt::Formatter<'_>, s: &FunctionSummary) -> fmt::Result {
        write!(
            f,
            "function: (module: ^0, flags: {}, insts: {}",
            s.flags, s.insts
        )?;
        if s.func_flags != 0 {
            write!(f, ", funcFlags: (")?;
            for (bit, name) in FUNC_FLAG_NAMES.iter().enumerate() {
                if bit > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: {}", (s.func_flags >> bit) & 1)?;
            }
            write!(f, ")")?;
        }
        if !s.calls.is_empty() {
            write!(f, ", calls: (")?;
            for (i, call) in s.calls.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "(callee: ^{}", self.slot(call.callee))?;
                match call.info {
                    CallInfo::Hotness(h) => write!(f, ", hotness: {}", hotness(h))?,
                    CallInfo::RelBlockFreq(freq) => write!(f, ", relbf: {freq}")?,
                    CallInfo::None => (),
                }
                write!(f, ")")?;
            }
            write!(f, ")")?;
        }
        self.refs(f, &s.refs)?;
        write!(f, ")")
    }

    fn variable(&self, f: &mut fmt::Formatter<'_>, s: &VariableSummary) -> fmt::Result {
        write!(f, "variable: (module: ^0, flags: {}", s.flags)?;
        if let Some(v) = s.var_flags {
            write!(
                f,
                ", varFlags: (readonly: {}, writeonly: {}, constant: {}",
                v & 1,
                (v >> 1) & 1,
                (v >> 2) & 1
            )?;
            if v >> 3 != 0 {
                write!(f, ", vcall_visibility: {}", v >> 3)?;
            }
            write!(f, ")")?;
        }
        self.refs(f, &s.refs)?;
        write!(f, ")")
    }

    fn gv_head(&self, f: &mut fmt::Formatter<'_>, id: u64) -> fmt::Result {
        write!(f, "^{} = gv: (", self.slot(id))?;
        match self.index.name(id) {
            Some(name) => write!(f, "name: \"{name}\""),
            None => write!(f, "valueId: {id}"),
        }
    }
}

impl Display for SummaryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.module_hash;
        writeln!(
            f,
            "^0 = module: (path: \"{}\", hash: ({}, {}, {}, {}, {}))",
            self.module_path, h[0], h[1], h[2], h[3], h[4]
        )?;
        let (slots, order) = self.slots();
        let printer = Printer { index: self, slots };
        let summaries: FxHashMap<u64, &SummaryEntry> =
            self.entries.iter().map(|e| (e.value_id(), e)).collect();
        for id in &order {
            printer.gv_head(f, *id)?;
            if let Some(entry) = summaries.get(id) {
                write!(f, ", summaries: (")?;
                match entry {
                    SummaryEntry::Function(s) => printer.function(f, s)?,
                    SummaryEntry::Variable(s) => printer.variable(f, s)?,
                    SummaryEntry::Alias(s) => write!(
                        f,
                        "alias: (module: ^0, flags: {}, aliasee: ^{})",
                        s.flags,
                        printer.slot(s.aliasee)
                    )?,
                }
                write!(f, ")")?;
            }
            writeln!(f, ")")?;
        }
        let mut next = order.len() + 1;
        if let Some(flags) = self.flags.filter(|&flags| flags != 0) {
            writeln!(f, "^{next} = flags: {flags}")?;
            next += 1;
        }
        writeln!(f, "^{next} = blockcount: {}", self.block_count.unwrap_or(0))?;
        for (code, ops) in &self.other {
            write!(f, "; record {code}:")?;
            for op in ops {
                write!(f, " {op}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(code: u32, ops: &[u64]) -> Record {
        Record {
            code,
            ops: ops.to_vec(),
            blob: None,
        }
    }

    /// A module with globals `v`, `f`, `g` and alias `a` (value ids 0 to
    /// 3), and a summary block holding `records`.
    fn module_with_summary(records: &[(u32, &[u64])]) -> (Block, Block) {
        let summary = Block {
            id: GLOBALVAL_SUMMARY_BLOCK_ID,
            records: records.iter().map(|(c, ops)| record(*c, ops)).collect(),
            blocks: Vec::new(),
        };
        let module = Block {
            id: super::super::MODULE_BLOCK_ID,
            records: vec![
                record(MODULE_CODE_VERSION, &[2]),
                record(MODULE_CODE_GLOBALVAR, &[0, 1]),
                record(MODULE_CODE_FUNCTION, &[1, 1]),
                record(MODULE_CODE_FUNCTION, &[2, 1]),
                record(MODULE_CODE_ALIAS, &[3, 1]),
                record(MODULE_CODE_HASH, &[1, 2, 3, 4, 5]),
            ],
            blocks: vec![summary],
        };
        let strtab = Block {
            id: super::super::STRTAB_BLOCK_ID,
            records: vec![Record {
                code: STRTAB_BLOB,
                ops: Vec::new(),
                blob: Some(b"vfga".to_vec()),
            }],
            blocks: Vec::new(),
        };
        (module, strtab)
    }

    fn read(records: &[(u32, &[u64])]) -> SummaryIndex {
        let (module, strtab) = module_with_summary(records);
        SummaryIndex::read(&module, Some(&strtab), "m.bc")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn no_summary_block() {
        let (mut module, strtab) = module_with_summary(&[]);
        module.blocks.clear();
        assert_eq!(
            SummaryIndex::read(&module, Some(&strtab), "m.bc").unwrap(),
            None
        );
    }

    #[test]
    fn names_come_from_the_string_table() {
        let index = read(&[]);
        assert_eq!(
            index.names,
            vec![
                Some("v".to_string()),
                Some("f".to_string()),
                Some("g".to_string()),
                Some("a".to_string())
            ]
        );
        assert_eq!(index.module_hash, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn function_variable_alias() {
        let index = read(&[
            (FS_VERSION, &[8]),
            (FS_FLAGS, &[8]),
            // valueid, flags, insts, fflags, numrefs, ro, wo, refs, calls
            (FS_PERMODULE, &[1, 0x40, 5, 0, 2, 1, 0, 3, 0, 2]),
            (FS_PERMODULE_GLOBALVAR_INIT_REFS, &[0, 0x7, 1]),
            (FS_ALIAS, &[3, 0, 1]),
            (FS_BLOCK_COUNT, &[2]),
            (99, &[1, 2]),
        ]);
        assert_eq!(index.kind, SummaryKind::ThinLto);
        assert_eq!(index.version, Some(8));
        match &index.entries[0] {
            SummaryEntry::Function(s) => {
                assert!(s.flags.dso_local());
                assert_eq!(
                    s.refs,
                    vec![
                        Ref {
                            value_id: 3,
                            access: RefAccess::Any
                        },
                        Ref {
                            value_id: 0,
                            access: RefAccess::ReadOnly
                        }
                    ]
                );
            }
            e => panic!("expected function summary, got {e:?}"),
        }
        assert_eq!(index.other, vec![(99, vec![1, 2])]);

        let text = index.to_string();
        assert_eq!(
            text,
            "^0 = module: (path: \"m.bc\", hash: (1, 2, 3, 4, 5))\n\
             ^1 = gv: (name: \"f\", summaries: (function: (module: ^0, flags: (linkage: external, visibility: default, notEligibleToImport: 0, live: 0, dsoLocal: 1, canAutoHide: 0), insts: 5, calls: ((callee: ^4)), refs: (^3, readonly ^2))))\n\
             ^2 = gv: (name: \"v\", summaries: (variable: (module: ^0, flags: (linkage: internal, visibility: default, notEligibleToImport: 0, live: 0, dsoLocal: 0, canAutoHide: 0), varFlags: (readonly: 1, writeonly: 0, constant: 0))))\n\
             ^3 = gv: (name: \"a\", summaries: (alias: (module: ^0, flags: (linkage: external, visibility: default, notEligibleToImport: 0, live: 0, dsoLocal: 0, canAutoHide: 0), aliasee: ^1)))\n\
             ^4 = gv: (name: \"g\")\n\
             ^5 = flags: 8\n\
             ^6 = blockcount: 2\n\
             ; record 99: 1 2\n"
        );
    }

    #[test]
    fn call_hotness_and_relbf() {
        let index = read(&[
            (FS_VERSION, &[8]),
            (FS_PERMODULE_PROFILE, &[1, 0, 2, 0, 0, 0, 0, 2, 3, 0, 0]),
            (FS_PERMODULE_RELBF, &[2, 0, 1, 0, 0, 0, 0, 1, 256]),
        ]);
        let text = index.to_string();
        assert!(
            text.contains("calls: ((callee: ^2, hotness: hot), (callee: ^3))"),
            "{text}"
        );
        assert!(text.contains("calls: ((callee: ^1, relbf: 256))"), "{text}");
        // No flags record: no flags line, but a block count.
        assert!(text.ends_with("^4 = blockcount: 0\n"), "{text}");
    }

    #[test]
    fn func_flags_and_old_versions() {
        let index = read(&[
            (FS_VERSION, &[2]),
            (FS_PERMODULE, &[1, 0x7, 4, 0]),
        ]);
        let text = index.to_string();
        // Before version 3 everything is live and not importable; before
        // version 4 there are no function flags.
        assert!(
            text.contains("flags: (linkage: internal, visibility: default, notEligibleToImport: 1, live: 1"),
            "{text}"
        );
        assert!(!text.contains("funcFlags"), "{text}");

        let index = read(&[(FS_VERSION, &[8]), (FS_PERMODULE, &[1, 0, 4, 0x41, 0, 0, 0])]);
        assert!(index.to_string().contains(
            "funcFlags: (readNone: 1, readOnly: 0, noRecurse: 0, returnDoesNotAlias: 0, noInline: 0, alwaysInline: 0, noUnwind: 1, mayThrow: 0, hasUnknownCall: 0, mustBeUnreachable: 0)"
        ));
    }

    #[test]
    fn unnamed_values_fall_back_to_ids() {
        let (mut module, _) = module_with_summary(&[(FS_VERSION, &[8]), (FS_ALIAS, &[3, 0, 9])]);
        module.records.retain(|r| r.code != MODULE_CODE_HASH);
        let index = SummaryIndex::read(&module, None, "m.bc").unwrap().unwrap();
        let text = index.to_string();
        assert!(text.contains("hash: (0, 0, 0, 0, 0)"), "{text}");
        assert!(text.contains("^1 = gv: (valueId: 3, summaries: (alias:"), "{text}");
        assert!(text.contains("^2 = gv: (valueId: 9)\n"), "{text}");
    }

    #[test]
    fn linkage_names() {
        let names: Vec<_> = (0..=10)
            .map(|raw| GlobalValueFlags { raw, version: 8 }.linkage())
            .collect();
        assert_eq!(
            names,
            [
                "external",
                "available_externally",
                "linkonce",
                "linkonce_odr",
                "weak",
                "weak_odr",
                "appending",
                "internal",
                "private",
                "extern_weak",
                "common"
            ]
        );
        let hidden = GlobalValueFlags {
            raw: 1 << 8,
            version: 8,
        };
        assert_eq!(hidden.visibility(), "hidden");
    }

    #[test]
    fn short_record_is_malformed() {
        let (module, strtab) = module_with_summary(&[(FS_VERSION, &[8]), (FS_ALIAS, &[9])]);
        assert_eq!(
            SummaryIndex::read(&module, Some(&strtab), "m.bc").unwrap_err(),
            Error::MalformedSummary {
                code: FS_ALIAS,
                reason: "too few operands"
            }
        );
    }

    #[test]
    fn access_counts_past_the_list_are_malformed() {
        let (module, strtab) =
            module_with_summary(&[(FS_VERSION, &[8]), (FS_PERMODULE, &[1, 0, 1, 0, 1, 1, 1, 3])]);
        assert_eq!(
            SummaryIndex::read(&module, Some(&strtab), "m.bc").unwrap_err(),
            Error::MalformedSummary {
                code: FS_PERMODULE,
                reason: "access counts exceed references"
            }
        );
    }
}
