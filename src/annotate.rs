// SPDX-License-Identifier: BSD-3-Clause
//! Hooks called by the HTML printer at fixed points, and the one
//! implementation the tool ships: trailing `; [#uses=...]` comments.

use std::fmt::{self, Write};

use crate::html::formatted::FormattedWriter;

pub mod debugloc;

pub use debugloc::SourceLocation;

/// Column at which info comments start, when the line is short enough.
pub const COMMENT_COLUMN: usize = 50;

/// What the printer knows about a function (defined or declared) when it
/// is about to print it.
#[derive(Clone, Copy, Debug)]
pub struct FunctionInfo<'a> {
    pub name: &'a str,
    pub uses: usize,
}

#[derive(Clone, Debug)]
pub enum ValueKind {
    /// A global variable or alias.
    Global,
    Instruction {
        debug_loc: Option<SourceLocation>,
        /// Set for calls to `llvm.dbg.declare` and `llvm.dbg.value`.
        debug_variable: Option<String>,
    },
}

/// A printed value, as seen by [`AnnotationWriter::print_info_comment`].
#[derive(Clone, Debug)]
pub struct ValueInfo {
    /// The type as LLVM prints it; `None` for void.
    pub ty: Option<String>,
    pub uses: usize,
    pub kind: ValueKind,
}

impl ValueInfo {
    pub fn is_void(&self) -> bool {
        self.ty.is_none()
    }
}

pub trait AnnotationWriter {
    /// Called before a function's header line.
    fn emit_function_annot(
        &mut self,
        function: &FunctionInfo<'_>,
        out: &mut FormattedWriter<'_>,
    ) -> fmt::Result;

    /// Called after a value's text, before the line break.
    fn print_info_comment(
        &mut self,
        value: &ValueInfo,
        out: &mut FormattedWriter<'_>,
    ) -> fmt::Result;
}

/// Use counts, types and debug info as trailing comments.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommentWriter;

impl CommentWriter {
    pub fn new() -> Self {
        CommentWriter
    }
}

fn pad_once(padded: &mut bool, out: &mut FormattedWriter<'_>) -> fmt::Result {
    if !*padded {
        out.pad_to_column(COMMENT_COLUMN);
        out.write_char(';')?;
        *padded = true;
    }
    Ok(())
}

impl AnnotationWriter for CommentWriter {
    fn emit_function_annot(
        &mut self,
        function: &FunctionInfo<'_>,
        out: &mut FormattedWriter<'_>,
    ) -> fmt::Result {
        writeln!(out, "; [#uses={}]", function.uses)
    }

    fn print_info_comment(
        &mut self,
        value: &ValueInfo,
        out: &mut FormattedWriter<'_>,
    ) -> fmt::Result {
        let mut padded = false;
        if let Some(ty) = &value.ty {
            out.pad_to_column(COMMENT_COLUMN);
            padded = true;
            write!(out, "; [#uses={} type={ty}]", value.uses)?;
        }
        if let ValueKind::Instruction {
            debug_loc,
            debug_variable,
        } = &value.kind
        {
            if let Some(loc) = debug_loc {
                pad_once(&mut padded, out)?;
                write!(out, " [debug line = {loc}]")?;
            }
            if let Some(var) = debug_variable {
                pad_once(&mut padded, out)?;
                write!(out, " [debug variable = {var}]")?;
            }
        }
        Ok(())
    }
}
