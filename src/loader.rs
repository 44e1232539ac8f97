// SPDX-License-Identifier: BSD-3-Clause
//! Loading one embedded module.
//!
//! LLVM parses the bytes itself, under the input's name, with whatever it
//! reports routed through the tool's [`DiagnosticHandler`]. `llvm-ir` then
//! reads the same bytes for use counting; it reads from a path, so they
//! are staged in a temporary `.bc` file first.

use std::ffi::CString;
use std::fmt;
use std::io::{self, Write};

use llvm_ir::Module;

use crate::diagnostic::{DiagnosticHandler, FatalDiagnostic};
use crate::html::PrintOptions;

pub mod llvm;
#[cfg(test)]
pub(crate) mod testing;

pub use self::llvm::{LlvmModule, Value};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to stage module for loading: {0}")]
    Stage(#[from] io::Error),
    /// LLVM rejected the module; its diagnostic has been reported.
    #[error(transparent)]
    Diagnostic(#[from] FatalDiagnostic),
    #[error("{0}")]
    Parse(String),
    #[error("module name contains a NUL byte: {0:?}")]
    Identifier(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Materialization {
    /// Everything, including function bodies.
    #[default]
    Full,
    /// Metadata only: function bodies stay unread.
    MetadataOnly,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub materialize_metadata: bool,
    /// The C API has no importing mode; this is only recorded.
    pub set_importing: bool,
}

pub struct LoadedModule {
    /// For use counting.
    pub module: Module,
    /// For printing.
    pub llvm: LlvmModule,
    pub materialization: Materialization,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("identifier", &self.llvm.identifier())
            .field("functions", &self.module.functions.len())
            .field("materialization", &self.materialization)
            .finish()
    }
}

impl LoadedModule {
    pub fn print_options(&self, preserve_use_list_order: bool) -> PrintOptions {
        PrintOptions {
            preserve_use_list_order,
            function_bodies: self.materialization == Materialization::Full,
        }
    }
}

/// Load `bitcode` as the module named `identifier`. Diagnostics LLVM
/// reports go to `handler`; an error among them ends the load.
pub fn load<W: Write>(
    bitcode: &[u8],
    identifier: &str,
    options: &LoadOptions,
    handler: &mut DiagnosticHandler<W>,
) -> Result<LoadedModule, Error> {
    let materialization = if options.materialize_metadata {
        Materialization::MetadataOnly
    } else {
        Materialization::Full
    };
    let name = CString::new(identifier).map_err(|_| Error::Identifier(identifier.to_string()))?;
    let parsed = LlvmModule::parse(
        bitcode,
        &name,
        materialization == Materialization::MetadataOnly,
    );
    for diagnostic in &parsed.diagnostics {
        handler.handle(diagnostic)?;
    }
    let llvm = parsed
        .module
        .ok_or_else(|| Error::Parse(format!("{identifier}: could not read bitcode")))?;

    let mut staged = tempfile::Builder::new()
        .prefix("llvm-html-")
        .suffix(".bc")
        .tempfile()?;
    staged.write_all(bitcode)?;
    staged.flush()?;
    tracing::trace!(
        path = %staged.path().display(),
        len = bitcode.len(),
        set_importing = options.set_importing,
        "staged module"
    );
    let module = Module::from_bc_path(staged.path()).map_err(Error::Parse)?;

    let loaded = LoadedModule {
        module,
        llvm,
        materialization,
    };
    tracing::debug!(?loaded, "loaded module");
    Ok(loaded)
}
