// SPDX-License-Identifier: BSD-3-Clause
//! Reporting of problems found while loading bitcode.
//!
//! Diagnostics are written as `<program>: <severity>: <message>`. An
//! error-severity diagnostic is fatal: [`DiagnosticHandler::handle`] returns
//! [`FatalDiagnostic`] and the caller is expected to unwind and exit.

use std::fmt::{self, Display};
use std::io::Write;

/// ANSI escapes, matching the colors LLVM's tools use for each severity.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;35m"; // Bold magenta
    pub const NOTE: &str = "\x1b[1;30m"; // Bold black
    pub const RESET: &str = "\x1b[0m";
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Remark,
    Note,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Remark => write!(f, "remark"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn remark(message: impl Into<String>) -> Self {
        Self::new(Severity::Remark, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }
}

/// An error-severity diagnostic was reported. The message has already been
/// written, so this should not be printed again.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FatalDiagnostic(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color when the destination is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct DiagnosticHandler<W: Write> {
    prefix: String,
    writer: W,
    colors: bool,
}

impl<W: Write> DiagnosticHandler<W> {
    pub fn new(prefix: impl Into<String>, writer: W, colors: bool) -> Self {
        DiagnosticHandler {
            prefix: prefix.into(),
            writer,
            colors,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_label(&mut self, severity: Severity) {
        let color = match severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
            // Remarks are never highlighted.
            Severity::Remark => {
                let _ = write!(self.writer, "{severity}: ");
                return;
            }
        };
        if self.colors {
            let _ = write!(self.writer, "{color}{severity}: {}", colors::RESET);
        } else {
            let _ = write!(self.writer, "{severity}: ");
        }
    }

    fn report(&mut self, diagnostic: &Diagnostic) {
        let _ = write!(self.writer, "{}: ", self.prefix);
        self.write_label(diagnostic.severity);
        let _ = writeln!(self.writer, "{}", diagnostic.message);
        let _ = self.writer.flush();
    }

    /// Report `diagnostic`. Returns `Err` iff it has error severity.
    pub fn handle(&mut self, diagnostic: &Diagnostic) -> Result<(), FatalDiagnostic> {
        self.report(diagnostic);
        if diagnostic.severity == Severity::Error {
            return Err(FatalDiagnostic(diagnostic.message.clone()));
        }
        Ok(())
    }

    /// Report an error and return the signal to unwind with.
    pub fn error(&mut self, message: impl Into<String>) -> FatalDiagnostic {
        let diagnostic = Diagnostic::error(message);
        self.report(&diagnostic);
        FatalDiagnostic(diagnostic.message)
    }

    /// Report a warning about the tool itself.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.report(&Diagnostic::warning(message));
    }
}
