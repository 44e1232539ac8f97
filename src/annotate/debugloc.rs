// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::{self, Display};

/// A source position, possibly inlined into another one.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    /// Zero when the column is unknown.
    pub col: u32,
    pub inlined_at: Option<Box<SourceLocation>>,
}

impl SourceLocation {
    pub fn new(line: u32, col: u32) -> Self {
        SourceLocation {
            line,
            col,
            inlined_at: None,
        }
    }

    pub fn inlined_at(mut self, parent: SourceLocation) -> Self {
        self.inlined_at = Some(Box::new(parent));
        self
    }
}

/// `line:col`, followed by `@line:col` for each inlined-at parent.
impl Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)?;
        let mut parent = self.inlined_at.as_deref();
        while let Some(loc) = parent {
            write!(f, "@{}:{}", loc.line, loc.col)?;
            parent = loc.inlined_at.as_deref();
        }
        Ok(())
    }
}
