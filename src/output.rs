// SPDX-License-Identifier: BSD-3-Clause
//! Output destinations that only appear once they are complete.
//!
//! A named output is written to a temporary file next to its final path
//! and renamed into place by [`ToolOutputFile::keep`]. Dropping the file
//! without keeping it removes the temporary, so a failed module leaves
//! nothing behind.

use std::fmt::{self, Display};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum OutputName {
    Stdout,
    /// Written and thrown away (`--disable-output`).
    Discard,
    File(PathBuf),
}

impl Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputName::Stdout => write!(f, "-"),
            OutputName::Discard => write!(f, "<discarded>"),
            OutputName::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("{path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

enum Sink {
    Stdout(io::Stdout),
    Discard(io::Sink),
    File { temp: NamedTempFile, path: PathBuf },
}

pub struct ToolOutputFile {
    sink: Sink,
}

impl ToolOutputFile {
    pub fn create(name: &OutputName) -> Result<Self, Error> {
        let sink = match name {
            OutputName::Stdout => Sink::Stdout(io::stdout()),
            OutputName::Discard => Sink::Discard(io::sink()),
            OutputName::File(path) => {
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                let temp = NamedTempFile::new_in(dir).map_err(|source| Error::Create {
                    path: path.clone(),
                    source,
                })?;
                Sink::File {
                    temp,
                    path: path.clone(),
                }
            }
        };
        Ok(ToolOutputFile { sink })
    }

    /// Commit the output. For a named file this moves the temporary into
    /// place, replacing any existing file.
    pub fn keep(self) -> Result<(), Error> {
        match self.sink {
            Sink::Stdout(mut out) => out.flush().map_err(|source| Error::Persist {
                path: PathBuf::from("-"),
                source,
            }),
            Sink::Discard(_) => Ok(()),
            Sink::File { mut temp, path } => {
                temp.flush().map_err(|source| Error::Persist {
                    path: path.clone(),
                    source,
                })?;
                temp.persist(&path).map_err(|e| Error::Persist {
                    path: path.clone(),
                    source: e.error,
                })?;
                tracing::debug!(path = %path.display(), "kept output");
                Ok(())
            }
        }
    }
}

impl Write for ToolOutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Stdout(out) => out.write(buf),
            Sink::Discard(out) => out.write(buf),
            Sink::File { temp, .. } => temp.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout(out) => out.flush(),
            Sink::Discard(out) => out.flush(),
            Sink::File { temp, .. } => temp.flush(),
        }
    }
}
