// SPDX-License-Identifier: BSD-3-Clause
use std::fmt;
use std::path::PathBuf;

use crate::diagnostic::ColorMode;
use crate::driver::{Input, Options};

#[derive(Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Always => write!(f, "always"),
            Color::Never => write!(f, "never"),
        }
    }
}

impl From<&Color> for ColorMode {
    fn from(color: &Color) -> Self {
        match color {
            Color::Auto => ColorMode::Auto,
            Color::Always => ColorMode::Always,
            Color::Never => ColorMode::Never,
        }
    }
}

/// llvm .bc -> .html emitter
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input bitcode files (`-` for standard input)
    #[arg(default_value = "-")]
    pub inputs: Vec<PathBuf>,

    /// Override output filename
    #[arg(short = 'o', value_name = "filename")]
    pub output: Option<String>,

    /// Enable binary output on terminals
    #[arg(short = 'f')]
    pub force: bool,

    /// Don't output the .html file
    #[arg(long)]
    pub disable_output: bool,

    /// Add informational comments to the .html output
    #[arg(long)]
    pub show_annotations: bool,

    /// Preserve use-list order when writing LLVM assembly
    #[arg(long)]
    pub preserve_ll_uselistorder: bool,

    /// Load module without materializing metadata, then materialize only
    /// the metadata
    #[arg(long)]
    pub materialize_metadata: bool,

    /// Only read thinlto index and print the index as LLVM assembly
    #[arg(long)]
    pub print_thinlto_index_only: bool,

    /// Set lazy loading to pretend to import a module
    #[arg(long)]
    pub set_importing: bool,

    /// Use colors in diagnostics
    #[arg(long, default_value_t = Color::Auto)]
    pub color: Color,

    /// Tracing
    #[arg(long)]
    pub tracing: bool,

    /// With --tracing, also write folded stacks to this file
    #[arg(long, value_name = "FILE", requires = "tracing")]
    pub flame: Option<PathBuf>,
}

impl Args {
    pub fn options(&self) -> Options {
        Options {
            inputs: self.inputs.iter().cloned().map(Input::new).collect(),
            output: self.output.clone(),
            force: self.force,
            disable_output: self.disable_output,
            show_annotations: self.show_annotations,
            preserve_use_list_order: self.preserve_ll_uselistorder,
            materialize_metadata: self.materialize_metadata,
            print_thinlto_index_only: self.print_thinlto_index_only,
            set_importing: self.set_importing,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_to_stdin() {
        let args = Args::try_parse_from(["llvm-html"]).unwrap();
        assert_eq!(args.options().inputs, vec![Input::Stdin]);
        assert_eq!(args.color, Color::Auto);
    }

    #[test]
    fn flags_map_onto_options() {
        let args = Args::try_parse_from([
            "llvm-html",
            "a.bc",
            "-o",
            "out.html",
            "--show-annotations",
            "--preserve-ll-uselistorder",
            "--materialize-metadata",
            "--print-thinlto-index-only",
            "--set-importing",
            "--disable-output",
            "-f",
            "--color",
            "never",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.inputs, vec![Input::File(PathBuf::from("a.bc"))]);
        assert_eq!(options.output.as_deref(), Some("out.html"));
        assert!(options.show_annotations);
        assert!(options.preserve_use_list_order);
        assert!(options.materialize_metadata);
        assert!(options.print_thinlto_index_only);
        assert!(options.set_importing);
        assert!(options.disable_output);
        assert!(options.force);
        assert_eq!(ColorMode::from(&args.color), ColorMode::Never);
    }

    #[test]
    fn flame_requires_tracing() {
        assert!(Args::try_parse_from(["llvm-html", "--flame", "x.folded"]).is_err());
        assert!(Args::try_parse_from(["llvm-html", "--tracing", "--flame", "x.folded"]).is_ok());
    }
}
