// SPDX-License-Identifier: BSD-3-Clause
//! The per-input, per-module pipeline:
//! load → decode container → for each module
//! {name output → materialize → print → inline CSS → commit}.

use std::ffi::OsString;
use std::fmt::{self, Display};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;

use crate::annotate::{AnnotationWriter, CommentWriter};
use crate::bitcode::{self, BitcodeModule};
use crate::diagnostic::{Diagnostic, DiagnosticHandler};
use crate::html::{escape, inline_css, HtmlWriter};
use crate::loader::{self, LoadOptions};
use crate::output::{OutputName, ToolOutputFile};

pub const MULTIPLE_INPUTS_WITH_OUTPUT: &str =
    "output file name cannot be set for multiple input files";
pub const MULTI_MODULE_TO_STDOUT: &str =
    "only single module bitcode files can be written to stdout";

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// `-` names standard input.
    pub fn new(arg: impl Into<PathBuf>) -> Self {
        let path = arg.into();
        if path.as_os_str() == "-" {
            Input::Stdin
        } else {
            Input::File(path)
        }
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            Input::Stdin => {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                Ok(buf)
            }
            Input::File(path) => std::fs::read(path),
        }
    }

    /// The name modules read from this input are given (`; ModuleID`).
    pub fn module_identifier(&self) -> String {
        match self {
            Input::Stdin => "<stdin>".to_string(),
            Input::File(path) => path.display().to_string(),
        }
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => write!(f, "-"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Empty means standard input.
    pub inputs: Vec<Input>,
    pub output: Option<String>,
    /// Output is text, so writing to a terminal needs no override.
    pub force: bool,
    pub disable_output: bool,
    pub show_annotations: bool,
    pub preserve_use_list_order: bool,
    pub materialize_metadata: bool,
    pub print_thinlto_index_only: bool,
    pub set_importing: bool,
}

impl Options {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            materialize_metadata: self.materialize_metadata,
            set_importing: self.set_importing,
        }
    }
}

/// Where module `index` of `count` read from `input` is written.
pub fn resolve_output_name(
    options: &Options,
    input: &Input,
    index: usize,
    count: usize,
) -> OutputName {
    if options.disable_output {
        return OutputName::Discard;
    }
    let mut name: OsString = match (&options.output, input) {
        (Some(output), _) => output.into(),
        (None, Input::Stdin) => return OutputName::Stdout,
        (None, Input::File(path)) => match path.to_str().and_then(|p| p.strip_suffix(".bc")) {
            Some(stem) => stem.into(),
            None => path.as_os_str().to_owned(),
        },
    };
    if count > 1 {
        name.push(format!(".{index}"));
    }
    if options.output.is_none() {
        name.push(".html");
    }
    if name == "-" {
        OutputName::Stdout
    } else {
        OutputName::File(PathBuf::from(name))
    }
}

pub fn run<W: Write>(options: &Options, handler: &mut DiagnosticHandler<W>) -> anyhow::Result<()> {
    if options.inputs.len() > 1 && options.output.is_some() {
        return Err(handler.error(MULTIPLE_INPUTS_WITH_OUTPUT).into());
    }
    tracing::debug!(force = options.force, "options: {:?}", options);
    let stdin = [Input::Stdin];
    let inputs = if options.inputs.is_empty() {
        &stdin[..]
    } else {
        &options.inputs[..]
    };
    for input in inputs {
        let _span = tracing::info_span!("input", %input).entered();
        run_input(options, input, handler)?;
    }
    Ok(())
}

fn run_input<W: Write>(
    options: &Options,
    input: &Input,
    handler: &mut DiagnosticHandler<W>,
) -> anyhow::Result<()> {
    let bytes = match input.read() {
        Ok(bytes) => bytes,
        Err(e) => return Err(handler.error(format!("{input}: {e}")).into()),
    };
    let contents = bitcode::get_bitcode_file_contents(&bytes)
        .with_context(|| format!("{input}: could not read bitcode"))?;
    for warning in &contents.warnings {
        handler.handle(&Diagnostic::warning(format!("{input}: {}", warning.message)))?;
    }

    let count = contents.modules.len();
    if options.output.as_deref() == Some("-") && count > 1 {
        handler.handle(&Diagnostic::warning(MULTI_MODULE_TO_STDOUT))?;
    }
    for module in &contents.modules {
        let _span = tracing::info_span!("module", index = module.index(), count).entered();
        run_module(options, input, module, count, handler)?;
    }
    Ok(())
}

fn run_module<W: Write>(
    options: &Options,
    input: &Input,
    module: &BitcodeModule<'_>,
    count: usize,
    handler: &mut DiagnosticHandler<W>,
) -> anyhow::Result<()> {
    let loaded = if options.print_thinlto_index_only {
        None
    } else {
        let _span = tracing::info_span!("load").entered();
        match loader::load(
            &module.bytes(),
            &input.module_identifier(),
            &options.load_options(),
            handler,
        ) {
            Ok(loaded) => Some(loaded),
            // Already reported.
            Err(loader::Error::Diagnostic(fatal)) => return Err(fatal.into()),
            Err(e) => return Err(handler.error(format!("{input}: {e}")).into()),
        }
    };

    let lto = module
        .lto_info()
        .with_context(|| format!("{input}: could not read LTO info"))?;
    let index = if lto.has_summary {
        let _span = tracing::info_span!("summary", thin = lto.is_thin_lto).entered();
        module
            .summary(&input.to_string())
            .with_context(|| format!("{input}: could not read summary index"))?
    } else {
        None
    };

    let name = resolve_output_name(options, input, module.index(), count);
    tracing::debug!(output = %name, "resolved output name");
    let mut out = ToolOutputFile::create(&name)?;

    let mut body = String::new();
    let mut css = String::new();
    if !options.disable_output {
        let _span = tracing::info_span!("print").entered();
        if let Some(loaded) = &loaded {
            let mut comments = CommentWriter::new();
            let annotator: Option<&mut dyn AnnotationWriter> = if options.show_annotations {
                Some(&mut comments)
            } else {
                None
            };
            let print_options = loaded.print_options(options.preserve_use_list_order);
            HtmlWriter::new(loaded, print_options)
                .print(&mut body, &mut css, "", annotator)
                .with_context(|| format!("{input}: could not print module"))?;
        }
        if let Some(index) = &index {
            writeln!(out, "<pre class=\"summary-index\">")?;
            write!(out, "{}", escape(&index.to_string()))?;
            writeln!(out, "</pre>")?;
        }
    }

    {
        let _span = tracing::info_span!("inline_css").entered();
        inline_css(&mut out, &body, &css).with_context(|| format!("{name}: write failed"))?;
    }
    let _span = tracing::info_span!("commit").entered();
    out.keep()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bitcode::summary::{
        FS_FLAGS, FS_PERMODULE, FS_VERSION, MODULE_CODE_FUNCTION, MODULE_CODE_VERSION, STRTAB_BLOB,
    };
    use crate::bitcode::testing::BitWriter;
    use crate::bitcode::{GLOBALVAL_SUMMARY_BLOCK_ID, MODULE_BLOCK_ID, STRTAB_BLOCK_ID};
    use crate::diagnostic::FatalDiagnostic;

    fn file(path: &str) -> Input {
        Input::new(path)
    }

    fn name(options: &Options, input: &Input, index: usize, count: usize) -> OutputName {
        resolve_output_name(options, input, index, count)
    }

    #[test]
    fn dash_is_stdin() {
        assert_eq!(Input::new("-"), Input::Stdin);
        assert_eq!(Input::new("a.bc"), Input::File(PathBuf::from("a.bc")));
    }

    #[test]
    fn module_identifiers() {
        assert_eq!(Input::Stdin.module_identifier(), "<stdin>");
        assert_eq!(file("dir/a.bc").module_identifier(), "dir/a.bc");
    }

    #[test]
    fn default_names() {
        let options = Options::default();
        assert_eq!(
            name(&options, &file("dir/foo.bc"), 0, 1),
            OutputName::File(PathBuf::from("dir/foo.html"))
        );
        assert_eq!(
            name(&options, &file("foo.bc"), 1, 2),
            OutputName::File(PathBuf::from("foo.1.html"))
        );
        assert_eq!(
            name(&options, &file("foo.ll"), 0, 1),
            OutputName::File(PathBuf::from("foo.ll.html"))
        );
        assert_eq!(name(&options, &Input::Stdin, 0, 1), OutputName::Stdout);
        assert_eq!(name(&options, &Input::Stdin, 1, 3), OutputName::Stdout);
    }

    #[test]
    fn explicit_names() {
        let options = Options {
            output: Some("out.html".to_string()),
            ..Options::default()
        };
        assert_eq!(
            name(&options, &file("foo.bc"), 0, 1),
            OutputName::File(PathBuf::from("out.html"))
        );
        assert_eq!(
            name(&options, &file("foo.bc"), 2, 3),
            OutputName::File(PathBuf::from("out.html.2"))
        );
    }

    #[test]
    fn explicit_stdout() {
        let options = Options {
            output: Some("-".to_string()),
            ..Options::default()
        };
        assert_eq!(name(&options, &file("foo.bc"), 0, 1), OutputName::Stdout);
        assert_eq!(
            name(&options, &file("foo.bc"), 1, 2),
            OutputName::File(PathBuf::from("-.1"))
        );
    }

    #[test]
    fn disabled_output_wins() {
        let options = Options {
            output: Some("out.html".to_string()),
            disable_output: true,
            ..Options::default()
        };
        assert_eq!(name(&options, &file("foo.bc"), 0, 2), OutputName::Discard);
        assert_eq!(name(&options, &Input::Stdin, 0, 1), OutputName::Discard);
    }

    #[test]
    fn names_are_distinct_per_module() {
        let options = Options::default();
        let names: Vec<_> = (0..4).map(|i| name(&options, &file("m.bc"), i, 4)).collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    fn run_with(options: &Options) -> (anyhow::Result<()>, String) {
        let mut handler = DiagnosticHandler::new("llvm-html", Vec::new(), false);
        let res = run(options, &mut handler);
        (res, String::from_utf8(handler.into_inner()).unwrap())
    }

    #[test]
    fn multiple_inputs_with_output_is_an_error() {
        let options = Options {
            inputs: vec![file("a.bc"), file("b.bc")],
            output: Some("x.html".to_string()),
            ..Options::default()
        };
        let (res, stderr) = run_with(&options);
        let err = res.unwrap_err();
        assert!(err.downcast_ref::<FatalDiagnostic>().is_some());
        assert_eq!(
            stderr,
            "llvm-html: error: output file name cannot be set for multiple input files\n"
        );
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.bc");
        let options = Options {
            inputs: vec![Input::File(missing.clone())],
            ..Options::default()
        };
        let (res, stderr) = run_with(&options);
        assert!(res.is_err());
        assert!(stderr.starts_with(&format!("llvm-html: error: {}: ", missing.display())));
    }

    #[test]
    fn non_bitcode_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("junk.bc");
        std::fs::write(&input, b"this is not bitcode").unwrap();
        let options = Options {
            inputs: vec![Input::File(input)],
            ..Options::default()
        };
        let (res, _) = run_with(&options);
        let err = res.unwrap_err();
        assert!(err.chain().any(|e| e.to_string() == "invalid bitcode signature"));
        assert!(!dir.path().join("junk.html").exists());
    }

    #[test]
    fn llvm_rejection_is_reported_through_the_handler() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("future.bc");
        let mut w = BitWriter::default();
        w.magic();
        w.enter_block(MODULE_BLOCK_ID, 3);
        w.unabbrev_record(MODULE_CODE_VERSION, &[99]);
        w.end_block();
        std::fs::write(&input, w.finish()).unwrap();
        let options = Options {
            inputs: vec![Input::File(input)],
            ..Options::default()
        };
        let (res, stderr) = run_with(&options);
        let err = res.unwrap_err();
        assert!(err.downcast_ref::<FatalDiagnostic>().is_some(), "{err:?}");
        assert!(stderr.starts_with("llvm-html: error: "), "{stderr}");
        assert!(!dir.path().join("future.html").exists());
    }

    /// A container of `n` modules, each defining one function with a
    /// summary, sharing one string table. Module `i` names its function
    /// with the `i`th letter from `f`.
    fn summary_container(n: usize) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.magic();
        for i in 0..n as u64 {
            w.enter_block(MODULE_BLOCK_ID, 3);
            w.unabbrev_record(MODULE_CODE_VERSION, &[2]);
            w.unabbrev_record(MODULE_CODE_FUNCTION, &[i, 1]);
            w.enter_block(GLOBALVAL_SUMMARY_BLOCK_ID, 4);
            w.unabbrev_record(FS_VERSION, &[8]);
            w.unabbrev_record(FS_FLAGS, &[0]);
            w.unabbrev_record(FS_PERMODULE, &[0, 0x40, 3, 0, 0, 0, 0]);
            w.end_block();
            w.end_block();
        }
        w.enter_block(STRTAB_BLOCK_ID, 3);
        let names: Vec<u8> = (0..n as u8).map(|i| b'f' + i).collect();
        w.blob_record(STRTAB_BLOB, &names);
        w.end_block();
        w.finish()
    }

    #[test]
    fn index_only_writes_escaped_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lto.bc");
        std::fs::write(&input, summary_container(1)).unwrap();
        let options = Options {
            inputs: vec![Input::File(input.clone())],
            print_thinlto_index_only: true,
            ..Options::default()
        };
        let (res, stderr) = run_with(&options);
        res.unwrap();
        assert_eq!(stderr, "");

        let html = std::fs::read_to_string(dir.path().join("lto.html")).unwrap();
        assert!(html.starts_with("<pre class=\"summary-index\">\n^0 = module: (path: &quot;"));
        assert!(html.contains("^1 = gv: (name: &quot;f&quot;, summaries: (function: (module: ^0"));
        assert!(html.contains("^2 = blockcount: 0\n"));
        assert!(html.ends_with("</pre>\n"));
    }

    #[test]
    fn index_only_multi_module_names() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("two.bc");
        std::fs::write(&input, summary_container(2)).unwrap();
        let options = Options {
            inputs: vec![Input::File(input)],
            print_thinlto_index_only: true,
            ..Options::default()
        };
        run_with(&options).0.unwrap();
        let first = std::fs::read_to_string(dir.path().join("two.0.html")).unwrap();
        let second = std::fs::read_to_string(dir.path().join("two.1.html")).unwrap();
        assert!(first.contains("name: &quot;f&quot;"));
        assert!(second.contains("name: &quot;g&quot;"));
    }

    #[test]
    fn disable_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lto.bc");
        std::fs::write(&input, summary_container(1)).unwrap();
        let options = Options {
            inputs: vec![Input::File(input)],
            print_thinlto_index_only: true,
            disable_output: true,
            ..Options::default()
        };
        run_with(&options).0.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
