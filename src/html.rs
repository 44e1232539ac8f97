// SPDX-License-Identifier: BSD-3-Clause
//! Printing a loaded module as an HTML page.
//!
//! The text is LLVM's own assembly for the module, walked line by line and
//! marked up: comments, keywords and value references get spans, defined
//! functions get anchors, and the annotation hooks run at the points
//! LLVM's printer would call them. Lines are matched to values in
//! printing order, so the walk never reparses IR.
//!
//! The page links a stylesheet by name; the stylesheet itself goes to a
//! separate buffer so the caller can decide to inline it (see
//! [`css::inline_css`]). All IR text is escaped, so the only `<link` tag in
//! the page is the stylesheet placeholder.

use std::fmt::{self, Write};
use std::iter::{self, Peekable};
use std::sync::OnceLock;

use llvm_ir::{Function, Name};
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::annotate::{AnnotationWriter, FunctionInfo, ValueInfo, ValueKind};
use crate::loader::{LoadedModule, Value};
use crate::uses::{GlobalUses, LocalUses};

pub mod css;
pub mod formatted;

pub use css::{inline_css, STYLESHEET};
pub use formatted::{escape, FormattedWriter};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to format module")]
    Format(#[from] fmt::Error),
    #[error("bad value-reference pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrintOptions {
    /// Accepted for parity with `llvm-dis`. The C API prints without use
    /// list directives, so this changes nothing on the page.
    pub preserve_use_list_order: bool,
    /// False when only metadata was materialized: uses inside function
    /// bodies are not counted, and LLVM prints the functions as
    /// `; Materializable` with empty bodies.
    pub function_bodies: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            preserve_use_list_order: false,
            function_bodies: true,
        }
    }
}

/// `%name` and `@name` tokens inside instruction and constant text.
fn value_ref() -> Result<&'static Regex, Error> {
    static VALUE_REF: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    VALUE_REF
        .get_or_init(|| Regex::new(r#"[%@](?:[-a-zA-Z$._0-9]+|"[^"]*")"#))
        .as_ref()
        .map_err(|e| Error::Pattern(e.clone()))
}

/// Module-level lines that start with a keyword.
const KEYWORDS: [&str; 5] = [
    "source_filename",
    "target datalayout",
    "target triple",
    "attributes",
    "module asm",
];

/// Where the words before `global`, `constant`, `alias` or `ifunc` in a
/// global's definition end, counted from after ` = `.
fn global_keywords_end(rest: &str) -> Option<usize> {
    let mut end = 0;
    for word in rest.split(' ') {
        end += word.len();
        if matches!(word, "global" | "constant" | "alias" | "ifunc") {
            return Some(end);
        }
        let plain = word
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_()\"".contains(c));
        if !plain {
            return None;
        }
        end += 1;
    }
    None
}

fn starts_function(line: &str) -> bool {
    line.starts_with("define ")
        || line.starts_with("declare ")
        || line.starts_with("; Function Attrs:")
        || line.starts_with("; Materializable")
}

/// The first line of an instruction inside a function body.
fn is_instruction(line: &str) -> bool {
    line.strip_prefix("  ")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_whitespace() && c != ']')
}

/// Lines an instruction spills onto: `switch` cases and their closing
/// bracket, `landingpad` clauses.
fn is_continuation(line: &str) -> bool {
    line.starts_with("   ") || line.starts_with("  ]")
}

/// A `@name` token without the sigil or quotes.
fn global_name(token: &str) -> Option<&str> {
    let name = token.strip_prefix('@')?;
    Some(
        name.strip_prefix('"')
            .and_then(|n| n.strip_suffix('"'))
            .unwrap_or(name),
    )
}

type Annotator<'a, 'b> = &'a mut Option<&'b mut dyn AnnotationWriter>;

pub struct HtmlWriter<'m> {
    loaded: &'m LoadedModule,
    options: PrintOptions,
    uses: GlobalUses<'m>,
    /// Functions with an anchor on the page.
    defined: FxHashSet<&'m str>,
}

impl<'m> HtmlWriter<'m> {
    pub fn new(loaded: &'m LoadedModule, options: PrintOptions) -> Self {
        let module = &loaded.module;
        HtmlWriter {
            loaded,
            options,
            uses: GlobalUses::new(module, options.function_bodies),
            defined: module.functions.iter().map(|f| f.name.as_str()).collect(),
        }
    }

    /// Print the page into `body` and its stylesheet into `css`. The page
    /// links the stylesheet as `css_file_name`.
    pub fn print(
        &self,
        body: &mut String,
        css: &mut String,
        css_file_name: &str,
        mut annotator: Option<&mut dyn AnnotationWriter>,
    ) -> Result<(), Error> {
        let llvm = &self.loaded.llvm;
        let identifier = llvm.identifier();
        tracing::debug!(
            module = %identifier,
            preserve_use_list_order = self.options.preserve_use_list_order,
            annotated = annotator.is_some(),
            "printing module"
        );
        css.push_str(STYLESHEET);

        writeln!(body, "<!DOCTYPE html>")?;
        writeln!(body, "<html>")?;
        writeln!(body, "<head>")?;
        writeln!(body, "<meta charset=\"utf-8\">")?;
        writeln!(body, "<title>{}</title>", escape(&identifier))?;
        writeln!(
            body,
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\">",
            escape(css_file_name)
        )?;
        writeln!(body, "</head>")?;
        writeln!(body, "<body>")?;
        writeln!(body, "<pre class=\"module\">")?;

        let text = llvm.print_to_string();
        let mut lines = text.split_terminator('\n').peekable();
        let mut globals = llvm
            .global_variables()
            .into_iter()
            .chain(llvm.indirect_symbols());
        let mut functions = llvm.functions().into_iter();
        let mut out = FormattedWriter::new(body);
        while let Some(line) = lines.next() {
            if starts_function(line) {
                self.function(&mut out, line, &mut lines, functions.next(), &mut annotator)?;
            } else if line.starts_with('@') {
                self.global(&mut out, line, globals.next(), &mut annotator)?;
            } else {
                self.module_line(&mut out, line)?;
            }
        }

        writeln!(body, "</pre>")?;
        writeln!(body, "</body>")?;
        writeln!(body, "</html>")?;
        Ok(())
    }

    fn module_line(&self, out: &mut FormattedWriter<'_>, line: &str) -> Result<(), Error> {
        if line.starts_with(';') {
            out.span("comment", line);
        } else if let Some(keyword) = KEYWORDS.iter().find(|k| line.starts_with(*k)) {
            out.span("keyword", keyword);
            self.ir_text(out, &line[keyword.len()..])?;
        } else if let Some((name, body)) = line
            .split_once(" = type ")
            .filter(|(name, _)| name.starts_with('%'))
        {
            out.span("type", name);
            out.text(" = ");
            out.span("keyword", "type");
            out.text(" ");
            out.span(if body == "opaque" { "keyword" } else { "type" }, body);
        } else {
            self.ir_text(out, line)?;
        }
        out.text("\n");
        Ok(())
    }

    fn global(
        &self,
        out: &mut FormattedWriter<'_>,
        line: &str,
        value: Option<Value<'_>>,
        annotator: Annotator<'_, '_>,
    ) -> Result<(), Error> {
        match line.split_once(" = ") {
            Some((name, rest)) => {
                self.ir_text(out, name)?;
                out.text(" = ");
                let split = global_keywords_end(rest).unwrap_or(0);
                if split > 0 {
                    out.span("keyword", &rest[..split]);
                }
                self.ir_text(out, &rest[split..])?;
            }
            None => self.ir_text(out, line)?,
        }
        if let Some(value) = value {
            let info = ValueInfo {
                ty: Some(value.type_name()),
                uses: self.uses.get(&value.name()),
                kind: ValueKind::Global,
            };
            self.annotate(out, annotator, info)?;
        }
        out.text("\n");
        Ok(())
    }

    /// A function from its leading comments to its closing brace.
    fn function<'t>(
        &self,
        out: &mut FormattedWriter<'_>,
        first: &'t str,
        lines: &mut Peekable<impl Iterator<Item = &'t str>>,
        value: Option<Value<'_>>,
        annotator: Annotator<'_, '_>,
    ) -> Result<(), Error> {
        let name = value.map(|v| v.name());
        if let Some(name) = &name {
            self.function_annotation(out, name, annotator)?;
        }
        let mut header = first;
        while header.starts_with(';') {
            out.span("comment", header);
            out.text("\n");
            match lines.next() {
                Some(line) => header = line,
                None => return Ok(()),
            }
        }
        self.function_header(out, header, name.as_deref())?;
        out.text("\n");
        if !header.ends_with('{') {
            return Ok(());
        }

        let body = name
            .as_deref()
            .and_then(|n| self.loaded.module.get_func_by_name(n));
        let results = body.map(result_names).unwrap_or_default();
        let locals = body.map(LocalUses::new);
        let instructions = value.map(|v| v.instructions()).unwrap_or_default();
        let mut index = 0;
        while let Some(line) = lines.next() {
            if line == "}" {
                out.text("}\n");
                break;
            }
            if is_instruction(line) {
                self.ir_text(out, line)?;
                while let Some(spill) = lines.next_if(|l| is_continuation(l)) {
                    out.text("\n");
                    self.ir_text(out, spill)?;
                }
                if let Some(instruction) = instructions.get(index) {
                    let result = results.get(index).copied().flatten();
                    let info = ValueInfo {
                        ty: (!instruction.is_void()).then(|| instruction.type_name()),
                        uses: match (result, &locals) {
                            (Some(result), Some(locals)) => locals.get(result),
                            _ => 0,
                        },
                        kind: ValueKind::Instruction {
                            debug_loc: instruction.debug_location(),
                            debug_variable: instruction.debug_variable(),
                        },
                    };
                    self.annotate(out, annotator, info)?;
                }
                index += 1;
            } else {
                label_line(out, line);
            }
            out.text("\n");
        }
        Ok(())
    }

    /// `define` or `declare` and the rest of the signature. Definitions
    /// anchor their name.
    fn function_header(
        &self,
        out: &mut FormattedWriter<'_>,
        header: &str,
        name: Option<&str>,
    ) -> Result<(), Error> {
        let Some((keyword, rest)) = header.split_once(' ') else {
            return self.ir_text(out, header);
        };
        out.span("keyword", keyword);
        out.text(" ");
        let anchor = value_ref()?
            .find_iter(rest)
            .find(|m| m.as_str().starts_with('@'));
        let anchor = match anchor {
            Some(m) if keyword == "define" => m,
            _ => return self.ir_text(out, rest),
        };
        self.ir_text(out, &rest[..anchor.start()])?;
        let id = name.or_else(|| global_name(anchor.as_str())).unwrap_or_default();
        out.markup(&format!(
            "<span class=\"global\" id=\"fn-{}\">",
            escape(id)
        ));
        out.text(anchor.as_str());
        out.markup("</span>");
        self.ir_text(out, &rest[anchor.end()..])
    }

    fn function_annotation(
        &self,
        out: &mut FormattedWriter<'_>,
        name: &str,
        annotator: Annotator<'_, '_>,
    ) -> Result<(), Error> {
        if let Some(a) = annotator.as_deref_mut() {
            let info = FunctionInfo {
                name,
                uses: self.uses.get(name),
            };
            out.markup("<span class=\"annotation\">");
            a.emit_function_annot(&info, out)?;
            out.markup("</span>");
        }
        Ok(())
    }

    fn annotate(
        &self,
        out: &mut FormattedWriter<'_>,
        annotator: Annotator<'_, '_>,
        value: ValueInfo,
    ) -> Result<(), Error> {
        if let Some(a) = annotator.as_deref_mut() {
            out.markup("<span class=\"annotation\">");
            a.print_info_comment(&value, out)?;
            out.markup("</span>");
        }
        Ok(())
    }

    fn ir_text(&self, out: &mut FormattedWriter<'_>, text: &str) -> Result<(), Error> {
        highlight(out, text, &self.defined)
    }
}

/// The result names of a function's instructions and terminators, in the
/// order LLVM prints them.
fn result_names(function: &Function) -> Vec<Option<&Name>> {
    function
        .basic_blocks
        .iter()
        .flat_map(|block| {
            block
                .instrs
                .iter()
                .map(|i| i.try_get_result())
                .chain(iter::once(block.term.try_get_result()))
        })
        .collect()
}

/// A block label, with the predecessor comment LLVM pads after it.
fn label_line(out: &mut FormattedWriter<'_>, line: &str) {
    if line.is_empty() {
        return;
    }
    let (label, preds) = match line.find(';') {
        Some(at) => line.split_at(at),
        None => (line, ""),
    };
    let trimmed = label.trim_end();
    out.span("label", trimmed);
    out.text(&label[trimmed.len()..]);
    if !preds.is_empty() {
        out.span("comment", preds);
    }
}

/// IR text with value references highlighted. References to functions in
/// `defined` link to their definition.
fn highlight(
    out: &mut FormattedWriter<'_>,
    text: &str,
    defined: &FxHashSet<&str>,
) -> Result<(), Error> {
    let mut last = 0;
    for m in value_ref()?.find_iter(text) {
        out.text(&text[last..m.start()]);
        let token = m.as_str();
        match global_name(token) {
            Some(name) if defined.contains(name) => {
                out.markup(&format!("<a class=\"global\" href=\"#fn-{}\">", escape(name)));
                out.text(token);
                out.markup("</a>");
            }
            Some(_) => out.span("global", token),
            None => out.span("local", token),
        }
        last = m.end();
    }
    out.text(&text[last..]);
    Ok(())
}
