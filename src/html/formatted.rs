// SPDX-License-Identifier: BSD-3-Clause
use std::borrow::Cow;
use std::fmt;

const TAB_STOP: usize = 8;

fn entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// `text` with HTML special characters replaced by entities. Safe in
/// element content and in double-quoted attribute values.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| entity(c).is_some()) {
        return Cow::Borrowed(text);
    }
    let mut s = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match entity(c) {
            Some(e) => s.push_str(e),
            None => s.push(c),
        }
    }
    Cow::Owned(s)
}

/// A text sink that knows which column the reader will see. IR text is
/// HTML-escaped on the way in, and markup does not move the column, so
/// padding lines up in the rendered page.
#[derive(Debug)]
pub struct FormattedWriter<'a> {
    out: &'a mut String,
    column: usize,
}

impl<'a> FormattedWriter<'a> {
    pub fn new(out: &'a mut String) -> Self {
        FormattedWriter { out, column: 0 }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Raw HTML; must not contain newlines meant as visible line breaks.
    pub fn markup(&mut self, html: &str) {
        self.out.push_str(html);
    }

    /// Visible text, escaped.
    pub fn text(&mut self, text: &str) {
        for c in text.chars() {
            match entity(c) {
                Some(e) => self.out.push_str(e),
                None => self.out.push(c),
            }
            self.column = match c {
                '\n' | '\r' => 0,
                '\t' => (self.column / TAB_STOP + 1) * TAB_STOP,
                _ => self.column + 1,
            };
        }
    }

    /// Pad with spaces up to `column`. At least one space is written, even
    /// when already past it.
    pub fn pad_to_column(&mut self, column: usize) {
        let n = column.saturating_sub(self.column).max(1);
        for _ in 0..n {
            self.out.push(' ');
        }
        self.column += n;
    }

    /// Visible text wrapped in `<span class="class">`.
    pub fn span(&mut self, class: &str, text: &str) {
        self.out.push_str("<span class=\"");
        self.out.push_str(class);
        self.out.push_str("\">");
        self.text(text);
        self.out.push_str("</span>");
    }
}

impl fmt::Write for FormattedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text(s);
        Ok(())
    }
}
