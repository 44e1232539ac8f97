// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};
use std::sync::OnceLock;

use regex::{NoExpand, Regex};

/// One rule per class the printer emits.
pub const STYLESHEET: &str = "\
body { background: #fdfdfd; color: #1d1f21; }
pre.module, pre.summary-index { font-family: monospace; font-size: 13px; }
.comment { color: #8e908c; }
.keyword { color: #8959a8; font-weight: bold; }
.global { color: #4271ae; }
.local { color: #c82829; }
.label { color: #f5871f; }
.type { color: #3e999f; }
.annotation { color: #718c00; font-style: italic; }
a.global { text-decoration: none; }
a.global:hover { text-decoration: underline; }
";

fn link_tag() -> io::Result<&'static Regex> {
    static LINK: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"<link\b[^>]*>"))
        .as_ref()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.clone()))
}

/// Write `body` to `out` with its first `<link ...>` tag replaced by a
/// `<style>` element holding `css`.
pub fn inline_css(out: &mut impl Write, body: &str, css: &str) -> io::Result<()> {
    let style = format!("<style> \n{css}</style> \n");
    let inlined = link_tag()?.replace(body, NoExpand(&style));
    out.write_all(inlined.as_bytes())
}
