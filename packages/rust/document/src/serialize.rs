//! Markup output through html5ever's serializer.
//!
//! One adjustment on top of `HtmlSerializer`: the parser drops a single
//! leading newline inside `pre`, `textarea` and `listing`, so one is written
//! back whenever their text starts with a newline. Without it every
//! parse/serialize round trip would eat a line.

use std::io::{self, Write};

use html5ever::QualName;
use html5ever::serialize::{AttrRef, HtmlSerializer, Serialize, SerializeOpts, Serializer};

pub(crate) use html5ever::serialize::TraversalScope;

use crate::HTML_NAMESPACE;

/// Elements whose first newline is swallowed by the parser.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

pub(crate) fn to_markup<T: Serialize>(node: &T, traversal_scope: TraversalScope) -> String {
    let opts = SerializeOpts {
        // Matches the parser, which treats <noscript> content as raw text.
        scripting_enabled: true,
        traversal_scope: traversal_scope.clone(),
        create_missing_parent: false,
    };

    let mut buf = Vec::new();
    let mut serializer = PageSerializer {
        inner: HtmlSerializer::new(&mut buf, opts),
        restore_newline: false,
    };
    // Writes go to an in-memory buffer and cannot fail.
    let _ = node.serialize(&mut serializer, traversal_scope);
    drop(serializer);

    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

struct PageSerializer<W: Write> {
    inner: HtmlSerializer<W>,
    restore_newline: bool,
}

impl<W: Write> Serializer for PageSerializer<W> {
    fn start_elem<'a, AttrIter>(&mut self, name: QualName, attrs: AttrIter) -> io::Result<()>
    where
        AttrIter: Iterator<Item = AttrRef<'a>>,
    {
        self.restore_newline = &*name.ns == HTML_NAMESPACE
            && LEADING_NEWLINE_ELEMENTS.contains(&&*name.local);
        self.inner.start_elem(name, attrs)
    }

    fn end_elem(&mut self, name: QualName) -> io::Result<()> {
        self.restore_newline = false;
        self.inner.end_elem(name)
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if std::mem::take(&mut self.restore_newline) && text.starts_with('\n') {
            self.inner.writer.write_all(b"\n")?;
        }
        self.inner.write_text(text)
    }

    fn write_comment(&mut self, text: &str) -> io::Result<()> {
        self.restore_newline = false;
        self.inner.write_comment(text)
    }

    fn write_doctype(&mut self, name: &str) -> io::Result<()> {
        self.inner.write_doctype(name)
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()> {
        self.restore_newline = false;
        self.inner.write_processing_instruction(target, data)
    }
}

/// Escape text for building markup by hand; same rules as html5ever's text output.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value for a double-quoted attribute; same rules as html5ever's attribute output.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_text_handles_markup_chars() {
        assert_eq!(escape_text("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_text("x\u{a0}y"), "x&nbsp;y");
    }

    #[test]
    fn escape_attr_only_touches_quotes_and_amp() {
        assert_eq!(escape_attr(r#"say "hi" <now> & then"#), "say &quot;hi&quot; <now> &amp; then");
    }
}
