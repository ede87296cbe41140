//! Fixture markup reader. Covers what form rows are written with: elements,
//! attributes, text and `<textarea>` bodies. Comments and `<!DOCTYPE>` are
//! skipped; unknown end tags are ignored and open elements are closed at end
//! of input.

use super::*;
use std::collections::BTreeMap;

pub(super) fn parse_html(src: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut open = vec![dom.root()];
    let mut cursor = Cursor { src, pos: 0 };

    while !cursor.rest().is_empty() {
        if cursor.eat("<!--") {
            cursor.skip_past("-->", "comment is never closed")?;
        } else if cursor.eat("</") {
            let tag = cursor.name();
            cursor.skip_past(">", "end tag is never closed")?;
            if let Some(depth) = open
                .iter()
                .rposition(|node| dom.tag_name(*node) == Some(tag.as_str()))
            {
                open.truncate(depth);
            }
        } else if cursor.eat("<!") {
            cursor.skip_past(">", "declaration is never closed")?;
        } else if cursor.at_start_tag() {
            let parent = current(&open)?;
            let start = cursor.start_tag()?;
            let keep_open = !start.self_closing && !dom::is_void_element(&start.tag);
            let is_textarea = start.tag == "textarea";
            let node = dom.add_element(parent, start.tag, start.attrs);
            if is_textarea && keep_open {
                let body = cursor.textarea_body()?;
                dom.set_value(node, &body)?;
                if !body.is_empty() {
                    dom.add_text(node, body);
                }
            } else if keep_open {
                open.push(node);
            }
        } else {
            let text = decode_entities(cursor.text());
            dom.add_text(current(&open)?, text);
        }
    }

    Ok(dom)
}

fn current(open: &[NodeId]) -> Result<NodeId> {
    open.last().copied().ok_or_else(|| Error::HtmlParse {
        offset: 0,
        reason: "no open element".into(),
    })
}

struct StartTag {
    tag: String,
    attrs: BTreeMap<String, String>,
    self_closing: bool,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::HtmlParse {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn eat(&mut self, prefix: &str) -> bool {
        let hit = self.rest().starts_with(prefix);
        if hit {
            self.pos += prefix.len();
        }
        hit
    }

    fn bump(&mut self) {
        self.pos += self.rest().chars().next().map_or(0, char::len_utf8);
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !keep(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Returns what precedes `end` and moves past it.
    fn take_until(&mut self, end: &str, reason: &str) -> Result<&'a str> {
        let rest = self.rest();
        let found = rest.find(end).ok_or_else(|| self.fail(reason))?;
        self.pos += found + end.len();
        Ok(&rest[..found])
    }

    fn skip_past(&mut self, end: &str, reason: &str) -> Result<()> {
        self.take_until(end, reason).map(drop)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    fn name(&mut self) -> String {
        self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .to_ascii_lowercase()
    }

    fn at_start_tag(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        self.eat("<");
        let tag = self.name();
        let mut attrs = BTreeMap::new();
        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(StartTag {
                    tag,
                    attrs,
                    self_closing: true,
                });
            }
            if self.eat(">") {
                return Ok(StartTag {
                    tag,
                    attrs,
                    self_closing: false,
                });
            }
            if self.rest().is_empty() {
                return Err(self.fail(format!("<{tag}> is never closed")));
            }
            let name = self.name();
            if name.is_empty() {
                // stray character such as a lone quote
                self.bump();
                continue;
            }
            self.skip_whitespace();
            let value = if self.eat("=") {
                self.skip_whitespace();
                self.attr_value()?
            } else {
                String::new()
            };
            attrs.entry(name).or_insert(value);
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        let raw = if self.eat("\"") {
            self.take_until("\"", "attribute value is missing its closing quote")?
        } else if self.eat("'") {
            self.take_until("'", "attribute value is missing its closing quote")?
        } else {
            let raw = self.take_while(|c| !c.is_ascii_whitespace() && c != '>');
            match raw.strip_suffix('/') {
                Some(trimmed) if self.rest().starts_with('>') => {
                    self.pos -= 1;
                    trimmed
                }
                _ => raw,
            }
        };
        Ok(decode_entities(raw))
    }

    /// Raw text up to `</textarea`, with the end tag consumed. A newline right
    /// after the start tag is not part of the value.
    fn textarea_body(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .to_ascii_lowercase()
            .find("</textarea")
            .ok_or_else(|| self.fail("<textarea> is never closed"))?;
        self.pos += end;
        self.skip_past(">", "end tag is never closed")?;

        let raw = &rest[..end];
        let raw = raw
            .strip_prefix("\r\n")
            .or_else(|| raw.strip_prefix('\n'))
            .unwrap_or(raw);
        Ok(decode_entities(raw))
    }

    /// Text up to the next `<`. A `<` that opens no tag is kept as text.
    fn text(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '<')
            .map_or(rest.len(), |(index, _)| index);
        self.pos += end;
        &rest[..end]
    }
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match character_reference(rest) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes the reference at the start of `text` (which begins with `&`),
/// returning the character and how many bytes it spans.
fn character_reference(text: &str) -> Option<(char, usize)> {
    let semi = text.find(';')?;
    let ch = match &text[1..semi] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        other => {
            let number = other.strip_prefix('#')?;
            let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, semi + 1))
}
