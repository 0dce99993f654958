//! Built-in markdown subset.
//!
//! Input is tokenized into typed blocks first (fenced code, headings, lists,
//! plain lines) and inline nodes second, then rendered in one pass. Text in
//! code blocks and code spans never sees emphasis rules, and every piece of
//! user text is escaped exactly once.
//!
//! Supported: fenced code with optional language, inline code, `**strong**`,
//! `*emphasis*`, `#`..`###` headings, `-`/`*`/`+` bullets, `N.` numbered items.
//! Newlines between plain lines become `<br>`; newlines next to a block do not.

use super::{RenderError, RenderOptions, Renderer};
use crate::escape::push_escaped;

/// Renderer backed by [`parse`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackRenderer;

impl Renderer for FallbackRenderer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn render(&self, text: &str, _options: RenderOptions) -> Result<String, RenderError> {
        Ok(parse(text))
    }
}

/// Renders `text` to HTML with the built-in subset.
pub fn parse(text: &str) -> String {
    render_blocks(&tokenize(text))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Line(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Code { lang: Option<String>, body: String },
}

impl Block {
    fn is_line(&self) -> bool {
        matches!(self, Block::Line(_))
    }

    fn is_blank(&self) -> bool {
        matches!(self, Block::Line(content) if content
            .iter()
            .all(|node| matches!(node, Inline::Text(text) if text.trim().is_empty())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emph(Vec<Inline>),
}

fn tokenize(text: &str) -> Vec<Block> {
    let text = text.trim_end_matches(['\n', '\r']);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(lang) = fence_open(line)
            && let Some(close) = (i + 1..lines.len()).find(|&j| is_fence_close(lines[j]))
        {
            blocks.push(Block::Code {
                lang,
                body: lines[i + 1..close].join("\n"),
            });
            i = close + 1;
            continue;
        }

        if let Some((level, rest)) = heading(line) {
            blocks.push(Block::Heading {
                level,
                content: parse_inlines(rest),
            });
        } else if let Some((ordered, rest)) = list_item(line) {
            let item = parse_inlines(rest);
            match blocks.last_mut() {
                Some(Block::List {
                    ordered: prev,
                    items,
                }) if *prev == ordered => items.push(item),
                _ => blocks.push(Block::List {
                    ordered,
                    items: vec![item],
                }),
            }
        } else {
            blocks.push(Block::Line(parse_inlines(line)));
        }
        i += 1;
    }
    blocks
}

fn indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Returns `Some(lang)` when `line` opens a fence.
fn fence_open(line: &str) -> Option<Option<String>> {
    if indent(line) > 3 {
        return None;
    }
    let rest = line.trim_start().strip_prefix("```")?;
    let lang = rest.trim();
    if lang.contains('`') {
        return None;
    }
    Some((!lang.is_empty()).then(|| lang.to_string()))
}

fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    indent(line) <= 3 && trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.len() - line.trim_start_matches('#').len();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?.trim();
    if rest.is_empty() {
        return None;
    }
    u8::try_from(hashes).ok().map(|level| (level, rest))
}

fn list_item(line: &str) -> Option<(bool, &str)> {
    let trimmed = line.trim_start();
    if let Some(rest) = ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
    {
        return Some((false, rest.trim()));
    }
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix(". ")?;
    Some((true, rest.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Char(char),
    Code(String),
}

fn parse_inlines(line: &str) -> Vec<Inline> {
    strong_pass(&atomize(line))
}

/// Splits out code spans. A run of N backticks closes only on another run
/// of exactly N; unmatched runs stay literal.
fn atomize(line: &str) -> Vec<Atom> {
    let chars: Vec<char> = line.chars().collect();
    let mut atoms = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '`' {
            atoms.push(Atom::Char(chars[i]));
            i += 1;
            continue;
        }
        let run = backtick_run(&chars, i);
        let close = (i + run..chars.len()).find(|&j| {
            chars[j] == '`' && chars[j - 1] != '`' && backtick_run(&chars, j) == run
        });
        match close {
            Some(j) if j > i + run => {
                atoms.push(Atom::Code(chars[i + run..j].iter().collect()));
                i = j + run;
            }
            _ => {
                atoms.extend(chars[i..i + run].iter().copied().map(Atom::Char));
                i += run;
            }
        }
    }
    atoms
}

fn backtick_run(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|&&c| c == '`').count()
}

fn is_star(atoms: &[Atom], idx: usize) -> bool {
    matches!(atoms.get(idx), Some(Atom::Char('*')))
}

fn is_space(atom: &Atom) -> bool {
    matches!(atom, Atom::Char(c) if c.is_whitespace())
}

/// A delimiter of `width` stars at `i` that is followed by non-whitespace.
fn opens(atoms: &[Atom], i: usize, width: usize) -> bool {
    if !(0..width).all(|k| is_star(atoms, i + k)) {
        return false;
    }
    if !atoms.get(i + width).is_some_and(|a| !is_space(a)) {
        return false;
    }
    width != 1 || (!is_star(atoms, i + 1) && (i == 0 || !is_star(atoms, i - 1)))
}

/// Finds a closing delimiter after a non-empty, non-whitespace-ended run.
///
/// A `**` close inside a longer star run takes the last two stars, so the
/// leftover single star stays inside the span as an emphasis delimiter.
fn find_close(atoms: &[Atom], from: usize, width: usize) -> Option<usize> {
    let j = (from + 1..=atoms.len().saturating_sub(width)).find(|&j| {
        (0..width).all(|k| is_star(atoms, j + k))
            && !is_space(&atoms[j - 1])
            && (width != 1 || (!is_star(atoms, j - 1) && !is_star(atoms, j + 1)))
    })?;
    if width == 2 {
        let run = (j..atoms.len()).take_while(|&k| is_star(atoms, k)).count();
        return Some(j + run - 2);
    }
    Some(j)
}

fn strong_pass(atoms: &[Atom]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < atoms.len() {
        if opens(atoms, i, 2)
            && let Some(close) = find_close(atoms, i + 2, 2)
        {
            out.extend(emph_pass(&atoms[start..i]));
            out.push(Inline::Strong(emph_pass(&atoms[i + 2..close])));
            i = close + 2;
            start = i;
            continue;
        }
        i += 1;
    }
    out.extend(emph_pass(&atoms[start..]));
    out
}

fn emph_pass(atoms: &[Atom]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < atoms.len() {
        if opens(atoms, i, 1)
            && let Some(close) = find_close(atoms, i + 1, 1)
        {
            out.extend(plain(&atoms[start..i]));
            out.push(Inline::Emph(plain(&atoms[i + 1..close])));
            i = close + 1;
            start = i;
            continue;
        }
        i += 1;
    }
    out.extend(plain(&atoms[start..]));
    out
}

fn plain(atoms: &[Atom]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut text = String::new();
    for atom in atoms {
        match atom {
            Atom::Char(c) => text.push(*c),
            Atom::Code(code) => {
                if !text.is_empty() {
                    out.push(Inline::Text(std::mem::take(&mut text)));
                }
                out.push(Inline::Code(code.clone()));
            }
        }
    }
    if !text.is_empty() {
        out.push(Inline::Text(text));
    }
    out
}

fn render_blocks(blocks: &[Block]) -> String {
    let blocks = absorb_blank_lines(blocks);
    let mut out = String::new();
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 && blocks[idx - 1].is_line() && block.is_line() {
            out.push_str("<br>");
        }
        render_block(block, &mut out);
    }
    out
}

/// Drops runs of blank lines that touch a heading, list or code block.
fn absorb_blank_lines(blocks: &[Block]) -> Vec<&Block> {
    let mut keep = vec![true; blocks.len()];
    for (idx, block) in blocks.iter().enumerate() {
        if block.is_line() {
            continue;
        }
        let before = (0..idx).rev().take_while(|&j| blocks[j].is_blank());
        let after = (idx + 1..blocks.len()).take_while(|&j| blocks[j].is_blank());
        for j in before.chain(after) {
            keep[j] = false;
        }
    }
    blocks
        .iter()
        .zip(keep)
        .filter_map(|(block, kept)| kept.then_some(block))
        .collect()
}

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Line(content) => render_inlines(content, out),
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            render_inlines(content, out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            out.push_str(&format!("<{tag}>"));
            for item in items {
                out.push_str("<li>");
                render_inlines(item, out);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{tag}>"));
        }
        Block::Code { lang, body } => {
            match lang {
                Some(lang) => {
                    out.push_str("<pre><code class=\"language-");
                    push_escaped(out, lang);
                    out.push_str("\">");
                }
                None => out.push_str("<pre><code>"),
            }
            push_escaped(out, body);
            out.push_str("</code></pre>");
        }
    }
}

fn render_inlines(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => push_escaped(out, text),
            Inline::Code(code) => {
                out.push_str("<code>");
                push_escaped(out, code);
                out.push_str("</code>");
            }
            Inline::Strong(inner) => {
                out.push_str("<strong>");
                render_inlines(inner, out);
                out.push_str("</strong>");
            }
            Inline::Emph(inner) => {
                out.push_str("<em>");
                render_inlines(inner, out);
                out.push_str("</em>");
            }
        }
    }
}
