//! Block-level tokenizer for chat message content.
//!
//! Turns a message string into a flat sequence of [`BlockNode`]s in a single
//! left-to-right pass over its lines. Recognition order at each line is:
//! fenced code, header, blockquote, table, list, paragraph. The first match
//! wins and consumes as many lines as the construct needs.
//!
//! Tokenizing is total: any line that is not part of a recognized construct
//! ends up in a paragraph, so malformed markdown renders as plain text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6}) +(.*)$").unwrap());
static TABLE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|?[:\- ]+\|[:\- ]+").unwrap());
static UNORDERED_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+").unwrap());
static ORDERED_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+").unwrap());
static QUOTE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>[ \t]?").unwrap());

const FENCE: &str = "```";

/// One structural unit of parsed message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockNode {
    Header {
        level: u8,
        text: String,
    },
    Code {
        lang: Option<String>,
        text: String,
    },
    Blockquote {
        text: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Paragraph {
        text: String,
    },
}

/// Tokenize message content into block nodes.
///
/// `\r\n` is normalized to `\n` first. Blank lines separate blocks and are
/// never emitted. Empty content yields an empty vector.
pub fn tokenize(content: &str) -> Vec<BlockNode> {
    if content.is_empty() {
        return Vec::new();
    }

    let normalized = content.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut cursor = LineCursor { lines: &lines, pos: 0 };
    let mut nodes = Vec::new();

    while let Some(line) = cursor.peek() {
        if line.trim().is_empty() {
            cursor.pos += 1;
            continue;
        }

        let node = if line.starts_with(FENCE) {
            cursor.code_block()
        } else if let Some(node) = cursor.header() {
            node
        } else if is_quote_line(line) {
            cursor.blockquote()
        } else if cursor.at_table() {
            cursor.table()
        } else if is_list_item(line) {
            cursor.list()
        } else {
            cursor.paragraph()
        };
        nodes.push(node);
    }

    nodes
}

struct LineCursor<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<&'a str> {
        self.lines.get(self.pos + offset).copied()
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    /// An unterminated fence runs to end of input.
    fn code_block(&mut self) -> BlockNode {
        let opening = self.next_line().unwrap_or_default();
        let lang = opening.get(FENCE.len()..).unwrap_or_default().trim();
        let lang = (!lang.is_empty()).then(|| lang.to_string());

        let mut body = Vec::new();
        while let Some(line) = self.peek() {
            if line.starts_with(FENCE) {
                self.pos += 1;
                break;
            }
            body.push(line);
            self.pos += 1;
        }

        BlockNode::Code {
            lang,
            text: body.join("\n"),
        }
    }

    fn header(&mut self) -> Option<BlockNode> {
        let caps = HEADER_RE.captures(self.peek()?)?;
        let level = caps[1].len() as u8;
        let text = caps[2].to_string();
        self.pos += 1;
        Some(BlockNode::Header { level, text })
    }

    /// Blank lines inside a quote are consumed but not kept.
    fn blockquote(&mut self) -> BlockNode {
        let mut quoted = Vec::new();
        while let Some(line) = self.peek() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('>') {
                quoted.push(QUOTE_MARKER_RE.replace(trimmed, "").into_owned());
            } else if !line.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
        BlockNode::Blockquote {
            text: quoted.join("\n"),
        }
    }

    fn at_table(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(line), Some(next)) => line.contains('|') && TABLE_SEPARATOR_RE.is_match(next),
            _ => false,
        }
    }

    fn table(&mut self) -> BlockNode {
        let mut table_lines = Vec::new();
        while let Some(line) = self.peek() {
            if !line.contains('|') {
                break;
            }
            table_lines.push(line);
            self.pos += 1;
        }

        let header = table_lines.first().map(|l| split_cells(l)).unwrap_or_default();
        let rows = table_lines.iter().skip(2).map(|l| split_cells(l)).collect();
        BlockNode::Table { header, rows }
    }

    fn list(&mut self) -> BlockNode {
        let ordered = self.peek().map(is_ordered_item).unwrap_or(false);
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            if !is_list_item(line) {
                break;
            }
            items.push(strip_list_marker(line));
            self.pos += 1;
        }
        BlockNode::List { ordered, items }
    }

    /// The first line is always taken; later lines stop at anything that
    /// would open another block.
    fn paragraph(&mut self) -> BlockNode {
        let mut para = Vec::new();
        if let Some(first) = self.next_line() {
            para.push(first);
        }
        while let Some(line) = self.peek() {
            if line.trim().is_empty() || self.starts_block() {
                break;
            }
            para.push(line);
            self.pos += 1;
        }
        BlockNode::Paragraph {
            text: para.join("\n"),
        }
    }

    fn starts_block(&self) -> bool {
        let Some(line) = self.peek() else {
            return false;
        };
        line.starts_with(FENCE)
            || HEADER_RE.is_match(line)
            || is_quote_line(line)
            || self.at_table()
            || is_list_item(line)
    }
}

fn is_quote_line(line: &str) -> bool {
    line.trim().starts_with('>')
}

fn is_ordered_item(line: &str) -> bool {
    ORDERED_ITEM_RE.is_match(line)
}

fn is_list_item(line: &str) -> bool {
    UNORDERED_ITEM_RE.is_match(line) || ORDERED_ITEM_RE.is_match(line)
}

fn strip_list_marker(line: &str) -> String {
    if let Some(m) = UNORDERED_ITEM_RE.find(line) {
        return line[m.end()..].to_string();
    }
    if let Some(m) = ORDERED_ITEM_RE.find(line) {
        return line[m.end()..].to_string();
    }
    line.to_string()
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}
