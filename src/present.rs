//! Presentation layer for tokenized messages.
//!
//! Maps [`BlockNode`]s to a presentation tree of [`Element`]s with inline
//! spans already applied, builds per-message views (assistant content is
//! rendered, user content is shown verbatim) and serializes the tree to HTML
//! for hosts that display markup.
//!
//! Copy-to-clipboard is exposed as a [`CopyAction`] carrying its payload; the
//! host performs it through its own [`Clipboard`] implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::inline::{self, InlineSpan};
use crate::models::Role;
use crate::tokenize::{self, BlockNode};

/// Label shown on code blocks without a language tag.
pub const DEFAULT_CODE_LABEL: &str = "text";
const SAFE_LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Six discrete heading sizes, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSize {
    ExtraExtraLarge,
    ExtraLarge,
    Large,
    Medium,
    Base,
    Small,
}

impl TextSize {
    pub fn for_level(level: u8) -> Self {
        match level.clamp(1, 6) {
            1 => TextSize::ExtraExtraLarge,
            2 => TextSize::ExtraLarge,
            3 => TextSize::Large,
            4 => TextSize::Medium,
            5 => TextSize::Base,
            _ => TextSize::Small,
        }
    }

    /// HTML heading tag for this step.
    pub fn tag(&self) -> &'static str {
        match self {
            TextSize::ExtraExtraLarge => "h1",
            TextSize::ExtraLarge => "h2",
            TextSize::Large => "h3",
            TextSize::Medium => "h4",
            TextSize::Base => "h5",
            TextSize::Small => "h6",
        }
    }
}

/// Host-provided clipboard.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// A copy-to-clipboard action attached to a code block or a whole message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyAction {
    pub payload: String,
}

impl CopyAction {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn perform(&self, clipboard: &mut dyn Clipboard) -> anyhow::Result<()> {
        clipboard.write_text(&self.payload)
    }
}

/// Presentation tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Heading {
        size: TextSize,
        content: Vec<InlineSpan>,
    },
    CodeBlock {
        label: String,
        text: String,
        copy: CopyAction,
    },
    Quote {
        content: Vec<InlineSpan>,
    },
    Table {
        header: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
    List {
        ordered: bool,
        items: Vec<Vec<InlineSpan>>,
    },
    Paragraph {
        content: Vec<InlineSpan>,
    },
}

/// Map block nodes to presentation elements.
///
/// Blocks with nothing to show (empty text, a table without cells, a list
/// without items) are dropped.
pub fn present(blocks: &[BlockNode]) -> Vec<Element> {
    blocks.iter().filter_map(present_block).collect()
}

fn present_block(block: &BlockNode) -> Option<Element> {
    match block {
        BlockNode::Header { level, text } => non_empty(text).map(|t| Element::Heading {
            size: TextSize::for_level(*level),
            content: inline::format(t),
        }),
        BlockNode::Code { lang, text } => Some(Element::CodeBlock {
            label: lang
                .clone()
                .unwrap_or_else(|| DEFAULT_CODE_LABEL.to_string()),
            text: text.clone(),
            copy: CopyAction::new(text.clone()),
        }),
        BlockNode::Blockquote { text } => non_empty(text).map(|t| Element::Quote {
            content: inline::format(t),
        }),
        BlockNode::Table { header, rows } => {
            if header.is_empty() && rows.iter().all(|r| r.is_empty()) {
                return None;
            }
            Some(Element::Table {
                header: header.iter().map(|c| inline::format(c)).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|c| inline::format(c)).collect())
                    .collect(),
            })
        }
        BlockNode::List { ordered, items } => {
            if items.is_empty() {
                return None;
            }
            Some(Element::List {
                ordered: *ordered,
                items: items.iter().map(|i| inline::format(i)).collect(),
            })
        }
        BlockNode::Paragraph { text } => non_empty(text).map(|t| Element::Paragraph {
            content: inline::format(t),
        }),
    }
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.trim().is_empty()).then_some(text)
}

/// Rendered message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Rich { elements: Arc<[Element]> },
    Verbatim { text: String },
}

/// One chat bubble ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub role: Role,
    pub body: MessageBody,
    /// Whole-message copy, offered on assistant messages only.
    pub copy: Option<CopyAction>,
}

/// Memoizes presentation trees by content hash.
///
/// The cache is cleared wholesale once it reaches capacity.
pub struct RenderCache {
    capacity: usize,
    entries: HashMap<String, Arc<[Element]>>,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tokenize and present `content`, reusing an earlier result when the
    /// same content was rendered before.
    pub fn render(&mut self, content: &str) -> Arc<[Element]> {
        let key = content_key(content);
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit);
        }
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        let elements: Arc<[Element]> = present(&tokenize::tokenize(content)).into();
        self.entries.insert(key, Arc::clone(&elements));
        elements
    }

    pub fn message_view(&mut self, role: Role, content: &str) -> MessageView {
        match role {
            Role::Assistant => MessageView {
                role,
                body: MessageBody::Rich {
                    elements: self.render(content),
                },
                copy: Some(CopyAction::new(content)),
            },
            Role::User => MessageView {
                role,
                body: MessageBody::Verbatim {
                    text: content.to_string(),
                },
                copy: None,
            },
        }
    }
}

fn content_key(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Serialize elements to an HTML fragment.
pub fn to_html(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        match element {
            Element::Heading { size, content } => {
                let tag = size.tag();
                out.push_str(&format!("<{}>{}</{}>\n", tag, spans_html(content), tag));
            }
            Element::CodeBlock { label, text, .. } => {
                out.push_str(&format!(
                    "<figure class=\"code\"><figcaption>{}</figcaption><pre><code>{}</code></pre></figure>\n",
                    escape_html(label),
                    escape_html(text)
                ));
            }
            Element::Quote { content } => {
                out.push_str(&format!(
                    "<blockquote>{}</blockquote>\n",
                    spans_html(content).replace('\n', "<br>")
                ));
            }
            Element::Table { header, rows } => {
                out.push_str("<table>\n<thead><tr>");
                for cell in header {
                    out.push_str(&format!("<th>{}</th>", spans_html(cell)));
                }
                out.push_str("</tr></thead>\n<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&format!("<td>{}</td>", spans_html(cell)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
            Element::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                out.push_str(&format!("<{}>\n", tag));
                for item in items {
                    out.push_str(&format!("<li>{}</li>\n", spans_html(item)));
                }
                out.push_str(&format!("</{}>\n", tag));
            }
            Element::Paragraph { content } => {
                out.push_str(&format!(
                    "<p>{}</p>\n",
                    spans_html(content).replace('\n', "<br>")
                ));
            }
        }
    }
    out
}

/// HTML for a whole chat bubble. User text is escaped and kept verbatim.
pub fn view_to_html(view: &MessageView) -> String {
    let role = match view.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let body = match &view.body {
        MessageBody::Rich { elements } => to_html(elements),
        MessageBody::Verbatim { text } => {
            format!("<p class=\"verbatim\">{}</p>\n", escape_html(text).replace('\n', "<br>"))
        }
    };
    let copy = if view.copy.is_some() {
        "<button class=\"copy\">Copy</button>\n"
    } else {
        ""
    };
    format!("<div class=\"message {}\">\n{}{}</div>\n", role, body, copy)
}

fn spans_html(spans: &[InlineSpan]) -> String {
    spans
        .iter()
        .map(|span| match span {
            InlineSpan::Code { text } => format!("<code>{}</code>", escape_html(text)),
            InlineSpan::Link { url, content, .. } if is_safe_href(url) => format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                escape_html(url),
                spans_html(content)
            ),
            InlineSpan::Link { content, .. } => spans_html(content),
            InlineSpan::Bold { text } => format!("<strong>{}</strong>", escape_html(text)),
            InlineSpan::Italic { text } => format!("<em>{}</em>", escape_html(text)),
            InlineSpan::Strikethrough { text } => format!("<del>{}</del>", escape_html(text)),
            InlineSpan::Plain { text } => escape_html(text),
        })
        .collect()
}

/// Only absolute `http`, `https` and `mailto` URLs become anchors.
fn is_safe_href(url: &str) -> bool {
    let Some((scheme, _)) = url.trim().split_once(':') else {
        return false;
    };
    SAFE_LINK_SCHEMES
        .iter()
        .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
