//! Inline span formatter.
//!
//! Splits a block's raw text into styled [`InlineSpan`]s by running an
//! ordered list of matcher stages: inline code, links, strikethrough, bold,
//! italic. Each stage scans the text it is handed with a cursor, emits a span
//! for every match and passes the unmatched gaps to the next stage. Whatever
//! survives the last stage becomes a plain span.
//!
//! Only link labels are formatted recursively. A label cannot contain another
//! link (`]` ends it), so the recursion is at most one level deep.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static STRIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+)~~").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

/// One styled run of text within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineSpan {
    Code {
        text: String,
    },
    /// `text` is the raw label; `content` is the label formatted again.
    Link {
        text: String,
        url: String,
        content: Vec<InlineSpan>,
    },
    Bold {
        text: String,
    },
    Italic {
        text: String,
    },
    Strikethrough {
        text: String,
    },
    Plain {
        text: String,
    },
}

impl InlineSpan {
    /// Visible text of the span with delimiters removed.
    pub fn literal(&self) -> &str {
        match self {
            InlineSpan::Code { text }
            | InlineSpan::Link { text, .. }
            | InlineSpan::Bold { text }
            | InlineSpan::Italic { text }
            | InlineSpan::Strikethrough { text }
            | InlineSpan::Plain { text } => text,
        }
    }
}

struct Stage {
    pattern: &'static Lazy<Regex>,
    /// Segments failing the guard skip this stage untouched.
    applies: fn(&str) -> bool,
    build: fn(&Captures<'_>) -> InlineSpan,
}

static STAGES: [Stage; 5] = [
    Stage {
        pattern: &CODE_RE,
        applies: always,
        build: |c| InlineSpan::Code {
            text: c[1].to_string(),
        },
    },
    Stage {
        pattern: &LINK_RE,
        applies: always,
        build: |c| InlineSpan::Link {
            text: c[1].to_string(),
            url: c[2].to_string(),
            content: format(&c[1]),
        },
    },
    Stage {
        pattern: &STRIKE_RE,
        applies: always,
        build: |c| InlineSpan::Strikethrough {
            text: c[1].to_string(),
        },
    },
    Stage {
        pattern: &BOLD_RE,
        applies: always,
        build: |c| InlineSpan::Bold {
            text: c[1].to_string(),
        },
    },
    Stage {
        pattern: &ITALIC_RE,
        applies: |s| !s.contains("**"),
        build: |c| InlineSpan::Italic {
            text: c[1].to_string(),
        },
    },
];

fn always(_: &str) -> bool {
    true
}

/// Format a block's text into inline spans, preserving left-to-right order.
///
/// Pure and deterministic. Empty input yields no spans.
pub fn format(text: &str) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    run_stage(0, text, &mut out);
    out
}

fn run_stage(index: usize, segment: &str, out: &mut Vec<InlineSpan>) {
    if segment.is_empty() {
        return;
    }
    let Some(stage) = STAGES.get(index) else {
        out.push(InlineSpan::Plain {
            text: segment.to_string(),
        });
        return;
    };
    if !(stage.applies)(segment) {
        run_stage(index + 1, segment, out);
        return;
    }

    let mut cursor = 0;
    for caps in stage.pattern.captures_iter(segment) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        run_stage(index + 1, &segment[cursor..whole.start()], out);
        out.push((stage.build)(&caps));
        cursor = whole.end();
    }
    run_stage(index + 1, &segment[cursor..], out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> InlineSpan {
        InlineSpan::Plain {
            text: s.to_string(),
        }
    }

    #[test]
    fn mixed_emphasis_and_code_in_order() {
        let spans = format("**bold** and *italic* and `code`");
        assert_eq!(
            spans,
            vec![
                InlineSpan::Bold {
                    text: "bold".to_string()
                },
                plain(" and "),
                InlineSpan::Italic {
                    text: "italic".to_string()
                },
                plain(" and "),
                InlineSpan::Code {
                    text: "code".to_string()
                },
            ]
        );
    }

    #[test]
    fn code_content_is_verbatim() {
        assert_eq!(
            format("`**not bold**`"),
            vec![InlineSpan::Code {
                text: "**not bold**".to_string()
            }]
        );
    }

    #[test]
    fn link_label_is_formatted() {
        let spans = format("see [**docs**](https://example.com) now");
        assert_eq!(
            spans,
            vec![
                plain("see "),
                InlineSpan::Link {
                    text: "**docs**".to_string(),
                    url: "https://example.com".to_string(),
                    content: vec![InlineSpan::Bold {
                        text: "docs".to_string()
                    }],
                },
                plain(" now"),
            ]
        );
    }

    #[test]
    fn strikethrough_is_literal() {
        assert_eq!(
            format("~~*gone*~~"),
            vec![InlineSpan::Strikethrough {
                text: "*gone*".to_string()
            }]
        );
    }

    #[test]
    fn italic_skipped_when_double_star_remains() {
        assert_eq!(format("**a*b**"), vec![plain("**a*b**")]);
    }

    #[test]
    fn unmatched_delimiters_stay_plain() {
        assert_eq!(format("a ` b * c ~~ d"), vec![plain("a ` b * c ~~ d")]);
        assert!(format("").is_empty());
    }

    #[test]
    fn spans_partition_the_input() {
        let input = "x `c` [l *i*](u) ~~s~~ **b** *i* y";
        let spans = format(input);
        let rebuilt: String = spans
            .iter()
            .map(|span| {
                let text = span.literal();
                match span {
                    InlineSpan::Code { .. } => format!("`{}`", text),
                    InlineSpan::Link { url, .. } => format!("[{}]({})", text, url),
                    InlineSpan::Strikethrough { .. } => format!("~~{}~~", text),
                    InlineSpan::Bold { .. } => format!("**{}**", text),
                    InlineSpan::Italic { .. } => format!("*{}*", text),
                    InlineSpan::Plain { .. } => text.to_string(),
                }
            })
            .collect();
        assert_eq!(rebuilt, input);

        let visible: String = spans.iter().map(InlineSpan::literal).collect();
        assert_eq!(visible, "x c l *i* s b i y");
    }
}
