//! Best-effort text recovery from binary document containers.
//!
//! Legacy Office files and containers whose structured parse failed are
//! scanned with a chain of independent strategies:
//!
//! | Strategy | Looks for |
//! |----------|-----------|
//! | [`ascii_runs`] | maximal runs of printable ASCII (or tab) bytes |
//! | [`utf8_windows`] | 1 KiB windows that decode to readable UTF-8 |
//! | [`utf16_runs`] | little/big-endian UTF-16 pairs with one zero byte |
//!
//! Every candidate is admitted through [`is_meaningful`]. The combined output
//! is whitespace-collapsed and then stripped of Office noise (product and font
//! names, structural keywords) by [`strip_document_noise`].
//!
//! The thresholds below are tuning knobs for an inherently approximate
//! heuristic, not correctness guarantees.

use once_cell::sync::Lazy;
use regex::Regex;

/// Strategies stop being added once the combined text reaches this length.
pub const ENOUGH_TEXT_CHARS: usize = 50;
pub const MIN_MEANINGFUL_CHARS: usize = 3;
pub const MAX_DIGIT_RATIO: f64 = 0.7;
pub const MAX_SPECIAL_RATIO: f64 = 0.3;
/// Runs without whitespace must be longer than this to count as text.
pub const MIN_UNSPACED_CHARS: usize = 10;
pub const UTF8_WINDOW_BYTES: usize = 1024;
/// UTF-8 windows and UTF-16 runs must be longer than this.
pub const MIN_WIDE_RUN_CHARS: usize = 10;

pub const NO_TEXT_FOUND: &str = "[No readable text content found in document]";

const COMMON_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "this",
    "that", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "can", "project", "system", "data",
    "information", "document", "report", "analysis",
];

static SHOUTING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z\s\d.!?,;:]+$").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INLINE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static SPACED_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

static OFFICE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Microsoft\s+Word",
        r"(?i)Microsoft\s+Excel",
        r"(?i)Microsoft\s+Office",
        r"(?i)\b(Arial|Times|Calibri|Helvetica)\b",
        r"(?i)\b\d{1,2}pt\b",
        r"(?i)Normal\s+style",
        r"(?i)\b(Bold|Italic|Underline)\b",
        r"(?i)\[Content_Types\]",
        r"(?i)rels/",
        r"(?i)word/",
        r"(?i)xl/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WORD_STRUCTURE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)\bparagraph\b").unwrap(), "\n"),
        (Regex::new(r"(?i)\bsection\b").unwrap(), "\n"),
        (Regex::new(r"(?i)\bheading\b").unwrap(), ""),
    ]
});

static SHEET_STRUCTURE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)\bworksheet\b").unwrap(), "\n"),
        (Regex::new(r"(?i)\bsheet\b").unwrap(), "\n"),
        (Regex::new(r"(?i)\bcell\b").unwrap(), ""),
    ]
});

static WORD_TAG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)<w:t[^>]*>([^<]+)</w:t>").unwrap(),
        Regex::new(r"(?i)<text[^>]*>([^<]+)</text>").unwrap(),
        Regex::new(r">([^<>{}\[\]]+)<").unwrap(),
    ]
});

static SHEET_TAG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)<v>([^<]+)</v>").unwrap(),
        Regex::new(r"(?i)<t>([^<]+)</t>").unwrap(),
        Regex::new(r#"(?i)<c[^>]*r="[A-Z]+\d+"[^>]*>([^<]+)<"#).unwrap(),
    ]
});

/// Which family of document is being scanned. Controls the minimum ASCII
/// run length and the structural keyword cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    WordProcessing,
    Spreadsheet,
    Presentation,
}

impl DocumentKind {
    pub fn min_run_chars(&self) -> usize {
        match self {
            DocumentKind::WordProcessing => 4,
            DocumentKind::Spreadsheet => 3,
            DocumentKind::Presentation => 5,
        }
    }
}

/// Heuristic test separating natural-language text from binary noise.
pub fn is_meaningful(text: &str) -> bool {
    let len = text.chars().count();
    if len < MIN_MEANINGFUL_CHARS {
        return false;
    }

    let has_letters = text.chars().any(|c| c.is_ascii_alphabetic());
    let has_spaces = text.chars().any(char::is_whitespace);
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    let specials = text
        .chars()
        .filter(|c| {
            !(c.is_ascii_alphanumeric()
                || *c == '_'
                || c.is_whitespace()
                || matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        })
        .count();

    let not_too_many_digits = (digits as f64) < len as f64 * MAX_DIGIT_RATIO;
    let not_too_many_specials = (specials as f64) < len as f64 * MAX_SPECIAL_RATIO;
    let not_shouting = !SHOUTING_RE.is_match(text);

    has_letters
        && (has_spaces || len > MIN_UNSPACED_CHARS)
        && not_too_many_digits
        && not_too_many_specials
        && (not_shouting || has_common_word(text))
}

fn has_common_word(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .any(|w| {
            let lower = w.to_ascii_lowercase();
            COMMON_WORDS.contains(&lower.as_str())
        })
}

fn is_printable_ascii(b: u8) -> bool {
    (32..=126).contains(&b)
}

/// Strategy 1: maximal runs of printable ASCII or tab bytes.
pub fn ascii_runs(bytes: &[u8], min_len: usize) -> Vec<String> {
    let mut found = Vec::new();
    let mut run = String::new();
    let mut flush = |run: &mut String| {
        if run.len() >= min_len && is_meaningful(run) {
            found.push(run.trim().to_string());
        }
        run.clear();
    };

    for &b in bytes {
        if is_printable_ascii(b) || b == b'\t' {
            run.push(b as char);
        } else {
            flush(&mut run);
        }
    }
    flush(&mut run);
    found
}

/// Strategy 2: fixed windows decoded as lossy UTF-8 with everything outside
/// printable ASCII blanked.
pub fn utf8_windows(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(UTF8_WINDOW_BYTES)
        .filter_map(|window| {
            let decoded = String::from_utf8_lossy(window);
            let cleaned: String = decoded
                .chars()
                .map(|c| {
                    let keep = c.is_ascii()
                        && (is_printable_ascii(c as u8) || matches!(c, '\n' | '\r' | '\t'));
                    if keep {
                        c
                    } else {
                        ' '
                    }
                })
                .collect();
            let cleaned = cleaned.trim();
            (cleaned.len() > MIN_WIDE_RUN_CHARS && is_meaningful(cleaned))
                .then(|| cleaned.to_string())
        })
        .collect()
}

/// Strategy 3: runs of UTF-16 code units where one byte is zero and the
/// other printable ASCII, in either byte order.
pub fn utf16_runs(bytes: &[u8]) -> Vec<String> {
    let mut found = Vec::new();
    let mut run = String::new();
    let mut flush = |run: &mut String| {
        if run.len() > MIN_WIDE_RUN_CHARS && is_meaningful(run) {
            found.push(run.trim().to_string());
        }
        run.clear();
    };

    for pair in bytes.chunks_exact(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi == 0 && is_printable_ascii(lo) {
            run.push(lo as char);
        } else if lo == 0 && is_printable_ascii(hi) {
            run.push(hi as char);
        } else {
            flush(&mut run);
        }
    }
    flush(&mut run);
    found
}

/// Run the strategy chain and return cleaned text, or [`NO_TEXT_FOUND`].
pub fn extract_binary_text(bytes: &[u8], kind: DocumentKind) -> String {
    let mut hits = ascii_runs(bytes, kind.min_run_chars());

    if combined_len(&hits) < ENOUGH_TEXT_CHARS {
        hits.extend(utf8_windows(bytes));
    }
    if combined_len(&hits) < ENOUGH_TEXT_CHARS {
        hits.extend(utf16_runs(bytes));
    }

    let joined = hits
        .iter()
        .filter(|h| h.chars().count() > 2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
    let cleaned = strip_document_noise(collapsed.trim(), kind);

    if cleaned.is_empty() {
        NO_TEXT_FOUND.to_string()
    } else {
        cleaned
    }
}

fn combined_len(hits: &[String]) -> usize {
    if hits.is_empty() {
        return 0;
    }
    hits.iter().map(|h| h.chars().count()).sum::<usize>() + hits.len() - 1
}

/// Remove Office product/font noise and turn structural keywords into line
/// breaks for word-processing and spreadsheet content.
pub fn strip_document_noise(text: &str, kind: DocumentKind) -> String {
    let mut out = text.to_string();
    for re in OFFICE_NOISE.iter() {
        out = re.replace_all(&out, "").into_owned();
    }

    let structure: &[(Regex, &str)] = match kind {
        DocumentKind::WordProcessing => &WORD_STRUCTURE,
        DocumentKind::Spreadsheet => &SHEET_STRUCTURE,
        DocumentKind::Presentation => &[],
    };
    for (re, replacement) in structure {
        out = re.replace_all(&out, *replacement).into_owned();
    }

    let out = INLINE_SPACE_RE.replace_all(&out, " ");
    let out = SPACED_NEWLINE_RE.replace_all(&out, "\n");
    let out = BLANK_LINES_RE.replace_all(&out, "\n");
    out.trim().to_string()
}

/// Scan undecoded container bytes for text inside XML-looking tags.
///
/// Word-processing content collects `<w:t>`, `<text>` and any `>…<` runs
/// (joined by spaces); spreadsheet content collects `<v>`, `<t>` and
/// addressed `<c r="A1">` cells (joined by ` | `).
pub fn xml_tag_text(bytes: &[u8], kind: DocumentKind) -> String {
    let content = String::from_utf8_lossy(bytes);
    let (patterns, min_len, separator) = match kind {
        DocumentKind::Spreadsheet => (&*SHEET_TAG_PATTERNS, 1, " | "),
        _ => (&*WORD_TAG_PATTERNS, 3, " "),
    };

    let mut texts = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(&content) {
            let text = &caps[1];
            if text.chars().count() > min_len && is_meaningful(text) {
                texts.push(text.trim().to_string());
            }
        }
    }
    texts.join(separator).trim().to_string()
}
