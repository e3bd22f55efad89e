//! Per-format text extraction.
//!
//! The ingestor supplies raw bytes and the [`FileFormat`] picked by the
//! classifier; this module returns plain UTF-8 text. Extraction degrades
//! instead of failing: container formats fall through structured parsing,
//! XML tag scans and the binary heuristics in [`crate::binary_text`] before
//! settling on a placeholder. Only two paths surface an error:
//!
//! - PDFs whose text layer is unreadable and whose heuristic yield is
//!   below [`MIN_PDF_TEXT_CHARS`].
//! - Unknown formats whose bytes do not decode as text.
//!
//! Office Open XML and OpenDocument containers are read with `zip` and
//! `quick-xml`. Every entry read is bounded by [`MAX_XML_ENTRY_BYTES`].

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use scraper::Html;
use thiserror::Error;
use tracing::{debug, warn};

use crate::binary_text::{self, DocumentKind, NO_TEXT_FOUND};
use crate::classify::FileFormat;

/// Heuristic PDF text shorter than this is reported as a failure.
pub const MIN_PDF_TEXT_CHARS: usize = 50;
/// Word XML pattern scans must produce more than this many chars.
pub const MIN_WORD_PATTERN_CHARS: usize = 50;
/// Spreadsheet XML pattern scans must produce more than this many chars.
pub const MIN_SHEET_PATTERN_CHARS: usize = 30;
/// CSV/TSV rows rendered before the remainder is summarised.
pub const CSV_PREVIEW_ROWS: usize = 10;
/// Share of U+FFFD characters above which unknown bytes are rejected.
const MAX_REPLACEMENT_RATIO: f64 = 0.1;

pub const UNREADABLE_DOCUMENT: &str = "[Unable to extract readable content. The document may be corrupted or in an unsupported format.]";
pub const SPREADSHEET_PATTERN_PREFIX: &str = "Data extracted from spreadsheet:";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const MAX_SHEETS: usize = 100;
const MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RTF_CONTROL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z0-9]+\s?").unwrap());
static PDF_STRING_RE: Lazy<regex::bytes::Regex> =
    Lazy::new(|| regex::bytes::Regex::new(r"(?-u)\(([^)]+)\)").unwrap());

/// Failures that propagate to the caller, who skips the file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF processing failed: {0}. Try converting to text format for better results.")]
    Pdf(String),
    #[error("content could not be decoded as text")]
    Undecodable,
}

/// Internal container parse failures; always absorbed by the fallback chain.
#[derive(Debug, Error)]
enum ContainerError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("ZIP entry {0} exceeds size limit ({1} bytes)")]
    EntryTooLarge(String, u64),
    #[error("container holds no text")]
    Empty,
}

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// Extract plain text from `bytes` according to `format`.
pub fn extract_text(bytes: &[u8], format: FileFormat) -> Result<String, ExtractError> {
    let text = match format {
        FileFormat::PlainText | FileFormat::Markdown | FileFormat::SourceCode { .. } => {
            decode_lossy(bytes)
        }
        FileFormat::Html | FileFormat::Xml => html_to_text(&decode_lossy(bytes)),
        FileFormat::Csv => delimited_to_text(&decode_lossy(bytes), b','),
        FileFormat::Tsv => delimited_to_text(&decode_lossy(bytes), b'\t'),
        FileFormat::Json => pretty_json(decode_lossy(bytes)),
        FileFormat::Rtf => rtf_to_text(&decode_lossy(bytes)),
        FileFormat::Pdf => pdf_to_text(bytes)?,
        FileFormat::Word
        | FileFormat::Excel
        | FileFormat::PowerPoint
        | FileFormat::OpenDocumentText
        | FileFormat::OpenDocumentSpreadsheet
        | FileFormat::OpenDocumentPresentation => container_to_text(bytes, format),
        FileFormat::Unknown => decode_unknown(bytes)?,
    };
    Ok(text)
}

fn decode_lossy(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Strict UTF-8, else lossy decoding unless the bytes look binary.
fn decode_unknown(bytes: &[u8]) -> Result<String, ExtractError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string());
    }
    if bytes.contains(&0) {
        return Err(ExtractError::Undecodable);
    }
    let text = String::from_utf8_lossy(bytes);
    let total = text.chars().count();
    let replaced = text.chars().filter(|c| *c == char::REPLACEMENT_CHARACTER).count();
    if total == 0 || replaced as f64 > total as f64 * MAX_REPLACEMENT_RATIO {
        return Err(ExtractError::Undecodable);
    }
    Ok(text.into_owned())
}

// ============ Markup and plain-text formats ============

/// Text nodes of the parsed document, minus `script` and `style` content.
fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    WHITESPACE_RE.replace_all(&parts.join(" "), " ").trim().to_string()
}

fn pretty_json(raw: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
        Err(e) => {
            debug!(error = %e, "JSON did not parse, keeping raw text");
            raw
        }
    }
}

/// Render a header line plus the first rows as `header: value` pairs.
fn delimited_to_text(raw: &str, delimiter: u8) -> String {
    match render_delimited(raw, delimiter) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "delimited text did not parse, keeping raw text");
            raw.to_string()
        }
    }
}

fn render_delimited(raw: &str, delimiter: u8) -> Result<String, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut out = format!("Headers: {}\n\n", headers.join(", "));

    let mut total = 0usize;
    for record in reader.records() {
        let record = record?;
        total += 1;
        if total > CSV_PREVIEW_ROWS {
            continue;
        }
        out.push_str(&format!("Row {}: ", total));
        for (header, value) in headers.iter().zip(record.iter()) {
            if !value.is_empty() {
                out.push_str(&format!("{}: {}; ", header, value));
            }
        }
        out.push('\n');
    }

    if total > CSV_PREVIEW_ROWS {
        out.push_str(&format!("\n... and {} more rows", total - CSV_PREVIEW_ROWS));
    }
    Ok(out.trim_end().to_string())
}

fn rtf_to_text(raw: &str) -> String {
    let text = RTF_CONTROL_RE.replace_all(raw, "");
    let text = text.replace(['{', '}'], "");
    let text = text.replace("\\\\", "\\").replace("\\n", "\n");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

// ============ PDF ============

fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let layer = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match layer {
        Ok(Ok(pages)) if pages.iter().any(|page| !page.trim().is_empty()) => {
            return Ok(paged_text(&pages));
        }
        Ok(Ok(_)) => debug!("PDF text layer is empty, scanning strings"),
        Ok(Err(e)) => debug!(error = %e, "PDF text layer unreadable, scanning strings"),
        Err(_) => warn!("PDF parser panicked, scanning strings"),
    }

    let text = pdf_string_runs(bytes);
    if text.chars().count() > MIN_PDF_TEXT_CHARS {
        Ok(text)
    } else {
        Err(ExtractError::Pdf(
            "Unable to extract readable text from PDF".to_string(),
        ))
    }
}

/// `Pages: N` followed by one `[Page i]` section per page.
fn paged_text(pages: &[String]) -> String {
    let mut out = format!("Pages: {}", pages.len());
    for (i, page) in pages.iter().enumerate() {
        out.push_str(&format!("\n\n[Page {}]\n{}", i + 1, page.trim()));
    }
    out
}

/// Join parenthesised literal strings longer than two bytes.
fn pdf_string_runs(bytes: &[u8]) -> String {
    PDF_STRING_RE
        .captures_iter(bytes)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_bytes())
        .filter(|run| run.len() > 2)
        .map(|run| run.iter().map(|b| *b as char).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============ Office containers ============

fn document_kind(format: FileFormat) -> DocumentKind {
    match format {
        FileFormat::Word | FileFormat::OpenDocumentText => DocumentKind::WordProcessing,
        FileFormat::Excel | FileFormat::OpenDocumentSpreadsheet => DocumentKind::Spreadsheet,
        _ => DocumentKind::Presentation,
    }
}

fn container_to_text(bytes: &[u8], format: FileFormat) -> String {
    let zipped = bytes.starts_with(ZIP_MAGIC);
    if zipped {
        match structured_text(bytes, format) {
            Ok(text) => return text,
            Err(e) => debug!(error = %e, format = format.tag(), "structured extraction failed"),
        }
    }

    match format {
        FileFormat::Word => {
            let text = binary_text::xml_tag_text(bytes, DocumentKind::WordProcessing);
            if text.chars().count() > MIN_WORD_PATTERN_CHARS {
                return text;
            }
        }
        FileFormat::Excel => {
            let text = binary_text::xml_tag_text(bytes, DocumentKind::Spreadsheet);
            if text.chars().count() > MIN_SHEET_PATTERN_CHARS {
                return format!("{}\n{}", SPREADSHEET_PATTERN_PREFIX, text);
            }
        }
        _ => {}
    }

    let text = binary_text::extract_binary_text(bytes, document_kind(format));
    if text == NO_TEXT_FOUND && zipped {
        warn!(format = format.tag(), "container unreadable by every strategy");
        return UNREADABLE_DOCUMENT.to_string();
    }
    text
}

fn structured_text(bytes: &[u8], format: FileFormat) -> Result<String, ContainerError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let text = match format {
        FileFormat::Word => docx_text(&mut archive)?,
        FileFormat::PowerPoint => pptx_text(&mut archive)?,
        FileFormat::Excel => xlsx_text(&mut archive)?,
        _ => odf_text(&mut archive)?,
    };
    if text.trim().is_empty() {
        return Err(ContainerError::Empty);
    }
    Ok(text)
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ContainerError> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        return Err(ContainerError::EntryTooLarge(name.to_string(), max_bytes));
    }
    Ok(out)
}

/// Entry names under `prefix` numbered like `prefix{N}.xml`, in numeric order.
fn numbered_entries(archive: &Archive<'_>, prefix: &str) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .filter_map(|n| {
            n.trim_start_matches(prefix)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
                .map(|i| (i, n.to_string()))
        })
        .collect();
    entries.sort();
    entries
}

fn docx_text(archive: &mut Archive<'_>) -> Result<String, ContainerError> {
    let xml = read_zip_entry_bounded(archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    run_text(&xml)
}

fn pptx_text(archive: &mut Archive<'_>) -> Result<String, ContainerError> {
    let mut sections = Vec::new();
    for (number, name) in numbered_entries(archive, "ppt/slides/slide") {
        let xml = read_zip_entry_bounded(archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = run_text(&xml)?;
        if !text.is_empty() {
            sections.push(format!("--- Slide {} ---\n{}", number, text));
        }
    }
    Ok(sections.join("\n\n"))
}

/// Text of `<*:t>` runs, one line per `<*:p>` paragraph.
fn run_text(xml: &[u8]) -> Result<String, ContainerError> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_run = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run = true,
            Event::Text(te) if in_run => {
                line.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => flush_line(&mut line, &mut lines),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    flush_line(&mut line, &mut lines);
    Ok(lines.join("\n"))
}

fn flush_line(line: &mut String, lines: &mut Vec<String>) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}

/// OpenDocument `content.xml`: every `text:p` / `text:h` becomes a line.
fn odf_text(archive: &mut Archive<'_>) -> Result<String, ContainerError> {
    let xml = read_zip_entry_bounded(archive, "content.xml", MAX_XML_ENTRY_BYTES)?;
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if matches!(e.local_name().as_ref(), b"p" | b"h") => depth += 1,
            Event::Empty(e) if depth > 0 && e.local_name().as_ref() == b"s" => line.push(' '),
            Event::Empty(e) if depth > 0 && e.local_name().as_ref() == b"tab" => line.push('\t'),
            Event::Text(te) if depth > 0 => {
                line.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Event::End(e) if matches!(e.local_name().as_ref(), b"p" | b"h") => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    flush_line(&mut line, &mut lines);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(lines.join("\n"))
}

fn xlsx_text(archive: &mut Archive<'_>) -> Result<String, ContainerError> {
    let shared_strings = match read_shared_strings(archive) {
        Ok(strings) => strings,
        Err(ContainerError::Zip(zip::result::ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };
    let mut sections = Vec::new();
    for (number, name) in numbered_entries(archive, "xl/worksheets/sheet")
        .into_iter()
        .take(MAX_SHEETS)
    {
        let xml = read_zip_entry_bounded(archive, &name, MAX_XML_ENTRY_BYTES)?;
        let rows = sheet_rows(&xml, &shared_strings)?;
        if !rows.is_empty() {
            sections.push(format!("--- Worksheet {} ---\n{}", number, rows.join("\n")));
        }
    }
    Ok(sections.join("\n\n"))
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, ContainerError> {
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::Text(te) if in_t => current.push_str(te.unescape().unwrap_or_default().as_ref()),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Inline,
    Value,
}

/// Sheet rows as ` | `-joined cell text. Shared-string cells resolve
/// through `shared_strings`; inline strings and raw values pass through.
fn sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<String>, ContainerError> {
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut kind = CellKind::Value;
    let mut in_value = false;
    let mut cell_count = 0usize;
    loop {
        if cell_count >= MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"c" => {
                    kind = CellKind::Value;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"t" {
                            kind = match attr.value.as_ref() {
                                b"s" => CellKind::Shared,
                                b"inlineStr" => CellKind::Inline,
                                _ => CellKind::Value,
                            };
                        }
                    }
                }
                b"v" => in_value = kind != CellKind::Inline,
                b"t" => in_value = kind == CellKind::Inline,
                _ => {}
            },
            Event::Text(te) if in_value => {
                let raw = te.unescape().unwrap_or_default();
                let value = raw.trim();
                let resolved = match kind {
                    CellKind::Shared => value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i))
                        .cloned(),
                    _ => Some(value.to_string()),
                };
                if let Some(text) = resolved.filter(|t| !t.is_empty()) {
                    cells.push(text);
                    cell_count += 1;
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"row" if !cells.is_empty() => rows.push(std::mem::take(&mut cells).join(" | ")),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !cells.is_empty() {
        rows.push(cells.join(" | "));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn plain_text_strips_bom() {
        let text = extract_text(b"\xEF\xBB\xBFhello", FileFormat::PlainText).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn html_drops_scripts_and_tags() {
        let html = b"<html><head><style>p{color:red}</style><script>alert(1)</script></head>\
                     <body><h1>Title</h1><p>Tom &amp; Jerry</p></body></html>";
        let text = extract_text(html, FileFormat::Html).unwrap();
        assert_eq!(text, "Title Tom & Jerry");
    }

    #[test]
    fn html_decodes_named_and_numeric_entities() {
        let html = b"<p>Caf&eacute; &#8212; it&#8217;s &copy; 2024</p><!-- hidden -->";
        let text = extract_text(html, FileFormat::Html).unwrap();
        assert_eq!(text, "Caf\u{e9} \u{2014} it\u{2019}s \u{a9} 2024");
    }

    #[test]
    fn xml_keeps_element_text() {
        let xml = b"<?xml version=\"1.0\"?><note><to>Ada</to><msg>Ship it</msg></note>";
        let text = extract_text(xml, FileFormat::Xml).unwrap();
        assert_eq!(text, "Ada Ship it");
    }

    #[test]
    fn json_is_pretty_printed() {
        let text = extract_text(br#"{"a":[1,2]}"#, FileFormat::Json).unwrap();
        assert_eq!(text, "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn json_keeps_key_order() {
        let text = extract_text(br#"{"zeta":1,"alpha":2}"#, FileFormat::Json).unwrap();
        assert_eq!(text, "{\n  \"zeta\": 1,\n  \"alpha\": 2\n}");
    }

    #[test]
    fn malformed_json_is_returned_verbatim() {
        let text = extract_text(b"{not json", FileFormat::Json).unwrap();
        assert_eq!(text, "{not json");
    }

    #[test]
    fn csv_rows_become_pairs() {
        let csv = "name, age\n\"Ann\", 31\nBob,\n";
        let text = extract_text(csv.as_bytes(), FileFormat::Csv).unwrap();
        assert_eq!(text, "Headers: name, age\n\nRow 1: name: Ann; age: 31; \nRow 2: name: Bob;");
    }

    #[test]
    fn csv_notes_omitted_rows() {
        let mut csv = String::from("n\n");
        for i in 0..15 {
            csv.push_str(&format!("{}\n", i));
        }
        let text = extract_text(csv.as_bytes(), FileFormat::Csv).unwrap();
        assert!(text.contains("Row 10: n: 9;"));
        assert!(!text.contains("Row 11"));
        assert!(text.ends_with("... and 5 more rows"));
    }

    #[test]
    fn tsv_uses_tabs() {
        let text = extract_text(b"a\tb\n1\t2\n", FileFormat::Tsv).unwrap();
        assert!(text.contains("Row 1: a: 1; b: 2;"));
    }

    #[test]
    fn rtf_control_words_removed() {
        let rtf = br"{\rtf1\ansi\deff0 {\b Hello} world\par}";
        let text = extract_text(rtf, FileFormat::Rtf).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn invalid_pdf_without_strings_fails() {
        let err = extract_text(b"not a pdf", FileFormat::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(err.to_string().starts_with("PDF processing failed"));
    }

    #[test]
    fn pdf_string_heuristic_joins_runs() {
        let bytes = b"BT (Quarterly results were strong) Tj (ok) Tj (and the outlook remains positive) Tj ET";
        assert_eq!(
            pdf_string_runs(bytes),
            "Quarterly results were strong and the outlook remains positive"
        );
    }

    #[test]
    fn broken_pdf_falls_back_to_string_runs() {
        let bytes = b"%PDF-1.4 garbage BT (Quarterly results were strong) Tj (ok) Tj \
                      (and the outlook remains positive) Tj ET";
        let text = extract_text(bytes, FileFormat::Pdf).unwrap();
        assert_eq!(text, "Quarterly results were strong and the outlook remains positive");
    }

    #[test]
    fn pdf_pages_are_numbered() {
        let pages = vec!["  first page \n".to_string(), "second".to_string()];
        assert_eq!(paged_text(&pages), "Pages: 2\n\n[Page 1]\nfirst page\n\n[Page 2]\nsecond");
    }

    #[test]
    fn unknown_binary_is_undecodable() {
        let err = extract_text(&[0xFF, 0x00, 0x12, 0x80], FileFormat::Unknown).unwrap_err();
        assert!(matches!(err, ExtractError::Undecodable));
        assert_eq!(
            extract_text(b"just text", FileFormat::Unknown).unwrap(),
            "just text"
        );
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let doc = r#"<w:document xmlns:w="w"><w:body>
            <w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second &amp; last</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let bytes = zip_with(&[("word/document.xml", doc)]);
        let text = extract_text(&bytes, FileFormat::Word).unwrap();
        assert_eq!(text, "Hello world\nSecond & last");
    }

    #[test]
    fn pptx_slides_get_headers_in_numeric_order() {
        let slide = |t: &str| {
            format!(
                r#"<p:sld xmlns:a="a"><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:sld>"#,
                t
            )
        };
        let s1 = slide("Intro");
        let s2 = slide("Details");
        let s10 = slide("Wrap up");
        let bytes = zip_with(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
        ]);
        let text = extract_text(&bytes, FileFormat::PowerPoint).unwrap();
        assert_eq!(
            text,
            "--- Slide 1 ---\nIntro\n\n--- Slide 2 ---\nDetails\n\n--- Slide 10 ---\nWrap up"
        );
    }

    #[test]
    fn xlsx_rows_join_cells() {
        let shared = r#"<sst><si><t>Region</t></si><si><t>Sales</t></si><si><t>North</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>42</v></c></row>
            <row r="3"><c r="A3" t="inlineStr"><is><t>South</t></is></c></row>
        </sheetData></worksheet>"#;
        let bytes = zip_with(&[
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let text = extract_text(&bytes, FileFormat::Excel).unwrap();
        assert_eq!(
            text,
            "--- Worksheet 1 ---\nRegion | Sales\nNorth | 42\nSouth"
        );
    }

    #[test]
    fn odf_paragraphs_and_headings() {
        let content = r#"<office:document-content xmlns:text="t"><office:body><office:text>
            <text:h>Agenda</text:h>
            <text:p>Budget<text:s/>review <text:span>today</text:span></text:p>
        </office:text></office:body></office:document-content>"#;
        let bytes = zip_with(&[("content.xml", content)]);
        let text = extract_text(&bytes, FileFormat::OpenDocumentText).unwrap();
        assert_eq!(text, "Agenda\nBudget review today");
    }

    #[test]
    fn corrupt_zip_container_reports_unreadable() {
        let mut bytes = ZIP_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let text = extract_text(&bytes, FileFormat::PowerPoint).unwrap();
        assert_eq!(text, UNREADABLE_DOCUMENT);
    }

    #[test]
    fn legacy_word_uses_tag_scan() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0];
        bytes.extend_from_slice(
            b"<w:t>The committee approved the annual budget for the next fiscal year</w:t>",
        );
        let text = extract_text(&bytes, FileFormat::Word).unwrap();
        assert!(text.starts_with("The committee approved the annual budget"));
    }

    #[test]
    fn legacy_excel_pattern_scan_is_prefixed() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0];
        bytes.extend_from_slice(b"<v>Revenue by quarter</v><v>Expenses by quarter</v>");
        let text = extract_text(&bytes, FileFormat::Excel).unwrap();
        assert_eq!(
            text,
            "Data extracted from spreadsheet:\nRevenue by quarter | Expenses by quarter"
        );
    }

    #[test]
    fn legacy_container_without_text_gets_placeholder() {
        let legacy = [0xD0, 0xCF, 0x11, 0xE0, 0, 1, 2];
        let text = extract_text(&legacy, FileFormat::PowerPoint).unwrap();
        assert_eq!(text, NO_TEXT_FOUND);
    }
}
