//! File type classification.
//!
//! Resolves an upload's `(file name, MIME type)` pair to a [`FileFormat`].
//! Resolution order:
//!
//! 1. exact MIME type match against the MIME table
//! 2. file extension match against the extension table
//! 3. text-like MIME heuristic (`text/*`, or containing `json`, `xml`,
//!    `script`, `source`) → [`FileFormat::PlainText`]
//! 4. otherwise [`FileFormat::Unknown`]
//!
//! The tables are immutable once built. [`Classifier::shared`] hands out one
//! process-wide instance behind an [`Arc`].

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum FileFormat {
    PlainText,
    Markdown,
    Csv,
    Tsv,
    Json,
    Html,
    Xml,
    Rtf,
    Word,
    Excel,
    PowerPoint,
    OpenDocumentText,
    OpenDocumentSpreadsheet,
    OpenDocumentPresentation,
    Pdf,
    SourceCode { language: &'static str },
    Unknown,
}

impl FileFormat {
    /// Short tag used in CLI output.
    pub fn tag(&self) -> &'static str {
        match self {
            FileFormat::PlainText => "text",
            FileFormat::Markdown => "markdown",
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Json => "json",
            FileFormat::Html => "html",
            FileFormat::Xml => "xml",
            FileFormat::Rtf => "rtf",
            FileFormat::Word => "word",
            FileFormat::Excel => "excel",
            FileFormat::PowerPoint => "powerpoint",
            FileFormat::OpenDocumentText => "opendocument-text",
            FileFormat::OpenDocumentSpreadsheet => "opendocument-spreadsheet",
            FileFormat::OpenDocumentPresentation => "opendocument-presentation",
            FileFormat::Pdf => "pdf",
            FileFormat::SourceCode { language } => *language,
            FileFormat::Unknown => "unknown",
        }
    }

    /// Heading placed above the extracted text of a file in this format.
    pub fn document_label(&self, name: &str) -> Option<String> {
        let kind = match self {
            FileFormat::PlainText | FileFormat::Markdown | FileFormat::Unknown => return None,
            FileFormat::SourceCode { language } => {
                return Some(format!("[File: {}] [Language: {}]", name, language))
            }
            FileFormat::Csv | FileFormat::Tsv => "CSV File",
            FileFormat::Json => "JSON File",
            FileFormat::Html => "HTML File",
            FileFormat::Xml => "XML File",
            FileFormat::Rtf => "RTF Document",
            FileFormat::Word => "Word Document",
            FileFormat::Excel => "Excel Spreadsheet",
            FileFormat::PowerPoint => "PowerPoint Presentation",
            FileFormat::OpenDocumentText => "OpenDocument Text",
            FileFormat::OpenDocumentSpreadsheet => "OpenDocument Spreadsheet",
            FileFormat::OpenDocumentPresentation => "OpenDocument Presentation",
            FileFormat::Pdf => "PDF Document",
        };
        Some(format!("{}: {}", kind, name))
    }
}

const MIME_TABLE: &[(&str, &str)] = &[
    ("text/plain", "text"),
    ("text/markdown", "markdown"),
    ("text/csv", "csv"),
    ("application/csv", "csv"),
    ("text/tab-separated-values", "tsv"),
    ("application/json", "json"),
    ("text/html", "html"),
    ("text/xml", "xml"),
    ("application/xml", "xml"),
    ("text/javascript", "javascript"),
    ("application/javascript", "javascript"),
    ("text/css", "css"),
    ("text/x-python", "python"),
    ("text/x-java-source", "java"),
    ("text/x-c", "c"),
    ("text/x-c++src", "cpp"),
    ("text/x-csharp", "csharp"),
    ("text/x-php", "php"),
    ("application/x-httpd-php", "php"),
    ("text/x-ruby", "ruby"),
    ("text/x-go", "go"),
    ("text/x-rust", "rust"),
    ("text/x-kotlin", "kotlin"),
    ("text/x-swift", "swift"),
    ("text/x-scala", "scala"),
    ("text/x-sql", "sql"),
    ("text/x-yaml", "yaml"),
    ("application/x-yaml", "yaml"),
    ("text/yaml", "yaml"),
    ("application/toml", "toml"),
    ("text/x-ini", "ini"),
    ("application/x-wine-extension-ini", "ini"),
    ("text/x-properties", "properties"),
    ("text/x-log", "log"),
    ("application/x-sh", "shell"),
    ("text/x-shellscript", "shell"),
    ("application/pdf", "pdf"),
    ("application/rtf", "rtf"),
    ("text/rtf", "rtf"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "word",
    ),
    ("application/msword", "word"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "excel",
    ),
    ("application/vnd.ms-excel", "excel"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "powerpoint",
    ),
    ("application/vnd.ms-powerpoint", "powerpoint"),
    ("application/vnd.oasis.opendocument.text", "opendocument-text"),
    (
        "application/vnd.oasis.opendocument.spreadsheet",
        "opendocument-spreadsheet",
    ),
    (
        "application/vnd.oasis.opendocument.presentation",
        "opendocument-presentation",
    ),
];

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("txt", "text"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("mdown", "markdown"),
    ("csv", "csv"),
    ("tsv", "tsv"),
    ("json", "json"),
    ("jsonl", "json"),
    ("html", "html"),
    ("htm", "html"),
    ("xhtml", "html"),
    ("xml", "xml"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("css", "css"),
    ("scss", "css"),
    ("sass", "css"),
    ("less", "css"),
    ("py", "python"),
    ("pyw", "python"),
    ("pyx", "python"),
    ("java", "java"),
    ("jsp", "java"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("vb", "vb"),
    ("php", "php"),
    ("phtml", "php"),
    ("rb", "ruby"),
    ("rbw", "ruby"),
    ("go", "go"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("swift", "swift"),
    ("scala", "scala"),
    ("sql", "sql"),
    ("mysql", "sql"),
    ("pgsql", "sql"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("ini", "ini"),
    ("cfg", "ini"),
    ("conf", "ini"),
    ("properties", "properties"),
    ("log", "log"),
    ("out", "log"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("fish", "shell"),
    ("bat", "batch"),
    ("cmd", "batch"),
    ("ps1", "powershell"),
    ("psm1", "powershell"),
    ("dockerfile", "dockerfile"),
    ("pdf", "pdf"),
    ("rtf", "rtf"),
    ("docx", "word"),
    ("doc", "word"),
    ("xlsx", "excel"),
    ("xls", "excel"),
    ("pptx", "powerpoint"),
    ("ppt", "powerpoint"),
    ("odt", "opendocument-text"),
    ("ods", "opendocument-spreadsheet"),
    ("odp", "opendocument-presentation"),
    ("r", "r"),
    ("rmd", "r"),
    ("tex", "latex"),
    ("bib", "bibtex"),
    ("asm", "assembly"),
    ("s", "assembly"),
    ("pl", "perl"),
    ("pm", "perl"),
    ("lua", "lua"),
    ("jl", "julia"),
    ("elm", "elm"),
    ("clj", "clojure"),
    ("cljs", "clojure"),
    ("f90", "fortran"),
    ("f95", "fortran"),
    ("f03", "fortran"),
    ("dart", "dart"),
    ("vim", "vim"),
    ("erl", "erlang"),
    ("hrl", "erlang"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("hs", "haskell"),
    ("lhs", "haskell"),
    ("ml", "ocaml"),
    ("mli", "ocaml"),
    ("pas", "pascal"),
    ("pp", "pascal"),
    ("ada", "ada"),
    ("adb", "ada"),
    ("ads", "ada"),
    ("cob", "cobol"),
    ("cbl", "cobol"),
    ("lisp", "lisp"),
    ("lsp", "lisp"),
    ("cl", "lisp"),
    ("scm", "scheme"),
    ("ss", "scheme"),
    ("tcl", "tcl"),
    ("tk", "tcl"),
    ("vhdl", "vhdl"),
    ("vhd", "vhdl"),
    ("v", "verilog"),
    ("sv", "systemverilog"),
];

/// Map a category tag from the tables to a format. Tags that are not a
/// document category are programming or config languages.
fn format_for_tag(tag: &'static str) -> FileFormat {
    match tag {
        "text" => FileFormat::PlainText,
        "markdown" => FileFormat::Markdown,
        "csv" => FileFormat::Csv,
        "tsv" => FileFormat::Tsv,
        "json" => FileFormat::Json,
        "html" => FileFormat::Html,
        "xml" => FileFormat::Xml,
        "rtf" => FileFormat::Rtf,
        "pdf" => FileFormat::Pdf,
        "word" => FileFormat::Word,
        "excel" => FileFormat::Excel,
        "powerpoint" => FileFormat::PowerPoint,
        "opendocument-text" => FileFormat::OpenDocumentText,
        "opendocument-spreadsheet" => FileFormat::OpenDocumentSpreadsheet,
        "opendocument-presentation" => FileFormat::OpenDocumentPresentation,
        language => FileFormat::SourceCode { language },
    }
}

static SHARED: Lazy<Arc<Classifier>> = Lazy::new(|| Arc::new(Classifier::new()));

/// Immutable MIME and extension lookup tables.
#[derive(Debug)]
pub struct Classifier {
    by_mime: HashMap<&'static str, FileFormat>,
    by_extension: HashMap<&'static str, FileFormat>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        let by_mime = MIME_TABLE
            .iter()
            .map(|(mime, tag)| (*mime, format_for_tag(*tag)))
            .collect();
        let by_extension = EXTENSION_TABLE
            .iter()
            .map(|(ext, tag)| (*ext, format_for_tag(*tag)))
            .collect();
        Self {
            by_mime,
            by_extension,
        }
    }

    /// Process-wide classifier, built on first use.
    pub fn shared() -> Arc<Classifier> {
        Arc::clone(&SHARED)
    }

    pub fn classify(&self, file_name: &str, mime_type: &str) -> FileFormat {
        let mime = mime_type.trim().to_ascii_lowercase();
        let mime = mime.split(';').next().unwrap_or_default().trim();

        if let Some(format) = self.by_mime.get(mime) {
            return *format;
        }

        let extension = extension_of(file_name);
        if let Some(format) = self.by_extension.get(extension.as_str()) {
            return *format;
        }

        if is_text_like_mime(mime) {
            return FileFormat::PlainText;
        }

        FileFormat::Unknown
    }

    /// Whether the pipeline recognizes this upload at all.
    pub fn is_supported(&self, file_name: &str, mime_type: &str) -> bool {
        self.classify(file_name, mime_type) != FileFormat::Unknown
    }
}

/// The text after the last `.`, lowercased. Names without a dot are used
/// whole so that `Dockerfile` resolves.
fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn is_text_like_mime(mime: &str) -> bool {
    !mime.is_empty()
        && (mime.starts_with("text/")
            || mime.contains("json")
            || mime.contains("xml")
            || mime.contains("script")
            || mime.contains("source"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_table_wins_over_extension() {
        let c = Classifier::new();
        assert_eq!(c.classify("notes.py", "text/plain"), FileFormat::PlainText);
        assert_eq!(c.classify("x.bin", "application/pdf"), FileFormat::Pdf);
        assert_eq!(c.classify("sheet.dat", "application/vnd.ms-excel"), FileFormat::Excel);
    }

    #[test]
    fn extension_fallback() {
        let c = Classifier::new();
        assert_eq!(
            c.classify("main.RS", ""),
            FileFormat::SourceCode { language: "rust" }
        );
        assert_eq!(c.classify("report.docx", "application/octet-stream"), FileFormat::Word);
        assert_eq!(c.classify("data.tsv", ""), FileFormat::Tsv);
        assert_eq!(
            c.classify("Dockerfile", ""),
            FileFormat::SourceCode {
                language: "dockerfile"
            }
        );
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let c = Classifier::new();
        assert_eq!(
            c.classify("page", "text/html; charset=utf-8"),
            FileFormat::Html
        );
    }

    #[test]
    fn text_like_mime_heuristic() {
        let c = Classifier::new();
        assert_eq!(c.classify("a.weird", "text/x-unknown"), FileFormat::PlainText);
        assert_eq!(c.classify("a.weird", "application/ld+json"), FileFormat::PlainText);
        assert_eq!(c.classify("a.weird", "application/x-source"), FileFormat::PlainText);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        let c = Classifier::new();
        assert_eq!(c.classify("image.png", "image/png"), FileFormat::Unknown);
        assert!(!c.is_supported("archive.tar.gz", ""));
    }

    #[test]
    fn extension_table_is_broad() {
        assert!(Classifier::new().by_extension.len() >= 80);
    }

    #[test]
    fn labels() {
        assert_eq!(FileFormat::Markdown.document_label("a.md"), None);
        assert_eq!(
            FileFormat::Pdf.document_label("a.pdf").as_deref(),
            Some("PDF Document: a.pdf")
        );
        assert_eq!(
            FileFormat::SourceCode { language: "go" }
                .document_label("m.go")
                .as_deref(),
            Some("[File: m.go] [Language: go]")
        );
    }
}
