//! Integration tests for the `chx` binary.
//!
//! Each test runs the built binary inside a fresh temporary directory so
//! that no `config/chx.toml` from the working tree leaks in.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn chx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("chx");
    path
}

fn run_chx(dir: &Path, args: &[&str]) -> Output {
    Command::new(chx_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run chx")
}

fn run_chx_with_stdin(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(chx_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn chx");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "chx failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Minimal docx (ZIP) whose body holds one paragraph per phrase.
fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// Single-page PDF whose content stream shows `phrase` in Helvetica.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Upload directory with one good file per pipeline path and two bad ones.
fn setup_uploads() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let uploads = tmp.path().join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    fs::write(uploads.join("a_notes.md"), "# Notes\n\nShip the **beta** on Friday.").unwrap();
    fs::write(
        uploads.join("b_report.docx"),
        minimal_docx(&["Quarterly report", "Revenue grew eight percent"]),
    )
    .unwrap();
    fs::write(uploads.join("c_broken.pdf"), b"%PDF-1.4 not really a pdf").unwrap();
    fs::write(uploads.join("d_empty.txt"), b"").unwrap();
    tmp
}

#[test]
fn render_assistant_markdown_to_html() {
    let tmp = TempDir::new().unwrap();
    let message = tmp.path().join("reply.md");
    fs::write(&message, "## Result\n\n```rust\nfn main() {}\n```\n\n- one\n- *two*").unwrap();

    let output = run_chx(tmp.path(), &["render", "reply.md"]);
    assert_success(&output);
    let html = stdout(&output);
    assert!(html.starts_with("<div class=\"message assistant\">"));
    assert!(html.contains("<h2>Result</h2>"));
    assert!(html.contains("<figcaption>rust</figcaption><pre><code>fn main() {}</code></pre>"));
    assert!(html.contains("<ul>\n<li>one</li>\n<li><em>two</em></li>\n</ul>"));
    assert!(html.contains("<button class=\"copy\">Copy</button>"));
}

#[test]
fn render_user_message_as_json_is_verbatim() {
    let tmp = TempDir::new().unwrap();
    let output = run_chx_with_stdin(
        tmp.path(),
        &["render", "--role", "user", "--output", "json"],
        "**keep** me",
    );
    assert_success(&output);
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["role"], "user");
    assert_eq!(view["body"]["kind"], "verbatim");
    assert_eq!(view["body"]["text"], "**keep** me");
    assert!(view["copy"].is_null());
}

#[test]
fn render_json_tree_for_assistant() {
    let tmp = TempDir::new().unwrap();
    let output = run_chx_with_stdin(
        tmp.path(),
        &["render", "--output", "json"],
        "| a | b |\n|---|---|\n| 1 | 2 |",
    );
    assert_success(&output);
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let elements = view["body"]["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0]["kind"], "table");
    assert_eq!(elements[0]["rows"].as_array().unwrap().len(), 1);
}

#[test]
fn classify_reports_formats_and_labels() {
    let tmp = TempDir::new().unwrap();
    let output = run_chx(
        tmp.path(),
        &["classify", "deck.pptx", "main.py", "notes.txt", "blob.zzz"],
    );
    assert_success(&output);
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "deck.pptx\tpowerpoint\tPowerPoint Presentation: deck.pptx",
            "main.py\tpython\t[File: main.py] [Language: python]",
            "notes.txt\ttext",
            "blob.zzz\tunknown",
        ]
    );
}

#[test]
fn classify_prefers_mime() {
    let tmp = TempDir::new().unwrap();
    let output = run_chx(tmp.path(), &["classify", "export", "--mime", "text/csv; charset=utf-8"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "export\tcsv\tCSV File: export");
}

#[test]
fn chunk_json_respects_size() {
    let tmp = TempDir::new().unwrap();
    let text = "lorem ipsum dolor sit amet ".repeat(20);
    fs::write(tmp.path().join("in.txt"), &text).unwrap();

    let output = run_chx(
        tmp.path(),
        &["chunk", "in.txt", "--size", "100", "--overlap", "20", "--json"],
    );
    assert_success(&output);
    let chunks: Vec<String> = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    let words = ["lorem", "ipsum", "dolor", "sit", "amet"];
    assert!(chunks.iter().all(|c| words.iter().any(|w| c.starts_with(w))));
}

#[test]
fn chunk_rejects_zero_size() {
    let tmp = TempDir::new().unwrap();
    let output = run_chx_with_stdin(tmp.path(), &["chunk", "--size", "0"], "text");
    assert!(!output.status.success());
}

#[test]
fn ingest_summary_lists_ingested_and_skipped() {
    let tmp = setup_uploads();
    let output = run_chx(tmp.path(), &["ingest", "uploads", "--progress", "off"]);
    assert_success(&output);
    let out = stdout(&output);

    assert!(out.starts_with("ingest\n"));
    assert!(out.contains("  ingested: 2\n"));
    assert!(out.contains("    a_notes.md (markdown, 1 chunks)\n"));
    assert!(out.contains("    b_report.docx (word, 1 chunks)\n"));
    assert!(out.contains("  skipped: 2\n"));
    assert!(out.contains("    c_broken.pdf: PDF processing failed"));
    assert!(out.contains("    d_empty.txt: File is empty\n"));
    assert!(out.trim_end().ends_with("ok"));
}

#[test]
fn ingest_json_report_carries_extracted_text() {
    let tmp = setup_uploads();
    let output = run_chx(tmp.path(), &["ingest", "uploads", "--json", "--progress", "off"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();

    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1]["name"], "b_report.docx");
    assert_eq!(
        files[1]["extractedText"],
        "Word Document: b_report.docx\n\nQuarterly report\nRevenue grew eight percent"
    );
    assert_eq!(files[1]["contentHash"].as_str().unwrap().len(), 64);
    assert_eq!(report["skipped"].as_array().unwrap().len(), 2);
    assert_eq!(report["truncated"], 0);
}

#[test]
fn ingest_reads_pdf_text_layer() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("memo.pdf"), minimal_pdf_with_phrase("ship beta friday")).unwrap();

    let output = run_chx(tmp.path(), &["ingest", "memo.pdf", "--json", "--progress", "off"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1, "skipped: {}", report["skipped"]);
    let text = files[0]["extractedText"].as_str().unwrap();
    assert!(text.starts_with("PDF Document: memo.pdf\n\nPages: 1\n\n[Page 1]\n"));
    assert!(text.contains("ship beta friday"));
}

#[test]
fn ingest_respects_batch_cap_from_config() {
    let tmp = setup_uploads();
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/chx.toml"),
        "[ingest]\nmax_files_per_batch = 1\n",
    )
    .unwrap();

    let output = run_chx(tmp.path(), &["ingest", "uploads", "--progress", "off"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("  ingested: 1\n"));
    assert!(out.contains("  skipped: 0\n"));
    assert!(out.contains("  truncated: 3\n"));
}

#[test]
fn ingest_json_progress_goes_to_stderr() {
    let tmp = setup_uploads();
    let output = run_chx(tmp.path(), &["ingest", "uploads", "--progress", "json"]);
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first: serde_json::Value =
        serde_json::from_str(stderr.lines().next().unwrap()).unwrap();
    assert_eq!(first["phase"], "started");
    assert_eq!(first["total"], 4);
    assert!(!stdout(&output).contains("\"phase\""));
}

#[test]
fn ingest_rejects_unknown_progress_mode() {
    let tmp = setup_uploads();
    let output = run_chx(tmp.path(), &["ingest", "uploads", "--progress", "loud"]);
    assert!(!output.status.success());
}

#[test]
fn prompt_inlines_files_before_question() {
    let tmp = setup_uploads();
    let output = run_chx(
        tmp.path(),
        &[
            "prompt",
            "uploads/a_notes.md",
            "uploads/b_report.docx",
            "--question",
            "What ships on Friday?",
        ],
    );
    assert_success(&output);
    assert_eq!(
        stdout(&output).trim_end(),
        "[File: a_notes.md]\n# Notes\n\nShip the **beta** on Friday.\n\n\
         [File: b_report.docx]\nWord Document: b_report.docx\n\nQuarterly report\nRevenue grew eight percent\n\n\
         What ships on Friday?"
    );
}

#[test]
fn prompt_json_includes_history_context() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("history.json"),
        r#"[{"role":"user","content":"Hi"},{"role":"assistant","content":"Hello!"}]"#,
    )
    .unwrap();
    fs::write(tmp.path().join("config.toml"), "[prompt]\ncontext_format = \"simple\"\n").unwrap();

    let output = run_chx(
        tmp.path(),
        &[
            "prompt",
            "--config",
            "config.toml",
            "--history",
            "history.json",
            "--question",
            "How are you?",
            "--json",
        ],
    );
    assert_success(&output);
    let request: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        request["message"],
        "Context: Q: Hi\nA: Hello!\n\nCurrent message: How are you?"
    );
}

#[test]
fn invalid_config_fails_fast() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.toml"), "[ingest]\nchunk_size = 0\n").unwrap();
    let output = run_chx(tmp.path(), &["classify", "a.txt", "--config", "bad.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("chunk_size"));
}
