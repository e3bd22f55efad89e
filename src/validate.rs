//! Upload validation.
//!
//! Produces the user-facing reasons a file is rejected before any bytes are
//! read. An empty list means the file may be ingested.

use crate::classify::Classifier;
use crate::models::FileInput;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Check `file` against `max_size` and the classifier's known formats.
///
/// Every failing check contributes one message, in a fixed order: empty
/// file, size limit, unsupported type.
pub fn validate(file: &FileInput, max_size: u64, classifier: &Classifier) -> Vec<String> {
    let mut errors = Vec::new();

    if file.size == 0 {
        errors.push("File is empty".to_string());
    }

    if file.size > max_size {
        errors.push(format!(
            "File too large ({}MB). Maximum size is {}MB",
            whole_megabytes(file.size),
            whole_megabytes(max_size)
        ));
    }

    if !classifier.is_supported(&file.name, &file.mime_type) {
        let mime = if file.mime_type.is_empty() {
            "unknown"
        } else {
            file.mime_type.as_str()
        };
        errors.push(format!("File type not supported: {}", mime));
    }

    errors
}

fn whole_megabytes(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}
