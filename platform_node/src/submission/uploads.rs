//! Attachment screening and encoding.
//!
//! Every upload path goes through [`screen`] with one shared
//! [`UploadLimits`], so the submission form and the standalone attachment
//! endpoint accept exactly the same files.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use super::MAX_ATTACHMENTS;

const MB: u64 = 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/zip",
    "application/x-zip-compressed",
    "text/plain",
    "text/markdown",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "video/mp4",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 30 * MB,
            max_total_bytes: 50 * MB,
            max_files: MAX_ATTACHMENTS,
        }
    }
}

/// A file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A file ready to be sent to the asset host.
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Screened {
    pub accepted: Vec<(IncomingFile, String)>,
    pub skipped: Vec<SkippedFile>,
}

/// Split files into accepted (with their resolved MIME type) and skipped.
///
/// Files are considered in order; once the aggregate or count limit is
/// reached the remaining files are skipped, but smaller later files can
/// still fit under the aggregate limit.
pub fn screen(files: Vec<IncomingFile>, limits: &UploadLimits) -> Screened {
    let mut screened = Screened::default();
    let mut total: u64 = 0;

    for file in files {
        let size = file.bytes.len() as u64;
        let mime = resolve_content_type(file.content_type.as_deref(), &file.file_name);

        let rejection = if size == 0 {
            Some("file is empty".to_string())
        } else if !mime
            .as_deref()
            .is_some_and(|m| ALLOWED_MIME_TYPES.contains(&m))
        {
            Some(format!(
                "file type {} is not allowed",
                mime.as_deref().unwrap_or("unknown")
            ))
        } else if size > limits.max_file_bytes {
            Some(format!(
                "file is {} but the limit is {} per file",
                human_size(size),
                human_size(limits.max_file_bytes)
            ))
        } else if total + size > limits.max_total_bytes {
            Some(format!(
                "total upload size would exceed {}",
                human_size(limits.max_total_bytes)
            ))
        } else if screened.accepted.len() >= limits.max_files {
            Some(format!("only {} attachments are allowed", limits.max_files))
        } else {
            None
        };

        match (rejection, mime) {
            (None, Some(mime)) => {
                total += size;
                screened.accepted.push((file, mime));
            }
            (reason, _) => screened.skipped.push(SkippedFile {
                file_name: file.file_name,
                reason: reason.unwrap_or_else(|| "file type is unknown".to_string()),
            }),
        }
    }

    screened
}

pub fn encode(file: &IncomingFile, mime: &str) -> EncodedFile {
    EncodedFile {
        file_name: file.file_name.clone(),
        content_type: mime.to_string(),
        size: file.bytes.len() as u64,
        data_uri: format!("data:{};base64,{}", mime, STANDARD.encode(&file.bytes)),
    }
}

/// Declared MIME type without parameters, or a guess from the extension when
/// the browser sent nothing useful.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> Option<String> {
    let declared = declared
        .and_then(|d| d.split(';').next())
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    declared.or_else(|| {
        let ext = file_name.rsplit_once('.')?.1.to_lowercase();
        let guessed = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "txt" => "text/plain",
            "md" | "markdown" => "text/markdown",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "mp4" => "video/mp4",
            _ => return None,
        };
        Some(guessed.to_string())
    })
}

fn human_size(bytes: u64) -> String {
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: Option<&str>, size: usize) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            content_type: mime.map(str::to_string),
            bytes: vec![b'x'; size],
        }
    }

    fn small_limits() -> UploadLimits {
        UploadLimits {
            max_file_bytes: 100,
            max_total_bytes: 150,
            max_files: 3,
        }
    }

    fn skipped_names(screened: &Screened) -> Vec<&str> {
        screened.skipped.iter().map(|s| s.file_name.as_str()).collect()
    }

    #[test]
    fn rejects_disallowed_types() {
        let screened = screen(
            vec![
                file("run.exe", Some("application/x-msdownload"), 10),
                file("notes.pdf", Some("application/pdf"), 10),
            ],
            &small_limits(),
        );

        assert_eq!(screened.accepted.len(), 1);
        assert_eq!(skipped_names(&screened), vec!["run.exe"]);
        assert!(screened.skipped[0].reason.contains("not allowed"));
    }

    #[test]
    fn enforces_per_file_and_total_limits() {
        let screened = screen(
            vec![
                file("big.png", Some("image/png"), 101),
                file("a.png", Some("image/png"), 100),
                file("b.png", Some("image/png"), 60),
                file("c.png", Some("image/png"), 50),
            ],
            &small_limits(),
        );

        let accepted: Vec<_> = screened.accepted.iter().map(|(f, _)| f.file_name.as_str()).collect();
        assert_eq!(accepted, vec!["a.png", "c.png"]);
        assert_eq!(skipped_names(&screened), vec!["big.png", "b.png"]);
        assert!(screened.skipped[0].reason.contains("per file"));
        assert!(screened.skipped[1].reason.contains("total upload size"));
    }

    #[test]
    fn reports_files_beyond_attachment_cap() {
        let files = (0..5).map(|i| file(&format!("{i}.txt"), Some("text/plain"), 1)).collect();
        let screened = screen(files, &small_limits());

        assert_eq!(screened.accepted.len(), 3);
        assert_eq!(skipped_names(&screened), vec!["3.txt", "4.txt"]);
        assert!(screened.skipped[0].reason.contains("only 3 attachments"));
    }

    #[test]
    fn empty_files_are_skipped() {
        let screened = screen(vec![file("empty.pdf", Some("application/pdf"), 0)], &small_limits());
        assert_eq!(screened.skipped[0].reason, "file is empty");
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "deck.PDF").as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            resolve_content_type(Some("text/plain; charset=utf-8"), "a.bin").as_deref(),
            Some("text/plain")
        );
        assert_eq!(resolve_content_type(None, "noext"), None);
    }

    #[test]
    fn encodes_as_data_uri() {
        let encoded = encode(&file("hi.txt", Some("text/plain"), 0), "text/plain");
        assert_eq!(encoded.data_uri, "data:text/plain;base64,");

        let hello = IncomingFile {
            file_name: "hello.txt".into(),
            content_type: None,
            bytes: b"hello".to_vec(),
        };
        assert_eq!(encode(&hello, "text/plain").data_uri, "data:text/plain;base64,aGVsbG8=");
    }
}
