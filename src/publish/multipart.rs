//! Ручная сборка тела `multipart/form-data`.
//!
//! Тело собирается в готовый буфер заранее, чтобы точная длина была
//! известна до отправки и кодирование проверялось без транспорта.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const CRLF: &str = "\r\n";
const BOUNDARY_PREFIX: &str = "----MpPublishBoundary";

/// Граница из метки времени и случайного хвоста
pub fn generate_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!(
        "{}{}{}",
        BOUNDARY_PREFIX,
        Utc::now().timestamp_millis(),
        suffix
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug)]
pub struct MultipartBuilder {
    boundary: String,
    bytes: Vec<u8>,
}

impl Default for MultipartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        MultipartBuilder {
            boundary: boundary.into(),
            bytes: Vec::new(),
        }
    }

    /// Файловая часть с именем файла и типом содержимого
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.part_header(name, filename, content_type);
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(CRLF.as_bytes());
        self
    }

    fn part_header(&mut self, name: &str, filename: &str, content_type: &str) {
        let header = format!(
            "--{}{CRLF}Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"{CRLF}Content-Type: {}{CRLF}{CRLF}",
            self.boundary,
            escape_quoted(name),
            escape_quoted(filename),
            content_type
        );
        self.bytes.extend_from_slice(header.as_bytes());
    }

    pub fn build(mut self) -> MultipartBody {
        self.bytes
            .extend_from_slice(format!("--{}--{CRLF}", self.boundary).as_bytes());
        MultipartBody {
            boundary: self.boundary,
            bytes: self.bytes,
        }
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_part_layout() {
        let body = MultipartBuilder::with_boundary("XYZ")
            .file("media", "cover.png", "image/png", b"\x89PNG")
            .build();

        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"media\"; filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        expected.extend_from_slice(b"\x89PNG");
        expected.extend_from_slice(b"\r\n--XYZ--\r\n");

        assert_eq!(body.as_bytes(), expected.as_slice());
        assert_eq!(body.content_length(), expected.len());
        assert_eq!(body.content_type(), "multipart/form-data; boundary=XYZ");
    }

    #[test]
    fn test_empty_payload_still_framed() {
        let body = MultipartBuilder::with_boundary("b")
            .file("media", "x.gif", "image/gif", b"")
            .build();
        let text = String::from_utf8(body.into_bytes()).unwrap();
        assert!(text.ends_with("Content-Type: image/gif\r\n\r\n\r\n--b--\r\n"));
    }

    #[test]
    fn test_filename_quotes_escaped() {
        let body = MultipartBuilder::with_boundary("b")
            .file("media", "a\"b.png", "image/png", b"")
            .build();
        let text = String::from_utf8(body.into_bytes()).unwrap();
        assert!(text.contains("filename=\"a\\\"b.png\""));
    }

    #[test]
    fn test_generated_boundaries_differ() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert!(a.starts_with(BOUNDARY_PREFIX));
        assert_ne!(a, b);
    }
}
