// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! `multipart/form-data` bodies

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{Error, Result};

const CRLF: &[u8] = b"\r\n";

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name
    pub name: String,
    /// File name, for file parts
    pub filename: Option<String>,
    /// Part content type
    pub content_type: Option<String>,
    /// Payload bytes
    pub data: Bytes,
}

impl Part {
    /// Create a plain text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// Create a file part
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }
}

/// Ordered multipart body with a random boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Create an empty body with a freshly generated boundary
    pub fn new() -> Self {
        Self::with_boundary(format!(
            "Boundary-{}",
            Uuid::new_v4().to_string().to_uppercase()
        ))
    }

    /// Create an empty body with a fixed boundary
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a text field
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Append a file
    pub fn file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.part(Part::file(name, filename, content_type, data))
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Value for the `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Serialize the body. The closing boundary is written exactly once.
    pub fn encode(&self) -> Bytes {
        let delimiter = format!("--{}", self.boundary);
        let mut out = BytesMut::new();

        for part in &self.parts {
            out.put_slice(delimiter.as_bytes());
            out.put_slice(CRLF);

            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(ref filename) = part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", filename));
            }
            out.put_slice(disposition.as_bytes());
            out.put_slice(CRLF);

            if let Some(ref content_type) = part.content_type {
                out.put_slice(format!("Content-Type: {}", content_type).as_bytes());
                out.put_slice(CRLF);
            }

            out.put_slice(CRLF);
            out.put_slice(&part.data);
            out.put_slice(CRLF);
        }

        out.put_slice(delimiter.as_bytes());
        out.put_slice(b"--");
        out.put_slice(CRLF);
        out.freeze()
    }

    /// Decompose an encoded body back into its parts
    pub fn parse(body: &[u8], boundary: &str) -> Result<Self> {
        let delimiter = format!("--{}", boundary).into_bytes();
        let separator = [CRLF, delimiter.as_slice()].concat();

        let mut rest = body
            .strip_prefix(delimiter.as_slice())
            .ok_or_else(|| malformed("body does not start with the boundary"))?;
        let mut parts = Vec::new();

        loop {
            if let Some(tail) = rest.strip_prefix(b"--".as_slice()) {
                if !(tail.is_empty() || tail == CRLF) {
                    return Err(malformed("data after the closing boundary"));
                }
                return Ok(Self {
                    boundary: boundary.to_string(),
                    parts,
                });
            }

            rest = rest
                .strip_prefix(CRLF)
                .ok_or_else(|| malformed("missing line break after boundary"))?;
            let end = find(rest, &separator).ok_or_else(|| malformed("unterminated part"))?;
            parts.push(parse_part(&rest[..end])?);
            rest = &rest[end + separator.len()..];
        }
    }
}

fn parse_part(raw: &[u8]) -> Result<Part> {
    let split = find(raw, b"\r\n\r\n").ok_or_else(|| malformed("part without header block"))?;
    let head = std::str::from_utf8(&raw[..split])
        .map_err(|_| malformed("part headers are not UTF-8"))?;
    let data = Bytes::copy_from_slice(&raw[split + 4..]);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            name = quoted_param(value, "name");
            filename = quoted_param(value, "filename");
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    Ok(Part {
        name: name.ok_or_else(|| malformed("part without a name"))?,
        filename,
        content_type,
        data,
    })
}

fn quoted_param(header: &str, key: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn malformed(reason: &str) -> Error {
    Error::Decoding(format!("malformed multipart body: {}", reason))
}
