//! `multipart/form-data` parsing
//!
//! Bodies are parsed from bytes, so binary uploads survive intact. Only the
//! parts of RFC 7578 browsers and HTTP clients actually produce are
//! supported: one level of parts, `Content-Disposition: form-data` with
//! `name` and optional `filename`, and an optional per-part Content-Type.

use std::error::Error;
use std::fmt;

/// Why a multipart body could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// The boundary parameter is empty or longer than RFC 2046 allows
    InvalidBoundary,
    /// The body never contains the opening delimiter
    MissingDelimiter,
    /// A part's headers are not terminated or not valid UTF-8
    MalformedHeaders,
    /// A part is not followed by a delimiter
    Unterminated,
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipartError::InvalidBoundary => write!(f, "invalid multipart boundary"),
            MultipartError::MissingDelimiter => write!(f, "multipart body has no opening delimiter"),
            MultipartError::MalformedHeaders => write!(f, "malformed multipart part headers"),
            MultipartError::Unterminated => write!(f, "multipart part is not terminated"),
        }
    }
}

impl Error for MultipartError {}

/// One part of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name from Content-Disposition
    pub name: String,
    /// Client-side filename, present for file inputs (possibly empty)
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    /// Whether the client actually attached a file to this part
    pub fn has_file(&self) -> bool {
        self.filename.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// A parsed multipart form, parts kept in body order
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub parts: Vec<Part>,
}

impl MultipartForm {
    /// Parse a complete body using the boundary from the Content-Type header
    pub fn parse(body: &[u8], boundary: &str) -> Result<Self, MultipartError> {
        if boundary.is_empty() || boundary.len() > 70 {
            return Err(MultipartError::InvalidBoundary);
        }

        let delimiter = format!("--{}", boundary).into_bytes();
        let mut next_delimiter = b"\r\n".to_vec();
        next_delimiter.extend_from_slice(&delimiter);

        // Anything before the first delimiter is preamble.
        let first = find(body, &delimiter, 0).ok_or(MultipartError::MissingDelimiter)?;
        let mut pos = first + delimiter.len();
        let mut parts = Vec::new();

        loop {
            if body[pos..].starts_with(b"--") {
                break;
            }

            // Transport padding is allowed between the delimiter and its CRLF.
            while pos < body.len() && (body[pos] == b' ' || body[pos] == b'\t') {
                pos += 1;
            }
            if !body[pos..].starts_with(b"\r\n") {
                return Err(MultipartError::Unterminated);
            }
            pos += 2;

            let (headers, content_start) = if body[pos..].starts_with(b"\r\n") {
                ("", pos + 2)
            } else {
                let end = find(body, b"\r\n\r\n", pos).ok_or(MultipartError::MalformedHeaders)?;
                let headers = std::str::from_utf8(&body[pos..end])
                    .map_err(|_| MultipartError::MalformedHeaders)?;
                (headers, end + 4)
            };

            let content_end = find(body, &next_delimiter, content_start)
                .ok_or(MultipartError::Unterminated)?;

            if let Some(part) = build_part(headers, &body[content_start..content_end]) {
                parts.push(part);
            }

            pos = content_end + next_delimiter.len();
        }

        Ok(Self { parts })
    }

    /// First non-file field with this name, as text
    pub fn field(&self, name: &str) -> Option<String> {
        self.parts
            .iter()
            .find(|part| part.name == name && part.filename.is_none())
            .map(|part| String::from_utf8_lossy(&part.data).into_owned())
    }

    /// First part with this name that carries an actual file
    pub fn file(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name && part.has_file())
    }
}

fn build_part(headers: &str, data: &[u8]) -> Option<Part> {
    let mut disposition = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("content-disposition") {
            disposition = Some(value.trim());
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let params = disposition_params(disposition?);
    let name = params.iter().find(|(k, _)| k == "name")?.1.clone();
    let filename = params
        .into_iter()
        .find(|(k, _)| k == "filename")
        .map(|(_, v)| v);

    Some(Part {
        name,
        filename,
        content_type,
        data: data.to_vec(),
    })
}

/// Split `form-data; name="a"; filename="b"` into lowercase keys and
/// unquoted values. Semicolons inside quotes belong to the value.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // Skip the disposition type.
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut val = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                val.push(escaped);
                            }
                        }
                        _ => val.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ';' {
                        break;
                    }
                    val.push(c);
                    chars.next();
                }
                val = val.trim().to_string();
            }
        }

        params.push((key.trim().to_ascii_lowercase(), val));
    }

    params
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut out = b"preamble is ignored\r\n".to_vec();
        for (name, filename, data) in parts {
            out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match filename {
                Some(filename) => {
                    out.extend_from_slice(format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    ).as_bytes());
                }
                None => {
                    out.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                }
            }
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        out
    }

    #[test]
    fn test_file_and_field() {
        let payload = body(&[
            ("file", Some("report.pdf"), &b"%PDF-1.4\r\n\x00\xffbinary"[..]),
            ("branch", None, &b"adama"[..]),
        ]);
        let form = MultipartForm::parse(&payload, BOUNDARY).unwrap();

        let file = form.file("file").unwrap();
        assert_eq!(file.filename.as_deref(), Some("report.pdf"));
        assert_eq!(file.content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(file.data, b"%PDF-1.4\r\n\x00\xffbinary");
        assert_eq!(form.field("branch").as_deref(), Some("adama"));
    }

    #[test]
    fn test_field_before_file_and_empty_values() {
        let payload = body(&[("branch", None, &b""[..]), ("file", Some("empty.txt"), &b""[..])]);
        let form = MultipartForm::parse(&payload, BOUNDARY).unwrap();

        assert_eq!(form.field("branch").as_deref(), Some(""));
        assert_eq!(form.file("file").unwrap().data, b"");
    }

    #[test]
    fn test_empty_filename_is_not_a_file() {
        let payload = body(&[("file", Some(""), &b""[..]), ("branch", None, &b"mekele"[..])]);
        let form = MultipartForm::parse(&payload, BOUNDARY).unwrap();

        assert!(form.file("file").is_none());
        assert_eq!(form.parts.len(), 2);
    }

    #[test]
    fn test_quoted_params_with_semicolons_and_escapes() {
        let params = disposition_params(r#"form-data; name="file"; filename="a;b \"c\".txt""#);
        assert_eq!(params, vec![
            ("name".to_string(), "file".to_string()),
            ("filename".to_string(), "a;b \"c\".txt".to_string()),
        ]);
    }

    #[test]
    fn test_missing_and_unterminated_delimiters() {
        assert_eq!(
            MultipartForm::parse(b"no delimiter here", BOUNDARY).unwrap_err(),
            MultipartError::MissingDelimiter
        );

        let truncated = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"branch\"\r\n\r\nadama",
            BOUNDARY
        );
        assert_eq!(
            MultipartForm::parse(truncated.as_bytes(), BOUNDARY).unwrap_err(),
            MultipartError::Unterminated
        );
    }

    #[test]
    fn test_invalid_boundary() {
        assert_eq!(MultipartForm::parse(b"", "").unwrap_err(), MultipartError::InvalidBoundary);
        let long = "x".repeat(71);
        assert_eq!(MultipartForm::parse(b"", &long).unwrap_err(), MultipartError::InvalidBoundary);
    }
}
