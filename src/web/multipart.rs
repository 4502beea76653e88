//! `multipart/form-data` body parsing for the upload form.

use anyhow::{anyhow, Result};

use crate::web::http::find;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    /// `None` for plain fields, possibly empty for file fields left blank.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Boundary from a `Content-Type` header, or `None` if the body is not
/// multipart form data.
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params.find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<FormPart>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let separator = format!("\r\n--{}", boundary).into_bytes();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| anyhow!("multipart body has no opening boundary"))?
        + delimiter.len();
    let mut parts = Vec::new();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            break;
        }
        if !rest.starts_with(b"\r\n") {
            return Err(anyhow!("multipart boundary not followed by CRLF"));
        }
        let start = pos + 2;
        let end = find(body, &separator, start)
            .ok_or_else(|| anyhow!("multipart part is not terminated"))?;
        parts.push(parse_part(&body[start..end])?);
        pos = end + separator.len();
    }
    Ok(parts)
}

fn parse_part(raw: &[u8]) -> Result<FormPart> {
    let header_end =
        find(raw, b"\r\n\r\n", 0).ok_or_else(|| anyhow!("multipart part has no header block"))?;
    let head = String::from_utf8_lossy(&raw[..header_end]);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                if let Some((k, v)) = param.trim().split_once('=') {
                    let v = v.trim().trim_matches('"').to_string();
                    match k.trim().to_ascii_lowercase().as_str() {
                        "name" => name = Some(v),
                        "filename" => filename = Some(v),
                        _ => {}
                    }
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    Ok(FormPart {
        name: name.ok_or_else(|| anyhow!("multipart part has no name"))?,
        filename,
        content_type,
        data: raw[header_end + 4..].to_vec(),
    })
}
