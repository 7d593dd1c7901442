//! Minimal `multipart/form-data` encoder for single-file uploads.
//!
//! `ureq` 2 sends raw bodies only, so the upload endpoints get their form
//! body built here: one `file` field carrying the workbook bytes.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Encoded form body ready for `send_bytes`.
#[derive(Debug)]
pub struct MultipartBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Encode `data` as the form field `field` with the given file name.
pub fn encode_file(field: &str, file_name: &str, data: &[u8]) -> MultipartBody {
    let boundary = new_boundary();
    encode_with_boundary(&boundary, field, file_name, data)
}

fn encode_with_boundary(boundary: &str, field: &str, file_name: &str, data: &[u8]) -> MultipartBody {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            header_safe(field),
            header_safe(file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_for(file_name)).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body,
    }
}

fn new_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("----abcxyz{token}")
}

/// Quotes and line breaks would end the header value early.
fn header_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// MIME type for an Excel workbook name.
pub fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".xlsx") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    } else if lower.ends_with(".xls") {
        "application/vnd.ms-excel"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_expected_layout() {
        let encoded = encode_with_boundary("XYZ", "file", "stock.xlsx", b"PK\x03\x04");
        assert_eq!(encoded.content_type, "multipart/form-data; boundary=XYZ");

        let text = String::from_utf8_lossy(&encoded.body);
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"stock.xlsx\""));
        assert!(text.contains("spreadsheetml.sheet\r\n\r\nPK"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn file_name_cannot_break_header() {
        let encoded = encode_with_boundary("B", "file", "evil\"\r\nX-Injected: 1.xls", b"");
        let text = String::from_utf8_lossy(&encoded.body);
        assert!(!text.contains("\r\nX-Injected"));
        assert!(text.contains("application/vnd.ms-excel"));
    }

    #[test]
    fn boundaries_are_unique() {
        assert_ne!(new_boundary(), new_boundary());
        assert!(new_boundary().starts_with("----abcxyz"));
    }
}
