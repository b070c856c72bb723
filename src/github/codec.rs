// src/github/codec.rs
// =============================================================================
// Base64 handling for the Contents API.
//
// GitHub sends file bodies base64-encoded with a line break every 60
// characters, and expects uploads as base64 without any line breaks.
// =============================================================================

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::types::FileBody;

// Decodes a Contents API body, ignoring the embedded line breaks
pub fn decode_content(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(compact)
}

// Encodes text for a PUT request
pub fn encode_content(text: &str) -> String {
    BASE64.encode(text.as_bytes())
}

// Text if it is UTF-8, otherwise just remember how big it was
pub fn classify(bytes: Vec<u8>) -> FileBody {
    match String::from_utf8(bytes) {
        Ok(text) => FileBody::Text(text),
        Err(e) => FileBody::Binary(e.into_bytes().len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_line_breaks() {
        // "hello world, this is a longer line" split the way GitHub does it
        let raw = "aGVsbG8gd29ybGQsIHRoaXMg\naXMgYSBsb25nZXIgbGluZQ==\n";
        let bytes = decode_content(raw).unwrap();
        assert_eq!(bytes, b"hello world, this is a longer line");
    }

    #[test]
    fn test_encode_has_no_line_breaks() {
        let text = "x".repeat(500);
        let encoded = encode_content(&text);
        assert!(!encoded.contains('\n'));
        assert_eq!(decode_content(&encoded).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_content("not base64!!").is_err());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(b"fn main() {}".to_vec()), FileBody::Text("fn main() {}".to_string()));
        assert_eq!(classify(vec![0xff, 0xfe, 0x00]), FileBody::Binary(3));
    }
}
