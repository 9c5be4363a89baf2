//! URL handling helpers.
//!
//! # Example
//!
//! ```
//! use chat_backend::http::urldecode;
//!
//! assert_eq!(urldecode("id%2Cdesc"), "id,desc");
//! ```

/// Decode a string encoded with percent-encoding, also known as URL encoding.
///
/// Escapes decode to bytes, so multi-byte UTF-8 sequences come out whole. Invalid
/// escapes are kept as-is and `+` is a space.
pub fn urldecode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());

                match hex {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'%');
                        i += 1;
                    }
                }
            }

            b'+' => {
                result.push(b' ');
                i += 1;
            }

            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&result).to_string()
}
