//! HTTP headers, for requests and responses.
use std::collections::BTreeMap;

/// HTTP headers, one value per name.
///
/// Names are case-insensitive and kept lowercase. Headers are written to the
/// wire sorted by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    headers: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous value.
    ///
    /// # Example
    ///
    /// ```
    /// # use chat_backend::http::Headers;
    /// let mut headers = Headers::new();
    /// headers.insert("X-Total-Count", "134");
    /// assert_eq!(headers.get("x-total-count"), Some(&String::from("134")));
    /// ```
    pub fn insert(&mut self, name: impl ToString, value: impl ToString) {
        self.headers
            .insert(name.to_string().to_lowercase(), value.to_string());
    }

    /// Get a header value by name. Case insensitive.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Serialize for the wire: a `name: value\r\n` line per header.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.headers
            .iter()
            .flat_map(|(name, value)| format!("{}: {}\r\n", name, value).into_bytes())
            .collect()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Headers {
    fn from(headers: [(&str, &str); N]) -> Self {
        let mut result = Self::new();
        for (name, value) in headers {
            result.insert(name, value);
        }
        result
    }
}
