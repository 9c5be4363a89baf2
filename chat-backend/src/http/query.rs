//! URL query string.
use std::str::FromStr;

use super::urldecode;

/// Parsed query, e.g. `page=0&size=20&sort=id,desc&sort=userName`.
///
/// Pairs are kept in the order they were sent and names can repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parse the part of the URL after `?`.
    ///
    /// A name without `=` gets an empty value. Pairs with more than one
    /// `=` are dropped.
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (!value.contains('=')).then(|| (urldecode(name), urldecode(value)))
            })
            .collect();

        Self { pairs }
    }

    /// First value of `name`, if it's there and parses as `T`.
    pub fn get<T: FromStr>(&self, name: &str) -> Option<T> {
        self.values(name).next().and_then(|value| value.parse().ok())
    }

    /// Every value of `name`, in request order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.values(name).collect()
    }

    fn values<'a: 'b, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a str> + 'b {
        self.pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}
