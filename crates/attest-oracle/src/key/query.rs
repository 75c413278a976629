//! Query-string parsing for key derivation.
//!
//! Parameters are collected into a name -> values mapping so that the order
//! in which independent parameters appear in the URL never affects key
//! equality. Repeated parameters are legal and keep all values in order.

use std::collections::BTreeMap;

/// Ordered multimap of query parameters.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Split a URL into its path part and parsed query parameters.
pub fn split_url(url: &str) -> (String, QueryParams) {
    match url.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query_string(query)),
        None => (url.to_string(), QueryParams::new()),
    }
}

/// Parse a raw query string into a parameter mapping.
pub fn parse_query_string(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name, value),
            None => (pair, ""),
        };
        let name = urlencoding::decode(name)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| name.to_string());
        let value = urlencoding::decode(value)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.entry(name).or_default().push(value);
    }
    params
}
