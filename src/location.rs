//! Parsing of user-supplied object references.
//!
//! Two grammars are recognized, tried in this order:
//!
//! - `s3://bucket/key` (native scheme; `s3://bucket/` addresses the whole bucket)
//! - `https://<endpoint-host>/bucket/key` (path-style endpoint URL, percent-encoded)
//!
//! A key that is empty or ends in `/` turns the location into a prefix query.

use crate::error::{CcatError, Result};
use percent_encoding::percent_decode_str;
use std::fmt;

/// Native scheme marker
pub const PREFIX_S3: &str = "s3://";

/// HTTPS endpoint marker
pub const PREFIX_HTTPS: &str = "https://";

/// Path separator inside object keys
pub const SEPARATOR: char = '/';

/// A parsed reference to one object or to every object under a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    bucket: String,
    key: String,
    is_prefix_query: bool,
}

impl Location {
    /// Build a location from an already-split bucket and key.
    ///
    /// Returns `MalformedLocation` if the bucket is empty.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() {
            return Err(CcatError::MalformedLocation(format!(
                "empty bucket name in {}{}/{}",
                PREFIX_S3, bucket, key
            )));
        }
        let is_prefix_query = key.is_empty() || key.ends_with(SEPARATOR);
        Ok(Self {
            bucket,
            key,
            is_prefix_query,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key, or the prefix when [`is_prefix_query`](Self::is_prefix_query) is true.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_prefix_query(&self) -> bool {
        self.is_prefix_query
    }

    /// The single object this location names, if it is not a prefix query.
    pub fn object(&self) -> Option<ObjectRef> {
        if self.is_prefix_query {
            None
        } else {
            Some(ObjectRef::new(self.bucket.clone(), self.key.clone()))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", PREFIX_S3, self.bucket, self.key)
    }
}

/// A fully resolved object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", PREFIX_S3, self.bucket, self.key)
    }
}

/// Parse a raw location string.
///
/// ```
/// use ccat::location::parse;
///
/// let a = parse("s3://my-bucket/my-key")?;
/// let b = parse("https://s3-us-west-2.amazonaws.com/my-bucket/my-key")?;
/// assert_eq!(a, b);
/// assert!(!a.is_prefix_query());
///
/// assert!(parse("s3://my-bucket/logs/")?.is_prefix_query());
/// # Ok::<(), ccat::CcatError>(())
/// ```
pub fn parse(raw: &str) -> Result<Location> {
    if let Some(rest) = raw.strip_prefix(PREFIX_S3) {
        return parse_native(raw, rest);
    }
    if let Some(rest) = raw.strip_prefix(PREFIX_HTTPS) {
        return parse_https(raw, rest);
    }
    Err(CcatError::UnrecognizedScheme(raw.to_string()))
}

fn parse_native(raw: &str, rest: &str) -> Result<Location> {
    let (bucket, key) = rest
        .split_once(SEPARATOR)
        .ok_or_else(|| CcatError::MalformedLocation(format!("no key in s3 location: {}", raw)))?;
    Location::new(bucket, key)
}

fn parse_https(raw: &str, rest: &str) -> Result<Location> {
    let unescape_error =
        || CcatError::MalformedLocation(format!("could not unescape url: {}", raw));
    if !has_valid_escapes(rest) {
        return Err(unescape_error());
    }

    // Decode first so escaped separators split like literal ones.
    let decoded = percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| unescape_error())?;

    let mut segments = decoded.splitn(3, SEPARATOR);
    match (segments.next(), segments.next(), segments.next()) {
        (Some(_host), Some(bucket), Some(key)) => Location::new(bucket, key),
        _ => Err(CcatError::MalformedLocation(format!(
            "could not parse http s3 key: {}",
            raw
        ))),
    }
}

/// Every `%` must start a two-hex-digit escape.
///
/// `percent_decode_str` passes malformed escapes through untouched, which
/// would silently address a different key.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_native_object() {
        let loc = parse("s3://my-bucket/some/key/path.bin").unwrap();
        assert_eq!(loc.bucket(), "my-bucket");
        assert_eq!(loc.key(), "some/key/path.bin");
        assert!(!loc.is_prefix_query());
        assert_eq!(
            loc.object(),
            Some(ObjectRef::new("my-bucket", "some/key/path.bin"))
        );
    }

    #[test]
    fn test_parse_native_prefix() {
        let loc = parse("s3://my-bucket/logs/2024/").unwrap();
        assert_eq!(loc.bucket(), "my-bucket");
        assert_eq!(loc.key(), "logs/2024/");
        assert!(loc.is_prefix_query());
        assert_eq!(loc.object(), None);
    }

    #[test]
    fn test_parse_native_whole_bucket() {
        let loc = parse("s3://my-bucket/").unwrap();
        assert_eq!(loc.bucket(), "my-bucket");
        assert_eq!(loc.key(), "");
        assert!(loc.is_prefix_query());
    }

    #[test]
    fn test_parse_native_keeps_key_verbatim() {
        // Native URIs are not percent-decoded
        let loc = parse("s3://b/a%20b").unwrap();
        assert_eq!(loc.key(), "a%20b");
    }

    #[test]
    fn test_parse_native_no_key() {
        let err = parse("s3://onlybucket").unwrap_err();
        assert!(matches!(err, CcatError::MalformedLocation(_)));
    }

    #[test]
    fn test_parse_native_empty_bucket() {
        let err = parse("s3:///key").unwrap_err();
        assert!(matches!(err, CcatError::MalformedLocation(_)));
    }

    #[test]
    fn test_parse_https_matches_native() {
        let https = parse("https://s3-us-west-2.amazonaws.com/my-bucket/my-key").unwrap();
        let native = parse("s3://my-bucket/my-key").unwrap();
        assert_eq!(https, native);
    }

    #[test]
    fn test_parse_https_percent_decoding() {
        let loc = parse("https://host/bucket/a%20b").unwrap();
        assert_eq!(loc.bucket(), "bucket");
        assert_eq!(loc.key(), "a b");
    }

    #[test]
    fn test_parse_https_escaped_separator() {
        let loc = parse("https://host/bucket/dir%2Ffile%2B1.txt").unwrap();
        assert_eq!(loc.key(), "dir/file+1.txt");
        assert!(!loc.is_prefix_query());

        let loc = parse("https://host/bucket%2Fdir%2F").unwrap();
        assert_eq!(loc.bucket(), "bucket");
        assert_eq!(loc.key(), "dir/");
        assert!(loc.is_prefix_query());
    }

    #[test]
    fn test_parse_https_prefix() {
        let loc = parse("https://s3.amazonaws.com/bucket/").unwrap();
        assert_eq!(loc.bucket(), "bucket");
        assert!(loc.is_prefix_query());
    }

    #[test]
    fn test_parse_https_too_few_segments() {
        let err = parse("https://s3.amazonaws.com/bucket").unwrap_err();
        assert!(matches!(err, CcatError::MalformedLocation(_)));

        let err = parse("https://s3.amazonaws.com").unwrap_err();
        assert!(matches!(err, CcatError::MalformedLocation(_)));
    }

    #[test]
    fn test_parse_https_invalid_utf8() {
        let err = parse("https://host/bucket/%FF%FE").unwrap_err();
        assert!(matches!(err, CcatError::MalformedLocation(_)));
    }

    #[test]
    fn test_parse_https_bad_escapes() {
        for raw in [
            "https://host/bucket/a%zz",
            "https://host/bucket/a%2",
            "https://host/bucket/100%",
            "https://host/bu%g1cket/key",
        ] {
            match parse(raw) {
                Err(CcatError::MalformedLocation(msg)) => {
                    assert!(msg.starts_with("could not unescape url"), "{}", msg);
                    assert!(msg.contains(raw));
                }
                other => panic!("{} parsed as {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_parse_https_literal_percent_escaped() {
        let loc = parse("https://host/bucket/100%25").unwrap();
        assert_eq!(loc.key(), "100%");
    }

    #[test]
    fn test_parse_unrecognized_scheme() {
        let err = parse("ftp://x/y").unwrap_err();
        assert!(matches!(err, CcatError::UnrecognizedScheme(_)));

        let err = parse("http://s3.amazonaws.com/bucket/key").unwrap_err();
        assert!(matches!(err, CcatError::UnrecognizedScheme(_)));

        let err = parse("my-bucket/my-key").unwrap_err();
        assert!(matches!(err, CcatError::UnrecognizedScheme(_)));
    }

    #[test]
    fn test_round_trip_native() {
        let cases = [
            ("b", "k", false),
            ("b", "dir/k.txt", false),
            ("b", "dir/", true),
            ("b", "", true),
        ];
        for (bucket, key, prefix) in cases {
            let loc = parse(&format!("s3://{}/{}", bucket, key)).unwrap();
            assert_eq!(loc.bucket(), bucket);
            assert_eq!(loc.key(), key);
            assert_eq!(loc.is_prefix_query(), prefix, "key {:?}", key);
            assert_eq!(loc.to_string(), format!("s3://{}/{}", bucket, key));
        }
    }
}
