//! Incoming request parsing.
//!
//! One `Request` is constructed per process invocation from the raw
//! arguments the host passes on the command line and is immutable
//! afterwards. The virtual URL has the shape
//! `scheme://authority/path/segments?query` where `scheme://authority`
//! identifies the plugin instance, the path is matched against rules, and
//! the query supplies extra keyword arguments.
//!
//! Older hosts split the URL across the invocation arguments in several
//! ways: the path may ride in the first argument, or in the third together
//! with the query string (`"/videos/?foo=bar"`), or the third argument may
//! be a bare `"?"`. [`Request::from_invocation`] reassembles all of these
//! by appending the third argument, when present, to the first.

use indexmap::IndexMap;
use tracing::debug;
use url::Url;

use crate::errors::PluginError;

/// A parsed process invocation: decoded path segments plus query mapping.
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    handle: i32,
    path: String,
    segments: Vec<String>,
    query: IndexMap<String, Vec<String>>,
}

impl Request {
    /// Parse a full virtual URL and a host handle into a request.
    ///
    /// The path is split on `/` and each segment is percent-decoded; the
    /// query component is parsed into an ordered key → values mapping
    /// (repeated keys accumulate).
    pub fn new(url: &str, handle: i32) -> Result<Self, PluginError> {
        let parsed = Url::parse(url)
            .map_err(|e| PluginError::BadInvocation(format!("cannot parse url '{url}': {e}")))?;

        // An empty path ("plugin://id?") addresses the root view.
        let raw_path = match parsed.path() {
            "" => "/",
            p => p,
        };
        let segments = split_path(raw_path)?;

        let mut query: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in parsed.query_pairs() {
            query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        debug!(
            url = %url,
            handle = handle,
            path = %raw_path,
            segment_count = segments.len(),
            query_keys = query.len(),
            "Request parsed"
        );

        Ok(Request {
            url: url.to_string(),
            handle,
            path: raw_path.to_string(),
            segments,
            query,
        })
    }

    /// Build a request from raw invocation arguments.
    ///
    /// Expects `[url, handle]` or `[url, handle, extra]` where `extra` is a
    /// query string, a path, or a path plus query string, and is appended
    /// verbatim to the url.
    pub fn from_invocation(argv: &[String]) -> Result<Self, PluginError> {
        if argv.is_empty() {
            return Err(PluginError::BadInvocation(
                "no invocation arguments".to_string(),
            ));
        }
        let mut url = argv[0].clone();
        if let Some(extra) = argv.get(2) {
            url.push_str(extra);
        }
        let handle = match argv.get(1) {
            Some(raw) => raw.parse::<i32>().map_err(|_| {
                PluginError::BadInvocation(format!("handle '{raw}' is not an integer"))
            })?,
            None => 0,
        };
        Request::new(&url, handle)
    }

    /// The reassembled virtual URL this request was parsed from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The host handle for this invocation.
    #[must_use]
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// The raw (still percent-encoded) path component.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Percent-decoded path segments, including the leading empty segment.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The parsed query mapping, in first-seen key order.
    #[must_use]
    pub fn query(&self) -> &IndexMap<String, Vec<String>> {
        &self.query
    }

    /// First value for a query key, if any.
    #[must_use]
    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Split a path on `/` and percent-decode each segment.
///
/// Decoding happens after splitting, so an encoded `/` inside a segment
/// (`http%3A%2F%2F...`) stays within its segment.
pub(crate) fn split_path(path: &str) -> Result<Vec<String>, PluginError> {
    path.split('/')
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .map_err(|e| {
                    PluginError::BadInvocation(format!("undecodable path segment '{segment}': {e}"))
                })
        })
        .collect()
}

/// Extract decoded path segments from a redirect target, which may be a
/// full plugin URL or a bare path.
pub(crate) fn target_segments(target: &str) -> Result<Vec<String>, PluginError> {
    if target.contains("://") {
        let parsed = Url::parse(target).map_err(|e| {
            PluginError::BadInvocation(format!("cannot parse redirect target '{target}': {e}"))
        })?;
        let raw_path = match parsed.path() {
            "" => "/",
            p => p,
        };
        split_path(raw_path)
    } else {
        split_path(target)
    }
}
