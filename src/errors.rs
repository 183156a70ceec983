//! Error types for registration, routing, dispatch, and storage.
//!
//! Registration failures (`InvalidRule`) are fatal to startup: they are
//! returned from the builder phase before any dispatch can happen. Lookup
//! failures (`NotFound`, `AmbiguousUrl`) are normal errors the caller is
//! expected to handle or propagate. View errors pass through `View`
//! unmodified; there is no retry anywhere.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A path template could not be compiled into a rule.
    ///
    /// Raised at registration time, before any dispatch. Covers duplicate
    /// variable names, empty variable names, and templates that do not
    /// start with `/`.
    #[error("invalid rule '{template}': {reason}")]
    InvalidRule {
        /// The offending path template.
        template: String,
        /// Why compilation failed.
        reason: String,
    },

    /// Forward dispatch found no matching rule, or reverse lookup found no
    /// endpoint / no satisfiable rule.
    #[error("not found: {0}")]
    NotFound(String),

    /// An unqualified reverse lookup from module scope resolved in both the
    /// module's own namespace and the root registry. Never silently
    /// resolved; disambiguate with a namespaced name or an explicit lookup.
    #[error("ambiguous endpoint '{endpoint}': registered in both module and root scope")]
    AmbiguousUrl {
        /// The bare endpoint name that was looked up.
        endpoint: String,
    },

    /// A dispatch run followed more redirect hops than the configured bound.
    #[error("redirect limit of {limit} hops exceeded while dispatching '{url}'")]
    RedirectLimit {
        /// The configured hop bound.
        limit: usize,
        /// The last redirect target.
        url: String,
    },

    /// The process invocation arguments could not be parsed into a request.
    #[error("malformed invocation: {0}")]
    BadInvocation(String),

    /// Filesystem failure while loading or syncing a storage instance.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A storage file exists but does not hold a readable entry map.
    #[error("storage format error: {0}")]
    StorageFormat(#[from] serde_json::Error),

    /// An error raised by view code. Propagates unmodified to the process
    /// boundary; the routing core does not catch or retry it.
    #[error(transparent)]
    View(#[from] anyhow::Error),
}

impl PluginError {
    pub(crate) fn invalid_rule(template: &str, reason: impl Into<String>) -> Self {
        PluginError::InvalidRule {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}
