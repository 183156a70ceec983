//! Rule compiler and matcher - hot path for dispatch.
//!
//! A [`Rule`] is the compiled form of one path template bound to one
//! endpoint name. Compilation happens once at registration; matching and
//! reverse generation run against the compiled segment list.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::debug;

use crate::dispatcher::View;
use crate::errors::PluginError;
use crate::params::Params;

/// Maximum number of path bindings before heap allocation. Plugin paths
/// rarely carry more than a handful of variables.
pub const MAX_INLINE_BINDINGS: usize = 8;

/// Stack-allocated binding storage for the match hot path.
///
/// Binding names use `Arc<str>` because they come from the static rule
/// tree: cloning is an O(1) atomic increment. Values are per-request
/// strings taken from the URL.
pub type BindingVec = SmallVec<[(Arc<str>, String); MAX_INLINE_BINDINGS]>;

/// Matches a well-formed variable segment: `<name>`.
static VAR_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z_][A-Za-z0-9_]*)>$").expect("variable segment regex"));

/// One segment of a compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must match the corresponding path segment byte-for-byte.
    Literal(String),
    /// Binds the corresponding path segment under the given name.
    Var(Arc<str>),
}

/// A compiled path template bound to an endpoint name and a view.
#[derive(Clone)]
pub struct Rule {
    template: String,
    segments: Vec<Segment>,
    endpoint: String,
    namespace: Option<String>,
    defaults: Params,
    explicit: bool,
    view: View,
}

impl Rule {
    /// Compile a path template into a rule.
    ///
    /// The template is split on `/`; segments written `<name>` become
    /// variables, everything else is literal. Fails with
    /// [`PluginError::InvalidRule`] on a template that does not start with
    /// `/`, a malformed or empty variable name, or a variable name that
    /// appears twice.
    ///
    /// Defaults naming a key that is not a template variable are allowed:
    /// they are free-form extras, merged into view keyword arguments at
    /// dispatch and folded into the query string on generation.
    pub fn compile(
        template: &str,
        endpoint: &str,
        defaults: Params,
        explicit: bool,
        view: View,
    ) -> Result<Self, PluginError> {
        if !template.starts_with('/') {
            return Err(PluginError::invalid_rule(
                template,
                "template must start with '/'",
            ));
        }

        let mut segments = Vec::new();
        let mut var_names: Vec<&str> = Vec::new();
        for raw in template.split('/') {
            if raw.starts_with('<') || raw.ends_with('>') {
                let captures = VAR_SEGMENT.captures(raw).ok_or_else(|| {
                    PluginError::invalid_rule(
                        template,
                        format!("malformed variable segment '{raw}'"),
                    )
                })?;
                let name = match captures.get(1) {
                    Some(m) => m.as_str(),
                    None => {
                        return Err(PluginError::invalid_rule(
                            template,
                            format!("malformed variable segment '{raw}'"),
                        ))
                    }
                };
                if var_names.contains(&name) {
                    return Err(PluginError::invalid_rule(
                        template,
                        format!("duplicate variable name '{name}'"),
                    ));
                }
                var_names.push(name);
                segments.push(Segment::Var(Arc::from(name)));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }

        Ok(Rule {
            template: template.to_string(),
            segments,
            endpoint: endpoint.to_string(),
            namespace: None,
            defaults,
            explicit,
            view,
        })
    }

    /// Recompile this rule mounted under a URL prefix and a module
    /// namespace. The endpoint becomes `namespace.endpoint`.
    pub(crate) fn mounted(&self, prefix: &str, namespace: &str) -> Result<Self, PluginError> {
        let prefix = normalize_prefix(prefix);
        let template = if self.template == "/" {
            format!("{prefix}/")
        } else {
            format!("{prefix}{}", self.template)
        };
        let mut rule = Rule::compile(
            &template,
            &format!("{namespace}.{}", self.endpoint),
            self.defaults.clone(),
            self.explicit,
            Arc::clone(&self.view),
        )?;
        rule.namespace = Some(namespace.to_string());
        Ok(rule)
    }

    /// The source template, including any mount prefix.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The addressable endpoint name (namespace-qualified for module rules).
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The owning module namespace, if this rule was mounted from a module.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Per-rule default values.
    #[must_use]
    pub fn defaults(&self) -> &Params {
        &self.defaults
    }

    /// Whether this endpoint is addressable only by its qualified name.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// The bound view.
    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Iterate the variable names declared in the template.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Var(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Attempt a positional match against decoded path segments.
    ///
    /// Segment counts must be equal; literals compare byte-for-byte;
    /// variable segments bind the path segment under the variable name.
    #[must_use]
    pub fn match_segments(&self, path: &[String]) -> Option<BindingVec> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut bindings = BindingVec::new();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
                Segment::Var(name) => bindings.push((Arc::clone(name), value.clone())),
            }
        }
        debug!(
            template = %self.template,
            endpoint = %self.endpoint,
            bindings = bindings.len(),
            "Rule matched"
        );
        Some(bindings)
    }

    /// Whether every template variable is resolvable from the given
    /// parameters or this rule's defaults.
    #[must_use]
    pub fn is_satisfiable(&self, params: &Params) -> bool {
        self.var_names()
            .all(|name| params.contains(name) || self.defaults.contains(name))
    }

    /// Build the concrete path plus query string for this rule.
    ///
    /// Each variable segment is substituted with the provided value, or the
    /// rule default, percent-encoded. Provided keywords not consumed as
    /// path variables are appended as query parameters in caller insertion
    /// order. Unconsumed default extras never appear in the URL; they are
    /// re-merged into view keyword arguments at dispatch instead.
    pub fn build_path_qs(&self, params: &Params) -> Result<String, PluginError> {
        let mut path = String::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                path.push('/');
            }
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Var(name) => {
                    let value = params
                        .get(name)
                        .or_else(|| self.defaults.get(name))
                        .ok_or_else(|| {
                            PluginError::NotFound(format!(
                                "no value for variable '{name}' of endpoint '{}'",
                                self.endpoint
                            ))
                        })?;
                    path.push_str(&urlencoding::encode(value));
                }
            }
        }

        let consumed: Vec<&str> = self.var_names().collect();
        let query_pairs: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| !consumed.contains(key))
            .collect();

        if !query_pairs.is_empty() {
            path.push('?');
            for (index, (key, value)) in query_pairs.iter().enumerate() {
                if index > 0 {
                    path.push('&');
                }
                path.push_str(&urlencoding::encode(key));
                path.push('=');
                path.push_str(&urlencoding::encode(value));
            }
        }
        Ok(path)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("template", &self.template)
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .field("defaults", &self.defaults)
            .field("explicit", &self.explicit)
            .finish_non_exhaustive()
    }
}

/// Normalize a mount prefix: ensure a leading `/`, strip any trailing `/`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
