//! The aggregated rule registry.
//!
//! A [`Registry`] holds every compiled rule of a plugin — root rules plus
//! all module rules merged under their mount prefixes — in registration
//! order, together with an endpoint index for reverse lookup. It is built
//! once by the builder phase and immutable afterwards: matching and
//! reverse generation never mutate it.
//!
//! ## Endpoint addressing
//!
//! Root rules are indexed under their bare endpoint name. Module rules are
//! indexed under `namespace.name`. Reverse lookup resolves a bare name
//! against the calling scope first (a module looks in its own namespace
//! before the root); a qualified or explicit lookup searches exactly one
//! key and never falls back.
//!
//! ## Ambiguity
//!
//! An unqualified lookup from module scope that resolves both locally and
//! at the root fails with [`PluginError::AmbiguousUrl`] rather than
//! silently picking one. Root-scope lookups never reach into modules, so
//! they cannot be ambiguous.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::dispatcher::View;
use crate::errors::PluginError;
use crate::params::Params;
use crate::router::{BindingVec, Rule};

/// The scope a reverse lookup is issued from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Plugin code outside any module.
    Root,
    /// Code inside the module with this namespace.
    Module(String),
}

/// Immutable, ordered collection of every rule addressable by the plugin.
#[derive(Debug, Clone)]
pub struct Registry {
    plugin_root: String,
    rules: Vec<Arc<Rule>>,
    by_endpoint: IndexMap<String, Vec<Arc<Rule>>>,
}

impl Registry {
    pub(crate) fn new(plugin_root: String, rules: Vec<Arc<Rule>>) -> Self {
        let mut by_endpoint: IndexMap<String, Vec<Arc<Rule>>> = IndexMap::new();
        for rule in &rules {
            by_endpoint
                .entry(rule.endpoint().to_string())
                .or_default()
                .push(Arc::clone(rule));
        }

        info!(
            rules_count = rules.len(),
            endpoints = by_endpoint.len(),
            plugin_root = %plugin_root,
            "Routing table built"
        );

        Registry {
            plugin_root,
            rules,
            by_endpoint,
        }
    }

    /// The plugin's URL scheme/authority root, e.g. `plugin://plugin.video.example`.
    #[must_use]
    pub fn plugin_root(&self) -> &str {
        &self.plugin_root
    }

    /// All rules in registration order.
    #[must_use]
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// All addressable endpoint names, in first-registration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.by_endpoint.keys().map(String::as_str)
    }

    /// Match decoded request path segments against the registry.
    ///
    /// Rules are scanned in registration order; the first satisfying match
    /// wins. Fails with [`PluginError::NotFound`] carrying the unmatched
    /// path when nothing matches.
    pub fn match_request(
        &self,
        segments: &[String],
    ) -> Result<(Arc<Rule>, BindingVec), PluginError> {
        debug!(segment_count = segments.len(), "Route match attempt");
        for rule in &self.rules {
            if let Some(bindings) = rule.match_segments(segments) {
                info!(
                    template = %rule.template(),
                    endpoint = %rule.endpoint(),
                    "Route matched"
                );
                return Ok((Arc::clone(rule), bindings));
            }
        }
        let path = segments.join("/");
        warn!(path = %path, "No route matched");
        Err(PluginError::NotFound(format!("no route matched path '{path}'")))
    }

    /// Generate a canonical URL for an endpoint.
    ///
    /// Resolves the endpoint name against the calling scope (see module
    /// docs), then selects the first rule in registration order whose
    /// variables are all resolvable from `params` or the rule's defaults.
    /// Unconsumed keywords are appended as a percent-encoded query string.
    pub fn url_for(
        &self,
        scope: &Scope,
        endpoint: &str,
        params: &Params,
        explicit: bool,
    ) -> Result<String, PluginError> {
        let rules = self.resolve_endpoint(scope, endpoint, explicit)?;
        self.build_first_satisfiable(endpoint, &rules, params)
    }

    /// Generate a canonical URL for a registered view, identified by the
    /// `Arc` handle it was registered with.
    pub fn url_for_view(&self, view: &View, params: &Params) -> Result<String, PluginError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| Arc::ptr_eq(rule.view(), view))
            .ok_or_else(|| PluginError::NotFound("view is not registered".to_string()))?;
        let endpoint = rule.endpoint().to_string();
        let rules = self.resolve_endpoint(&Scope::Root, &endpoint, true)?;
        self.build_first_satisfiable(&endpoint, &rules, params)
    }

    fn build_first_satisfiable(
        &self,
        endpoint: &str,
        rules: &[Arc<Rule>],
        params: &Params,
    ) -> Result<String, PluginError> {
        for rule in rules {
            if rule.is_satisfiable(params) {
                let path_qs = rule.build_path_qs(params)?;
                let url = format!("{}{}", self.plugin_root, path_qs);
                debug!(endpoint = %endpoint, url = %url, "URL generated");
                return Ok(url);
            }
        }
        Err(PluginError::NotFound(format!(
            "no rule for endpoint '{endpoint}' is satisfiable with the given parameters"
        )))
    }

    /// Resolve an endpoint reference to its rule list.
    ///
    /// A qualified name (contains `.`) or an explicit lookup searches the
    /// exact key only. A bare name from root scope searches the root key
    /// only. A bare name from module scope tries `namespace.name` first
    /// (skipping rules registered explicit), falls back to the root key,
    /// and fails with [`PluginError::AmbiguousUrl`] when both resolve.
    fn resolve_endpoint(
        &self,
        scope: &Scope,
        endpoint: &str,
        explicit: bool,
    ) -> Result<Vec<Arc<Rule>>, PluginError> {
        if explicit || endpoint.contains('.') {
            return self
                .by_endpoint
                .get(endpoint)
                .cloned()
                .ok_or_else(|| not_found(endpoint));
        }

        match scope {
            Scope::Root => self
                .by_endpoint
                .get(endpoint)
                .cloned()
                .ok_or_else(|| not_found(endpoint)),
            Scope::Module(namespace) => {
                let local: Vec<Arc<Rule>> = self
                    .by_endpoint
                    .get(&format!("{namespace}.{endpoint}"))
                    .map(|rules| {
                        rules
                            .iter()
                            .filter(|rule| !rule.is_explicit())
                            .map(Arc::clone)
                            .collect()
                    })
                    .unwrap_or_default();
                let root = self.by_endpoint.get(endpoint);

                match (local.is_empty(), root) {
                    (false, Some(_)) => Err(PluginError::AmbiguousUrl {
                        endpoint: endpoint.to_string(),
                    }),
                    (false, None) => Ok(local),
                    (true, Some(rules)) => Ok(rules.clone()),
                    (true, None) => Err(not_found(endpoint)),
                }
            }
        }
    }
}

fn not_found(endpoint: &str) -> PluginError {
    PluginError::NotFound(format!("no endpoint named '{endpoint}'"))
}
