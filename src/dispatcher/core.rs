//! Dispatcher core - one run per process invocation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::PluginError;
use crate::host::{Renderer, Resolver};
use crate::item::ListItem;
use crate::params::Params;
use crate::plugin::Plugin;
use crate::registry::Scope;
use crate::request::{self, Request};
use crate::router::{BindingVec, Rule};
use crate::storage::StorageHandle;

/// Default bound on redirect re-entry within one run. The reference
/// behavior allows unbounded redirect chains; a loop among registered
/// views would otherwise never terminate.
pub const MAX_REDIRECT_HOPS: usize = 8;

/// What a view returns. A closed union: the dispatcher never inspects the
/// shape of a return value beyond this tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// A directory listing, forwarded to the renderer.
    Listing(Vec<ListItem>),
    /// Another URL to dispatch within the same run.
    Redirect(String),
    /// A single playable item, forwarded to the resolver.
    Resolved(ListItem),
}

/// Result type for view functions. Errors propagate unmodified to the
/// process boundary.
pub type ViewResult = anyhow::Result<ViewOutcome>;

/// A view callable bound to a rule.
///
/// Views run to completion on the dispatching thread; there is no
/// suspension point and no concurrency within a process.
pub type View = Arc<dyn Fn(&ViewContext<'_>) -> ViewResult>;

/// Everything a view can see during one invocation: its merged keyword
/// arguments, the originating request, and scope-aware access to reverse
/// generation and storage.
pub struct ViewContext<'a> {
    plugin: &'a Plugin,
    scope: Scope,
    params: Params,
    request: &'a Request,
}

impl<'a> ViewContext<'a> {
    /// The plugin that owns this dispatch.
    #[must_use]
    pub fn plugin(&self) -> &Plugin {
        self.plugin
    }

    /// The scope the matched rule was registered from.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Merged keyword arguments: rule defaults, then query values, then
    /// path bindings. Path bindings win on key conflict.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// One merged keyword argument by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The request this run was constructed from.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.request
    }

    /// Generate a URL for an endpoint, resolving the name against this
    /// view's scope (module-local first, then root).
    pub fn url_for(&self, endpoint: &str, params: &Params) -> Result<String, PluginError> {
        self.plugin
            .registry()
            .url_for(&self.scope, endpoint, params, false)
    }

    /// Generate a URL searching the exact endpoint name only, with no
    /// scope fallback.
    pub fn url_for_explicit(&self, endpoint: &str, params: &Params) -> Result<String, PluginError> {
        self.plugin
            .registry()
            .url_for(&self.scope, endpoint, params, true)
    }

    /// Open (or reuse) a named storage instance owned by the plugin.
    pub fn storage(&self, name: &str) -> Result<StorageHandle, PluginError> {
        self.plugin.get_storage(name)
    }
}

/// State of one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Constructed, nothing parsed yet.
    Idle,
    /// Request parsed, matching and view invocation in progress.
    Dispatching,
    /// Terminal. No further dispatch occurs in this process.
    Done,
}

/// Orchestrates one run: parse the invocation, match, invoke the view,
/// route the outcome to the renderer or resolver.
///
/// `run` consumes the dispatcher, so a second dispatch in the same process
/// requires constructing a new one deliberately; the intended model is one
/// run per process lifetime.
pub struct Dispatcher<'p> {
    plugin: &'p Plugin,
    state: DispatchState,
    max_redirect_hops: usize,
}

impl<'p> Dispatcher<'p> {
    /// Create an idle dispatcher for the given plugin.
    #[must_use]
    pub fn new(plugin: &'p Plugin) -> Self {
        Dispatcher {
            plugin,
            state: DispatchState::Idle,
            max_redirect_hops: MAX_REDIRECT_HOPS,
        }
    }

    /// Override the redirect hop bound.
    #[must_use]
    pub fn with_redirect_limit(mut self, limit: usize) -> Self {
        self.max_redirect_hops = limit;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Execute one dispatch run.
    ///
    /// Parses the invocation arguments into a [`Request`], matches the
    /// path, invokes the bound view with merged keyword arguments, and
    /// routes the outcome: listings go to the renderer, resolved items to
    /// the resolver, redirects re-enter matching with the target's path
    /// (bounded by the hop limit). On reaching `Done` every open storage
    /// instance is flushed.
    ///
    /// Returns the items handed to the host, which is convenient for
    /// out-of-host testing.
    pub fn run(
        mut self,
        argv: &[String],
        renderer: &mut dyn Renderer,
        resolver: &mut dyn Resolver,
    ) -> Result<Vec<ListItem>, PluginError> {
        let request = Request::from_invocation(argv)?;
        self.state = DispatchState::Dispatching;
        info!(
            url = %request.url(),
            handle = request.handle(),
            "Dispatch started"
        );

        let mut segments = request.segments().to_vec();
        let mut hops = 0usize;
        loop {
            let (rule, bindings) = match self.plugin.registry().match_request(&segments) {
                Ok(matched) => matched,
                Err(e) => {
                    self.state = DispatchState::Done;
                    return Err(e);
                }
            };

            let scope = match rule.namespace() {
                Some(namespace) => Scope::Module(namespace.to_string()),
                None => Scope::Root,
            };
            let ctx = ViewContext {
                plugin: self.plugin,
                scope,
                params: merge_params(&rule, &bindings, &request),
                request: &request,
            };

            let outcome = match (rule.view())(&ctx) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.state = DispatchState::Done;
                    return Err(PluginError::View(e));
                }
            };

            match outcome {
                ViewOutcome::Listing(items) => {
                    renderer.render(request.handle(), &items);
                    return self.finish(items);
                }
                ViewOutcome::Resolved(item) => {
                    resolver.resolve(request.handle(), &item);
                    return self.finish(vec![item]);
                }
                ViewOutcome::Redirect(target) => {
                    hops += 1;
                    if hops > self.max_redirect_hops {
                        warn!(target = %target, hops = hops, "Redirect limit exceeded");
                        self.state = DispatchState::Done;
                        return Err(PluginError::RedirectLimit {
                            limit: self.max_redirect_hops,
                            url: target,
                        });
                    }
                    info!(target = %target, hop = hops, "Redirecting");
                    segments = request::target_segments(&target)?;
                }
            }
        }
    }

    fn finish(&mut self, items: Vec<ListItem>) -> Result<Vec<ListItem>, PluginError> {
        self.state = DispatchState::Done;
        self.plugin.flush_storages()?;
        info!(item_count = items.len(), "Dispatch complete");
        Ok(items)
    }
}

/// Merge keyword arguments for a view invocation.
///
/// Order is rule defaults, then the first value of each query key, then
/// path bindings. Later entries override earlier ones, so a path binding
/// always wins over a query key of the same name. Under strict equal-length
/// matching a binding exists for every template variable, so defaults only
/// ever fill free-form extras here.
fn merge_params(rule: &Rule, bindings: &BindingVec, request: &Request) -> Params {
    let mut params = rule.defaults().clone();
    for (key, values) in request.query() {
        if let Some(first) = values.first() {
            params.insert(key.as_str(), first.as_str());
        }
    }
    for (name, value) in bindings {
        params.insert(name.as_ref(), value.as_str());
    }
    params
}
