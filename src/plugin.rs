//! Plugin and module builders, and the built [`Plugin`] value.
//!
//! Registration is an explicit builder phase executed once before any
//! dispatch: [`PluginBuilder`] collects root rules and merges
//! [`ModuleBuilder`]s under mount prefixes, and `build` freezes everything
//! into an immutable [`Registry`] threaded through the [`Plugin`]. There is
//! no ambient global registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::dispatcher::{Dispatcher, View, ViewContext, ViewResult};
use crate::errors::PluginError;
use crate::host::{Renderer, Resolver};
use crate::item::ListItem;
use crate::params::Params;
use crate::registry::{Registry, Scope};
use crate::router::Rule;
use crate::storage::{StorageHandle, TimedStorage};

/// A built plugin: the root registry plus storage ownership.
///
/// The registry is immutable after `build`; a plugin value can match,
/// reverse-generate, and dispatch, but never re-register.
pub struct Plugin {
    name: String,
    id: String,
    registry: Registry,
    storage_path: PathBuf,
    storages: RefCell<HashMap<String, StorageHandle>>,
}

impl Plugin {
    /// Start building a plugin with the given display name and instance id
    /// (the authority of its `plugin://` URLs).
    #[must_use]
    pub fn builder(name: impl Into<String>, id: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            id: id.into(),
            storage_path: None,
            rules: Vec::new(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin instance id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The aggregated rule registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Directory storage files live under.
    #[must_use]
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Generate a canonical URL for an endpoint from root scope.
    ///
    /// Root scope never falls back into module namespaces: a module view is
    /// reachable from here only by its qualified `namespace.name`.
    pub fn url_for(&self, endpoint: &str, params: &Params) -> Result<String, PluginError> {
        self.registry.url_for(&Scope::Root, endpoint, params, false)
    }

    /// Generate a canonical URL for a registered view identified by the
    /// `Arc` handle it was registered with.
    pub fn url_for_view(&self, view: &View, params: &Params) -> Result<String, PluginError> {
        self.registry.url_for_view(view, params)
    }

    /// Open (or reuse) a named storage instance with no TTL.
    pub fn get_storage(&self, name: &str) -> Result<StorageHandle, PluginError> {
        self.open_storage(name, None)
    }

    /// Open (or reuse) a named storage instance whose entries expire after
    /// `ttl`. If the storage is already open, the existing handle (and its
    /// original TTL) is returned.
    pub fn get_storage_with_ttl(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<StorageHandle, PluginError> {
        self.open_storage(name, Some(ttl))
    }

    fn open_storage(
        &self,
        name: &str,
        ttl: Option<Duration>,
    ) -> Result<StorageHandle, PluginError> {
        if let Some(handle) = self.storages.borrow().get(name) {
            return Ok(Rc::clone(handle));
        }
        let path = self.storage_path.join(format!("{name}.json"));
        let handle = Rc::new(RefCell::new(TimedStorage::open(path, ttl)?));
        self.storages
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&handle));
        Ok(handle)
    }

    /// Sync every open storage instance to disk. Called by the dispatcher
    /// when a run reaches `Done`.
    pub fn flush_storages(&self) -> Result<(), PluginError> {
        for handle in self.storages.borrow().values() {
            handle.borrow().sync()?;
        }
        Ok(())
    }

    /// Execute one dispatch run against this plugin. Convenience for
    /// [`Dispatcher::new`] followed by [`Dispatcher::run`].
    pub fn run(
        &self,
        argv: &[String],
        renderer: &mut dyn Renderer,
        resolver: &mut dyn Resolver,
    ) -> Result<Vec<ListItem>, PluginError> {
        Dispatcher::new(self).run(argv, renderer, resolver)
    }
}

/// Collects root rules and merged modules, then freezes them into a
/// [`Plugin`].
pub struct PluginBuilder {
    name: String,
    id: String,
    storage_path: Option<PathBuf>,
    rules: Vec<Arc<Rule>>,
}

impl PluginBuilder {
    /// Override where storage files are kept. Defaults to a directory named
    /// after the plugin id under the system temp dir.
    #[must_use]
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Register a view under a path template and endpoint name.
    pub fn route<F>(
        &mut self,
        template: &str,
        endpoint: &str,
        view: F,
    ) -> Result<&mut Self, PluginError>
    where
        F: Fn(&ViewContext<'_>) -> ViewResult + 'static,
    {
        self.register(template, endpoint, Params::new(), false, Arc::new(view))
    }

    /// Full-form registration: template, endpoint, defaults, explicit flag,
    /// and a pre-built view handle (which the caller may keep for
    /// [`Plugin::url_for_view`]).
    pub fn register(
        &mut self,
        template: &str,
        endpoint: &str,
        defaults: Params,
        explicit: bool,
        view: View,
    ) -> Result<&mut Self, PluginError> {
        let rule = Rule::compile(template, endpoint, defaults, explicit, view)?;
        push_rule(&mut self.rules, rule);
        Ok(self)
    }

    /// Merge a module's rules into this plugin under a URL prefix.
    ///
    /// Every module rule is recompiled with the prefix prepended and its
    /// endpoint qualified as `namespace.name`. Module-internal registration
    /// order is preserved; merged rules follow everything registered before
    /// this call.
    pub fn register_module(
        &mut self,
        module: ModuleBuilder,
        prefix: &str,
    ) -> Result<&mut Self, PluginError> {
        let rule_count = module.rules.len();
        for rule in &module.rules {
            let mounted = rule.mounted(prefix, &module.namespace)?;
            push_rule(&mut self.rules, mounted);
        }
        info!(
            namespace = %module.namespace,
            prefix = %prefix,
            rules_merged = rule_count,
            "Module registered"
        );
        Ok(self)
    }

    /// Freeze the registry and produce the plugin. Creates the storage
    /// directory.
    pub fn build(self) -> Result<Plugin, PluginError> {
        let storage_path = match self.storage_path {
            Some(path) => path,
            None => std::env::temp_dir().join("plugroute").join(&self.id),
        };
        std::fs::create_dir_all(&storage_path)?;

        let registry = Registry::new(format!("plugin://{}", self.id), self.rules);
        Ok(Plugin {
            name: self.name,
            id: self.id,
            registry,
            storage_path,
            storages: RefCell::new(HashMap::new()),
        })
    }
}

/// A named, mountable sub-registry. Rules registered here become
/// addressable as `namespace.endpoint` once the module is merged into a
/// plugin.
pub struct ModuleBuilder {
    name: String,
    namespace: String,
    rules: Vec<Arc<Rule>>,
}

impl ModuleBuilder {
    /// Create a module. The namespace is the last dot-separated component
    /// of the name (`my.module.videos` → `videos`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let namespace = name.rsplit('.').next().unwrap_or(name.as_str()).to_string();
        ModuleBuilder {
            name,
            namespace,
            rules: Vec::new(),
        }
    }

    /// Full module name as given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace this module's endpoints are qualified under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a view under a path template and endpoint name.
    pub fn route<F>(
        &mut self,
        template: &str,
        endpoint: &str,
        view: F,
    ) -> Result<&mut Self, PluginError>
    where
        F: Fn(&ViewContext<'_>) -> ViewResult + 'static,
    {
        self.register(template, endpoint, Params::new(), false, Arc::new(view))
    }

    /// Full-form registration, as [`PluginBuilder::register`]. A rule
    /// registered `explicit` is excluded from bare-name resolution inside
    /// the module; it stays reachable by its qualified name.
    pub fn register(
        &mut self,
        template: &str,
        endpoint: &str,
        defaults: Params,
        explicit: bool,
        view: View,
    ) -> Result<&mut Self, PluginError> {
        let rule = Rule::compile(template, endpoint, defaults, explicit, view)?;
        push_rule(&mut self.rules, rule);
        Ok(self)
    }
}

/// Append a rule, or replace in place when the same (endpoint, template)
/// pair was already registered. The replaced rule keeps its original
/// position, so registration-order tie-breaks are unaffected.
fn push_rule(rules: &mut Vec<Arc<Rule>>, rule: Rule) {
    let existing = rules
        .iter()
        .position(|r| r.endpoint() == rule.endpoint() && r.template() == rule.template());
    match existing {
        Some(index) => {
            warn!(
                endpoint = %rule.endpoint(),
                template = %rule.template(),
                "Replacing previously registered rule"
            );
            rules[index] = Arc::new(rule);
        }
        None => rules.push(Arc::new(rule)),
    }
}
