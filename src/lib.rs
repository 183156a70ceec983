//! # plugroute
//!
//! **plugroute** is a URL routing and dispatch engine for media-center
//! plugin add-ons: declare named views bound to path templates, dispatch an
//! incoming virtual URL to the matching view with extracted parameters,
//! and regenerate canonical URLs for any registered view by name
//! (reverse routing).
//!
//! ## Overview
//!
//! A plugin add-on is invoked by its host once per navigation step: the
//! host passes a virtual URL (`plugin://<id>/path?query`) on the command
//! line, the plugin produces a list of browsable or playable entries, and
//! the process exits. plugroute supplies the engineering core of that
//! model — an exact string-pattern matching and reverse-generation engine
//! with namespacing, defaulting, and ambiguity detection — plus the glue
//! around it: a dispatch state machine, the normalized item model, and a
//! TTL-aware persistent storage views can cache through.
//!
//! ## Architecture
//!
//! - **[`router`]** - path template compilation and matching ([`Rule`])
//! - **[`registry`]** - the ordered, immutable rule collection with
//!   namespaced reverse lookup ([`Registry`])
//! - **[`plugin`]** - the builder phase and the built [`Plugin`] value
//! - **[`dispatcher`]** - one run per process: parse, match, invoke,
//!   route the outcome ([`Dispatcher`], [`ViewOutcome`])
//! - **[`request`]** - invocation parsing ([`Request`])
//! - **[`item`]** - the abstract output unit ([`ListItem`])
//! - **[`host`]** - renderer/resolver collaborator contracts and an
//!   in-memory mock for out-of-host testing
//! - **[`storage`]** - TTL-aware persistent key/value storage
//!
//! Data flows one direction per process run:
//!
//! ```text
//! raw URL → Request → Matcher → view → item sequence → renderer
//! ```
//!
//! `url_for` is the inverse path, used by view code to build links for
//! other views.
//!
//! ## Quick Start
//!
//! ```no_run
//! use plugroute::{ListItem, MemoryHost, Params, Plugin, ViewOutcome};
//!
//! # fn main() -> Result<(), plugroute::PluginError> {
//! let mut builder = Plugin::builder("Hello Addon", "plugin.video.hello");
//! builder.route("/", "main_menu", |ctx| {
//!     let shows = ctx.url_for("shows", &Params::new())?;
//!     Ok(ViewOutcome::Listing(vec![ListItem::directory("Shows", shows)]))
//! })?;
//! builder.route("/shows", "shows", |_ctx| {
//!     Ok(ViewOutcome::Listing(vec![ListItem::new("A show")]))
//! })?;
//! let plugin = builder.build()?;
//!
//! let argv = vec!["plugin://plugin.video.hello/".to_string(), "0".to_string()];
//! let (mut renderer, mut resolver) = (MemoryHost::new(), MemoryHost::new());
//! plugin.run(&argv, &mut renderer, &mut resolver)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime model
//!
//! Strictly single-threaded and synchronous: one dispatch per process
//! lifetime, views run to completion, and the registry is immutable after
//! the builder phase. Registration order is significant — it is the
//! deterministic tie-break for both matching and reverse generation.

pub mod dispatcher;
pub mod errors;
pub mod host;
pub mod item;
pub mod params;
pub mod plugin;
pub mod registry;
pub mod request;
pub mod router;
pub mod storage;

pub use dispatcher::{
    DispatchState, Dispatcher, View, ViewContext, ViewOutcome, ViewResult, MAX_REDIRECT_HOPS,
};
pub use errors::PluginError;
pub use host::{MemoryHost, Renderer, Resolver};
pub use item::ListItem;
pub use params::Params;
pub use plugin::{ModuleBuilder, Plugin, PluginBuilder};
pub use registry::{Registry, Scope};
pub use request::Request;
pub use router::Rule;
pub use storage::{StorageHandle, TimedStorage};
