//! Forward dispatch: matching incoming paths against registered rules and
//! invoking views with merged keyword arguments.

use plugroute::{ListItem, MemoryHost, Plugin, PluginError, ViewOutcome};

mod common;

fn run_path(plugin: &Plugin, path_qs: &str) -> Result<Vec<ListItem>, PluginError> {
    common::init_tracing();
    let argv = vec![
        format!("plugin://{}{}", plugin.id(), path_qs),
        "0".to_string(),
    ];
    let mut renderer = MemoryHost::new();
    let mut resolver = MemoryHost::new();
    plugin.run(&argv, &mut renderer, &mut resolver)
}

fn label_of(items: &[ListItem]) -> &str {
    items[0].label.as_deref().unwrap_or("<none>")
}

#[test]
fn dispatches_root_path() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/", "main_menu", |_ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new("Hello Addon")]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let items = run_path(&plugin, "/").unwrap();
    assert_eq!(label_of(&items), "Hello Addon");
}

#[test]
fn earliest_registered_rule_wins() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/dup", "first", |_ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new("first")]))
        })
        .unwrap();
    builder
        .route("/dup", "second", |_ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new("second")]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let items = run_path(&plugin, "/dup").unwrap();
    assert_eq!(label_of(&items), "first");
}

#[test]
fn defaults_and_bindings_merge_into_view_arguments() {
    use plugroute::Params;
    use std::sync::Arc;

    let greet: plugroute::View = Arc::new(|ctx| {
        let name = ctx.param("name").unwrap_or("chris");
        Ok(ViewOutcome::Listing(vec![ListItem::new(format!(
            "Hello {name}"
        ))]))
    });

    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .register("/person/<name>/", "person", Params::new(), false, Arc::clone(&greet))
        .unwrap();
    builder
        .register("/", "person_default", Params::new(), false, Arc::clone(&greet))
        .unwrap();
    builder
        .register(
            "/dave/",
            "person_dave",
            Params::from([("name", "dave")]),
            false,
            greet,
        )
        .unwrap();
    let plugin = builder.build().unwrap();

    assert_eq!(label_of(&run_path(&plugin, "/person/jon/").unwrap()), "Hello jon");
    assert_eq!(label_of(&run_path(&plugin, "/dave/").unwrap()), "Hello dave");
    assert_eq!(label_of(&run_path(&plugin, "/").unwrap()), "Hello chris");
}

#[test]
fn query_values_reach_the_view() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/search", "search", |ctx| {
            let q = ctx.param("q").unwrap_or("<missing>");
            Ok(ViewOutcome::Listing(vec![ListItem::new(q)]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let items = run_path(&plugin, "/search?q=ferris").unwrap();
    assert_eq!(label_of(&items), "ferris");
}

#[test]
fn path_binding_wins_over_query_key() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/show/<id>", "show", |ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new(
                ctx.param("id").unwrap_or("<missing>"),
            )]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let items = run_path(&plugin, "/show/7?id=9").unwrap();
    assert_eq!(label_of(&items), "7");
}

#[test]
fn path_segments_are_percent_decoded() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/play/<href>", "play", |ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new(
                ctx.param("href").unwrap_or("<missing>"),
            )]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let items = run_path(&plugin, "/play/http%3A%2F%2Fexample.org%2Fget%2F1").unwrap();
    assert_eq!(label_of(&items), "http://example.org/get/1");
}

#[test]
fn unmatched_segment_count_is_not_found() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/show/<id>", "show", |_ctx| {
            Ok(ViewOutcome::Listing(Vec::new()))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let err = run_path(&plugin, "/show/1/extra").unwrap_err();
    assert!(matches!(err, PluginError::NotFound(_)));
    let err = run_path(&plugin, "/show").unwrap_err();
    assert!(matches!(err, PluginError::NotFound(_)));
}

#[test]
fn no_match_renders_nothing() {
    let mut builder = Plugin::builder("Hello", "plugin.video.hello");
    builder
        .route("/", "main_menu", |_ctx| {
            Ok(ViewOutcome::Listing(vec![ListItem::new("Hello")]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    common::init_tracing();
    let argv = vec![
        format!("plugin://{}/missing", plugin.id()),
        "0".to_string(),
    ];
    let mut renderer = MemoryHost::new();
    let mut resolver = MemoryHost::new();
    let result = plugin.run(&argv, &mut renderer, &mut resolver);

    assert!(result.is_err());
    assert!(renderer.rendered.is_empty());
    assert!(resolver.resolved.is_none());
}
