//! Static file serving through the dispatcher

mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use brrtexpress::{Application, DispatchOutcome, Dispatcher, IncomingRequest, StaticFiles};
use common::dispatch::{body_text, single};
use tempfile::TempDir;

struct Site {
    _dir: TempDir,
    dispatcher: Dispatcher,
    middleware_runs: Arc<AtomicUsize>,
    handler_runs: Arc<AtomicUsize>,
}

/// `<tmp>/assets` mounted at `/assets`, with `<tmp>/secret.txt` outside the root
fn assets_site() -> Site {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    fs::create_dir_all(assets.join("img")).unwrap();
    fs::write(assets.join("app.css"), "body { margin: 0 }").unwrap();
    fs::write(assets.join("app.js"), "console.log('hi')").unwrap();
    fs::write(assets.join("img").join("logo.svg"), "<svg/>").unwrap();
    fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

    let middleware_runs = Arc::new(AtomicUsize::new(0));
    let handler_runs = Arc::new(AtomicUsize::new(0));

    let mut app = Application::new();
    app.serve_static_from(&assets);
    let mw = Arc::clone(&middleware_runs);
    app.use_fn(move |req, res, next| {
        mw.fetch_add(1, Ordering::SeqCst);
        next.run(req, res)
    });
    for template in ["/assets/:a", "/assets/:a/:b"] {
        let runs = Arc::clone(&handler_runs);
        app.get(template, move |req, res| {
            runs.fetch_add(1, Ordering::SeqCst);
            res.send(format!("handler for {}", req.path()))?;
            Ok(())
        })
        .unwrap();
    }

    Site {
        _dir: dir,
        dispatcher: app.build(),
        middleware_runs,
        handler_runs,
    }
}

#[test]
fn test_static_file_preempts_route() {
    let site = assets_site();

    let (outcome, out) = single(&site.dispatcher, IncomingRequest::new("GET", "/assets/app.css"));
    assert_eq!(outcome, DispatchOutcome::StaticServed);
    assert_eq!(out.status, 200);
    assert_eq!(body_text(&out), "body { margin: 0 }");
    assert_eq!(out.header("content-type"), Some("text/css; charset=utf-8"));

    let (_, out) = single(&site.dispatcher, IncomingRequest::new("GET", "/assets/img/logo.svg"));
    assert_eq!(out.header("content-type"), Some("image/svg+xml"));

    assert_eq!(site.middleware_runs.load(Ordering::SeqCst), 0);
    assert_eq!(site.handler_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_missing_file_falls_through_to_route() {
    let site = assets_site();

    let (outcome, out) = single(&site.dispatcher, IncomingRequest::new("GET", "/assets/missing.css"));
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(body_text(&out), "handler for /assets/missing.css");
    assert_eq!(site.middleware_runs.load(Ordering::SeqCst), 1);
    assert_eq!(site.handler_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_traversal_never_serves_outside_root() {
    let site = assets_site();

    for target in [
        "/assets/../secret.txt",
        "/assets/%2e%2e/secret.txt",
        "/assets/..%2Fsecret.txt",
        "/assets/..%5Csecret.txt",
    ] {
        let (outcome, out) = single(&site.dispatcher, IncomingRequest::new("GET", target));
        assert_eq!(outcome, DispatchOutcome::Completed, "{target}");
        assert!(!body_text(&out).contains("top secret"), "{target}");
        assert!(body_text(&out).starts_with("handler for"), "{target}");
    }
}

#[test]
fn test_file_without_route_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    fs::create_dir(&public).unwrap();
    fs::write(public.join("robots.txt"), "User-agent: *").unwrap();

    let mut app = Application::new();
    app.serve_static_from(&public);
    app.get("/health", |_req, res| {
        res.send("ok")?;
        Ok(())
    })
    .unwrap();

    let (outcome, out) = single(&app.build(), IncomingRequest::new("GET", "/public/robots.txt"));
    assert_eq!(outcome, DispatchOutcome::NotFound);
    assert_eq!(out.status, 404);
}

#[test]
fn test_root_mount_serves_index() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>todos</h1>").unwrap();

    let mut app = Application::new();
    app.serve_static(StaticFiles::mounted("/", dir.path()));
    app.get("/", |_req, res| {
        res.send("api root")?;
        Ok(())
    })
    .unwrap();
    app.get("/todos", |_req, res| {
        res.json(&serde_json::json!([]))?;
        Ok(())
    })
    .unwrap();
    let dispatcher = app.build();

    let (outcome, out) = single(&dispatcher, IncomingRequest::new("GET", "/"));
    assert_eq!(outcome, DispatchOutcome::StaticServed);
    assert_eq!(body_text(&out), "<h1>todos</h1>");
    assert_eq!(out.header("content-type"), Some("text/html; charset=utf-8"));

    let (outcome, out) = single(&dispatcher, IncomingRequest::new("GET", "/todos"));
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(body_text(&out), "[]");
}

#[cfg(unix)]
#[test]
fn test_symlink_out_of_root_is_rejected() {
    let site_dir = tempfile::tempdir().unwrap();
    let root = site_dir.path().join("assets");
    fs::create_dir(&root).unwrap();
    fs::write(site_dir.path().join("secret.txt"), "top secret").unwrap();
    std::os::unix::fs::symlink(site_dir.path().join("secret.txt"), root.join("leak.txt")).unwrap();

    let files = StaticFiles::new(&root);
    assert!(files.load("/assets/leak.txt").is_err());
}
