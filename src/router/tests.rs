use super::{CompiledPattern, RouteTable};
use crate::error::{PatternError, RouteError};
use crate::middleware::Handler;
use std::sync::Arc;

fn noop() -> Handler {
    Arc::new(|_req, _res| Ok(()))
}

#[test]
fn test_root_path() {
    let p = CompiledPattern::compile("/").unwrap();
    assert!(p.matches("/").is_some());
    assert!(p.matches("/x").is_none());
    assert!(p.param_names().is_empty());
}

#[test]
fn test_empty_template_rejected() {
    assert_eq!(CompiledPattern::compile("").unwrap_err(), PatternError::Empty);
}

#[test]
fn test_missing_leading_slash_is_normalized() {
    let p = CompiledPattern::compile("todos/:id").unwrap();
    assert_eq!(p.template(), "/todos/:id");
    assert!(p.matches("/todos/1").is_some());
}

#[test]
fn test_parameterized_path() {
    let p = CompiledPattern::compile("/todos/:id").unwrap();
    let params = p.matches("/todos/42").unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].0.as_ref(), "id");
    assert_eq!(params[0].1, "42");
}

#[test]
fn test_param_never_crosses_slash() {
    let p = CompiledPattern::compile("/todos/:id").unwrap();
    assert!(p.matches("/todos/42/extra").is_none());
    assert!(p.matches("/todos/").is_none());
    assert!(p.matches("/todos").is_none());
}

#[test]
fn test_nested_params_in_order() {
    let p = CompiledPattern::compile("/users/:user_id/posts/:post_id").unwrap();
    let params = p.matches("/users/7/posts/abc").unwrap();
    let names: Vec<&str> = params.iter().map(|(k, _)| k.as_ref()).collect();
    let values: Vec<&str> = params.iter().map(|(_, v)| v.as_str()).collect();
    assert_eq!(names, vec!["user_id", "post_id"]);
    assert_eq!(values, vec!["7", "abc"]);
}

#[test]
fn test_substitution_recovers_values() {
    let p = CompiledPattern::compile("/a/:x/b/:y/c/:z").unwrap();
    let samples = [
        ("1", "2", "3"),
        ("hello world", "%20", "ünïcødé"),
        ("a.b", "c-d", "e+f"),
        ("(", "[", "*"),
    ];
    for (x, y, z) in samples {
        let path = format!("/a/{x}/b/{y}/c/{z}");
        let params = p.matches(&path).unwrap();
        let got: Vec<&str> = params.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(got, vec![x, y, z], "path {path}");
    }
}

#[test]
fn test_literal_text_is_escaped() {
    let p = CompiledPattern::compile("/files/:name.json").unwrap();
    assert!(p.matches("/files/report.json").is_some());
    assert!(p.matches("/files/reportXjson").is_none());
}

#[test]
fn test_inline_params_in_one_segment() {
    let p = CompiledPattern::compile("/files/:name.:ext").unwrap();
    let params = p.matches("/files/app.css").unwrap();
    assert_eq!(params[0].1, "app");
    assert_eq!(params[1].1, "css");
}

#[test]
fn test_invalid_parameter_segment() {
    let err = CompiledPattern::compile("/users/:").unwrap_err();
    assert!(matches!(err, PatternError::InvalidParameter { .. }));
    let err = CompiledPattern::compile("/users/:-x").unwrap_err();
    assert!(matches!(err, PatternError::InvalidParameter { .. }));
}

#[test]
fn test_param_name_ends_at_dash() {
    let p = CompiledPattern::compile("/users/:a-b").unwrap();
    let params = p.matches("/users/42-b").unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(&*params[0].0, "a");
    assert_eq!(params[0].1, "42");
    assert!(p.matches("/users/42").is_none());
}

#[test]
fn test_repeated_param_name_last_wins() {
    let mut table = RouteTable::new();
    table.register("GET", "/org/:id/user/:id", noop()).unwrap();
    let m = table.resolve("GET", "/org/1/user/2").unwrap();
    assert_eq!(m.path_params.len(), 2);
    assert_eq!(m.get_path_param("id"), Some("2"));
    assert_eq!(m.path_params_map().get("id").map(String::as_str), Some("2"));
}

#[test]
fn test_method_is_case_insensitive() {
    let mut table = RouteTable::new();
    table.register("get", "/hello", noop()).unwrap();
    assert!(table.resolve("GET", "/hello").is_some());
    assert!(table.resolve("Get", "/hello").is_some());
    assert!(table.resolve("POST", "/hello").is_none());
}

#[test]
fn test_invalid_method_rejected() {
    let mut table = RouteTable::new();
    let err = table.register("GE T", "/x", noop()).unwrap_err();
    assert!(matches!(err, RouteError::InvalidMethod(_)));
    assert!(table.is_empty());
}

#[test]
fn test_first_registration_wins() {
    let first: Handler = Arc::new(|_req, _res| Ok(()));
    let second: Handler = Arc::new(|_req, _res| Ok(()));
    let mut table = RouteTable::new();
    table.register("GET", "/dup", Arc::clone(&first)).unwrap();
    table.register("GET", "/other", noop()).unwrap();
    table.register("GET", "/dup", Arc::clone(&second)).unwrap();
    assert_eq!(table.len(), 3);

    let m = table.resolve("GET", "/dup").unwrap();
    assert!(Arc::ptr_eq(&m.route.handler, &first));
}

#[test]
fn test_param_route_registered_first_shadows_literal() {
    let mut table = RouteTable::new();
    table.register("GET", "/todos/:id", noop()).unwrap();
    table.register("GET", "/todos/new", noop()).unwrap();
    let m = table.resolve("GET", "/todos/new").unwrap();
    assert_eq!(m.route.pattern.template(), "/todos/:id");
    assert_eq!(m.get_path_param("id"), Some("new"));
}

#[test]
fn test_resolve_skips_other_methods() {
    let mut table = RouteTable::new();
    table.register("POST", "/todos", noop()).unwrap();
    table.register("GET", "/todos", noop()).unwrap();
    let m = table.resolve("GET", "/todos").unwrap();
    assert_eq!(m.route.method, http::Method::GET);
}
