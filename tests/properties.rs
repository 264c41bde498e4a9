//! End-to-end behavior of the public load API.
use std::collections::BTreeMap;

use anyhow::Result;
use json_loader::once_cell::sync::Lazy;
use json_loader::rbac::Permission;
use json_loader::{
    json_object_loader, load, load_from_document, load_from_str, AllEnabled, Document, Duration, GateSet,
    JsonObject, LoadError, ObjectSchema, ValidationErrors,
};
use serde_json::json;

#[derive(Debug, Default, PartialEq)]
struct Listener {
    name: Option<String>,
    port: u32,
    timeout: Option<Duration>,
    tags: Vec<String>,
}

impl JsonObject for Listener {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Listener>> = Lazy::new(|| {
            ObjectSchema::<Listener>::builder()
                .optional("name", |l| &mut l.name)
                .optional("port", |l| &mut l.port)
                .optional("timeout", |l| &mut l.timeout)
                .optional("tags", |l| &mut l.tags)
                .build()
        });
        &SCHEMA
    }
}

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i64,
    y: i64,
    beta: String,
}

impl JsonObject for Point {
    fn schema() -> &'static ObjectSchema<Self> {
        static SCHEMA: Lazy<ObjectSchema<Point>> = Lazy::new(|| {
            ObjectSchema::<Point>::builder()
                .required("x", |p| &mut p.x)
                .required("y", |p| &mut p.y)
                .required_gated("beta", "k", |p| &mut p.beta)
                .build()
        });
        &SCHEMA
    }
}

json_object_loader!(Listener, Point);

fn errors_of(errors: &ValidationErrors) -> Vec<(String, String)> {
    errors.iter().map(|e| (e.field.clone(), e.message.clone())).collect()
}

fn gate_off() -> GateSet {
    GateSet::new().with("k", false)
}

#[test]
fn empty_object_yields_defaults() {
    let (listener, errors) = load::<Listener>(&Document::from(json!({})), &AllEnabled);
    assert!(errors.is_empty());
    assert_eq!(listener, Listener::default());
}

#[test]
fn duration_parsing() -> Result<()> {
    let d = load_from_document::<Duration>(&Document::from("1.500000000s"), &AllEnabled, "d")?;
    assert_eq!(d.as_nanos(), 1_500_000_000);

    let (d, errors) = load::<Duration>(&Document::from("315576000001s"), &AllEnabled);
    assert_eq!(errors.message("d"), "d: [field: error:seconds must be in the range [0, 315576000000]]");
    assert_eq!(d.seconds(), 315_576_000_001);

    let (_, errors) = load::<Duration>(&Document::from("-1s"), &AllEnabled);
    assert_eq!(errors.len(), 1);

    let (_, errors) = load::<Duration>(&Document::from("5"), &AllEnabled);
    assert_eq!(errors.message("d"), "d: [field: error:Not a duration (no s suffix)]");
    Ok(())
}

#[test]
fn required_field_missing() {
    let (_, errors) = load::<Point>(&Document::from(json!({"y": 1})), &gate_off());
    assert_eq!(errors_of(&errors), [(".x".to_string(), "field not present".to_string())]);
}

#[test]
fn disabled_gate_is_never_checked() {
    let (p, errors) = load::<Point>(&Document::from(json!({"x": 1, "y": 2, "beta": 7})), &gate_off());
    assert!(errors.is_empty());
    assert_eq!(p.beta, "");

    let (_, errors) = load::<Point>(&Document::from(json!({"x": 1, "y": 2, "beta": 7})), &AllEnabled);
    assert_eq!(errors.message("p"), "p: [field:.beta error:is not a string]");
}

#[test]
fn container_paths_accumulate() {
    let (points, errors) = load::<Vec<Point>>(
        &Document::from(json!([{"x": 1, "y": 1}, {"x": 2}, {"x": 3, "y": 3}])),
        &gate_off(),
    );
    assert_eq!(errors_of(&errors), [("[1].y".to_string(), "field not present".to_string())]);
    assert_eq!(points.len(), 3);
    assert_eq!(points[2].y, 3);

    let (_, errors) = load::<BTreeMap<String, Point>>(&Document::from(json!({"foo": {"x": 1}})), &gate_off());
    assert_eq!(errors_of(&errors), [(r#"["foo"].y"#.to_string(), "field not present".to_string())]);
}

#[test]
fn permission_exactly_one_of() {
    let (_, errors) = load::<Permission>(&Document::from(json!({})), &AllEnabled);
    assert_eq!(errors.message("p"), "p: [field: error:expected exactly one permission type, found 0]");

    let (_, errors) = load::<Permission>(&Document::from(json!({"any": true, "destination_port": 1})), &AllEnabled);
    assert_eq!(errors.message("p"), "p: [field: error:expected exactly one permission type, found 2]");

    let (p, errors) = load::<Permission>(&Document::from(json!({"any": true})), &AllEnabled);
    assert!(errors.is_empty());
    assert_eq!(p.any, Some(true));
}

#[test]
fn numeric_coercion() -> Result<()> {
    let a = load_from_document::<i64>(&Document::from(json!(5)), &AllEnabled, "n")?;
    let b = load_from_document::<i64>(&Document::from(json!("5")), &AllEnabled, "n")?;
    assert_eq!(a, b);

    for bad in [json!(true), json!([5])] {
        let (_, errors) = load::<i64>(&Document::from(bad), &AllEnabled);
        assert_eq!(errors.message("n"), "n: [field: error:is not a number]");
    }
    Ok(())
}

#[test]
fn status_rendering_order() {
    let mut errors = ValidationErrors::new();
    errors.scoped_field(".a").add_error("is not a string");
    {
        let mut b = errors.scoped_field(".b");
        b.scoped_field("[0]").add_error("field not present");
    }
    let status = errors.status("errors validating JSON").unwrap_err();
    assert_eq!(
        status.message(),
        "errors validating JSON: [field:.a error:is not a string; field:.b[0] error:field not present]"
    );
}

#[test]
fn text_entry_point() -> Result<()> {
    let listener = load_from_str::<Listener>(
        r#"{"name": "edge", "port": "8080", "timeout": "2.5s", "tags": ["a", "b"]}"#,
        &AllEnabled,
        "errors validating listener",
    )?;
    assert_eq!(listener.port, 8080);
    assert_eq!(listener.timeout.map(|t| t.as_nanos()), Some(2_500_000_000));
    assert_eq!(listener.tags, ["a", "b"]);

    let err = load_from_str::<Listener>(r#"{"port": -1, "tags": [1]}"#, &AllEnabled, "errors validating listener")
        .unwrap_err();
    assert!(matches!(err, LoadError::Invalid(_)));
    assert_eq!(
        err.to_string(),
        "errors validating listener: [field:.port error:failed to parse non-negative number; field:.tags[0] error:is not a string]"
    );
    Ok(())
}

#[test]
fn gates_load_through_the_engine() -> Result<()> {
    let gates = GateSet::from_document(&Document::from(json!({"k": false})))?;
    let (_, errors) = load::<Point>(&Document::from(json!({"x": 1, "y": 1})), &gates);
    assert!(errors.is_empty());
    Ok(())
}
