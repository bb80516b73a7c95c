//! End-to-end synthesis, write-through, and merge behavior.

use std::cell::Cell;
use std::rc::Rc;

use propwire_core::{Dispatcher, InstanceId, Propagation, PropertyDescriptor, PropertyError, PropertyKind, Value};
use propwire_document::{Document, DocumentObject, Entry, ObjectClass};
use propwire_i18n::{Translatable, Translator};
use serde_json::{Value as JsonValue, json};
use tracing_test::traced_test;

fn counter(object: &DocumentObject, key: &str) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0u32));
    let hits_clone = Rc::clone(&hits);
    object
        .bind(key, move |_: InstanceId, _: &Value| {
            hits_clone.set(hits_clone.get() + 1);
            Ok(Propagation::Continue)
        })
        .unwrap();
    hits
}

fn object_of(value: JsonValue) -> serde_json::Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[test]
fn synthesize_set_and_write_through() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"a": 1, "b": "hello"})).unwrap();
    assert_eq!(obj.keys().unwrap(), ["a", "b"]);

    let hits = counter(&obj, "a");
    assert!(obj.set_item("a", 2i64).unwrap());
    assert_eq!(hits.get(), 1);
    assert_eq!(obj.document().get("a"), Some(json!(2)));

    assert!(!obj.set_item("a", 2i64).unwrap());
    assert_eq!(hits.get(), 1);
}

#[test]
fn hydration_does_not_notify() {
    let d = Dispatcher::default();
    let class = ObjectClass::builder("Window")
        .property(PropertyDescriptor::scalar("width", 0i64))
        .build();
    let first = DocumentObject::synthesize(&d, &class, json!({"width": 10})).unwrap();
    assert_eq!(first.value("width").unwrap(), Value::Int(10));
    // Only the write-through is bound after construction.
    assert_eq!(d.binding_count(first.id(), "width").unwrap(), 1);
}

#[test]
fn kinds_follow_the_shape_table() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Mixed");
    let obj = DocumentObject::synthesize(
        &d,
        &class,
        json!({"m": {"x": 1}, "s": [1, 2], "t": "txt", "n": null, "f": 0.5, "b": false}),
    )
    .unwrap();
    let kind = |key: &str| d.descriptor(obj.id(), key).unwrap().kind();
    assert_eq!(kind("m"), PropertyKind::Mapping);
    assert_eq!(kind("s"), PropertyKind::Sequence);
    assert_eq!(kind("t"), PropertyKind::Text);
    assert_eq!(kind("n"), PropertyKind::Scalar);
    assert_eq!(kind("f"), PropertyKind::Scalar);
    assert_eq!(kind("b"), PropertyKind::Scalar);
}

#[test]
fn unsupported_shape_fails_without_touching_class() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Device");
    let err = DocumentObject::synthesize(&d, &class, json!({"name": "x", "serial": u64::MAX}))
        .unwrap_err();
    assert!(matches!(err, PropertyError::UnsupportedShape { ref key, .. } if key == "serial"));
    assert_eq!(class.own_property_count(), 0);
    assert_eq!(d.instance_count(), 0);
}

#[test]
fn descriptors_are_shared_per_class() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Point");
    let one = DocumentObject::synthesize(&d, &class, json!({"x": 1})).unwrap();
    let two = DocumentObject::synthesize(&d, &class, json!({"x": 5})).unwrap();

    assert!(Rc::ptr_eq(
        &d.descriptor(one.id(), "x").unwrap(),
        &d.descriptor(two.id(), "x").unwrap()
    ));
    assert_eq!(class.own_property_count(), 1);
    assert_eq!(two.value("x").unwrap(), Value::Int(5));
    // The first document defined the class default.
    assert_eq!(class.descriptor("x").unwrap().default_value(), &Value::Int(1));
}

#[test]
fn reused_descriptor_rejects_wrong_shape() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Tagged");
    let _first = DocumentObject::synthesize(&d, &class, json!({"label": "a"})).unwrap();
    let err = DocumentObject::synthesize(&d, &class, json!({"label": 3})).unwrap_err();
    assert!(matches!(err, PropertyError::InvalidValue { .. }));
}

#[test]
fn missing_document_key_is_fatal_on_write() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"a": 1})).unwrap();
    obj.document().remove("a");

    let err = obj.set_item("a", 2i64).unwrap_err();
    assert_eq!(err, PropertyError::MissingDocumentKey { key: "a".into() });
}

#[test]
fn delete_and_unknown_keys() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"a": 1})).unwrap();

    assert!(matches!(obj.delete("a"), Err(PropertyError::CannotDelete { .. })));
    assert!(matches!(obj.get("zzz"), Err(PropertyError::NotFound { .. })));
    assert!(matches!(
        obj.set_item("zzz", 1i64),
        Err(PropertyError::NotAssignable { .. })
    ));
    assert!(obj.contains("a"));
    assert!(!obj.contains("zzz"));
}

#[test]
fn computed_attributes_are_reserved() {
    let d = Dispatcher::default();
    let class = ObjectClass::builder("Person")
        .computed("full_name", |obj: &DocumentObject| {
            let first = obj.text("first")?;
            let last = obj.text("last")?;
            Ok(Value::Text(format!("{first} {last}")))
        })
        .computed_with_setter(
            "initial",
            |obj: &DocumentObject| Ok(Value::Text(obj.text("first")?.chars().take(1).collect())),
            |obj: &DocumentObject, value: Value| {
                obj.set_item("first", value)?;
                Ok(())
            },
        )
        .build();
    let doc = json!({"first": "Ada", "last": "Lovelace", "full_name": "ignored"});
    let obj = DocumentObject::synthesize(&d, &class, doc).unwrap();

    assert!(!obj.is_mirrored("full_name"));
    assert!(obj.contains("full_name"));
    assert_eq!(obj.keys().unwrap(), ["first", "last", "full_name", "initial"]);
    assert_eq!(
        obj.get("full_name").unwrap(),
        Entry::Value(Value::Text("Ada Lovelace".into()))
    );

    assert!(matches!(
        obj.set_item("full_name", "x"),
        Err(PropertyError::ReadOnly { .. })
    ));
    assert!(!obj.set_item("initial", "Grace").unwrap());
    assert_eq!(obj.document().get("first"), Some(json!("Grace")));
}

#[test]
fn subclass_inherits_reserved_names_and_properties() {
    let d = Dispatcher::default();
    let base = ObjectClass::builder("Base")
        .property(PropertyDescriptor::scalar("version", 1i64))
        .computed("kind", |_: &DocumentObject| Ok(Value::Text("base".into())))
        .build();
    let derived = ObjectClass::builder("Derived").extends(&base).build();
    let obj = DocumentObject::synthesize(&d, &derived, json!({"kind": "x", "version": 3, "extra": true}))
        .unwrap();

    assert_eq!(obj.value("version").unwrap(), Value::Int(3));
    assert!(obj.is_mirrored("extra"));
    assert!(!obj.is_mirrored("kind"));
    assert_eq!(derived.own_property_count(), 1);
    assert!(base.descriptor("extra").is_none());
}

#[test]
fn children_are_separate_objects_sharing_the_document() {
    let d = Dispatcher::default();
    let root_class = ObjectClass::new("Config");
    let server_class = ObjectClass::new("Server");
    let document = Document::from_value(json!({"name": "prod", "server": {"port": 80}})).unwrap();
    let config = DocumentObject::builder(&root_class)
        .child("server", DocumentObject::builder(&server_class))
        .build(&d, document.clone())
        .unwrap();

    assert_eq!(config.keys().unwrap(), ["name", "server"]);
    assert!(!config.contains("server"));
    let server = config.get("server").unwrap().as_object().unwrap();
    assert!(server.set_item("port", 8080i64).unwrap());
    assert_eq!(document.root_snapshot(), json!({"name": "prod", "server": {"port": 8080}}));
    assert_eq!(
        config.to_plain().unwrap(),
        json!({"name": "prod", "server": {"port": 8080}})
    );
}

#[test]
fn child_key_shadows_a_class_descriptor() {
    let d = Dispatcher::default();
    let root_class = ObjectClass::new("Config");
    let flat = DocumentObject::synthesize(&d, &root_class, json!({"server": {"port": 80}})).unwrap();
    assert!(flat.is_mirrored("server"));
    assert_eq!(d.descriptor(flat.id(), "server").unwrap().kind(), PropertyKind::Mapping);

    let document = Document::from_value(json!({"name": "prod", "server": {"port": 80}})).unwrap();
    let config = DocumentObject::builder(&root_class)
        .child("server", DocumentObject::builder(&ObjectClass::new("Server")))
        .build(&d, document.clone())
        .unwrap();
    assert_eq!(config.keys().unwrap(), ["name", "server"]);
    assert!(!config.is_mirrored("server"));
    assert!(!config.contains("server"));
    assert!(config.child("server").is_some());

    let err = config.set_item("server", object_of(json!({"host": "x"}))).unwrap_err();
    assert_eq!(err, PropertyError::NotAssignable { key: "server".into() });
    let server = config.child("server").unwrap();
    assert!(server.set_item("port", 81i64).unwrap());
    assert_eq!(document.root_snapshot(), json!({"name": "prod", "server": {"port": 81}}));

    // The earlier flat object keeps its property.
    assert!(flat.contains("server"));
}

#[test]
fn child_must_exist_in_document() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Config");
    let document = Document::from_value(json!({"name": "prod", "server": 5})).unwrap();
    let err = DocumentObject::builder(&class)
        .child("missing", DocumentObject::builder(&ObjectClass::new("Server")))
        .build(&d, document.clone())
        .unwrap_err();
    assert_eq!(err, PropertyError::MissingDocumentKey { key: "missing".into() });

    let err = DocumentObject::builder(&class)
        .child("server", DocumentObject::builder(&ObjectClass::new("Server")))
        .build(&d, document)
        .unwrap_err();
    assert!(matches!(err, PropertyError::NotMergeable { found: "integer", .. }));
}

#[test]
fn merge_current_document_is_silent() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"a": 1, "m": {"k": 1}})).unwrap();
    let hits_a = counter(&obj, "a");
    let hits_m = counter(&obj, "m");

    let current = obj.document().snapshot().unwrap();
    obj.merge(&current).unwrap();
    assert_eq!(hits_a.get() + hits_m.get(), 0);
}

#[test]
fn merge_compares_numbers_by_value() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"x": 1, "y": 2})).unwrap();
    let hits_x = counter(&obj, "x");

    obj.merge(&object_of(json!({"x": 1.0}))).unwrap();
    assert_eq!(hits_x.get(), 0);
    assert_eq!(obj.document().root_snapshot(), json!({"x": 1, "y": 2}));

    obj.merge(&object_of(json!({"x": 1.5, "y": 2.0}))).unwrap();
    assert_eq!(hits_x.get(), 1);
    assert_eq!(obj.document().root_snapshot(), json!({"x": 1.5, "y": 2}));
}

#[test]
fn merge_applies_shallow_mapping_updates() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let obj = DocumentObject::synthesize(&d, &class, json!({"a": 1, "m": {"k": 1, "j": 2}})).unwrap();
    let hits_m = counter(&obj, "m");

    obj.merge(&object_of(json!({"a": 5, "m": {"k": 9, "new": true}})))
        .unwrap();
    assert_eq!(hits_m.get(), 1);
    assert_eq!(
        obj.document().root_snapshot(),
        json!({"a": 5, "m": {"k": 9, "j": 2, "new": true}})
    );
}

#[test]
fn merge_recurses_into_children_and_rejects_unknown_keys() {
    let d = Dispatcher::default();
    let document = Document::from_value(json!({"server": {"port": 80}})).unwrap();
    let config = DocumentObject::builder(&ObjectClass::new("Config"))
        .child("server", DocumentObject::builder(&ObjectClass::new("Server")))
        .build(&d, document.clone())
        .unwrap();

    config.merge(&object_of(json!({"server": {"port": 81}}))).unwrap();
    assert_eq!(document.root_snapshot(), json!({"server": {"port": 81}}));

    let err = config.merge(&object_of(json!({"server": 3}))).unwrap_err();
    assert!(matches!(err, PropertyError::NotMergeable { .. }));
    let err = config.merge(&object_of(json!({"nope": 1}))).unwrap_err();
    assert_eq!(err, PropertyError::NotFound { key: "nope".into() });
}

#[test]
fn translatable_text_is_written_rendered() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Button");
    let obj = DocumentObject::synthesize(&d, &class, json!({"label": "open"})).unwrap();

    // Same rendering: stored as translatable, no write-through yet.
    assert!(!obj.set_item("label", Translatable::new("open")).unwrap());
    d.set_translator(Translator::from_fn("upper", |s| s.to_uppercase()))
        .unwrap();
    assert_eq!(obj.document().get("label"), Some(json!("OPEN")));
    assert_eq!(obj.to_plain().unwrap(), json!({"label": "OPEN"}));
}

#[test]
fn dropping_object_keeps_document() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Settings");
    let document = Document::from_value(json!({"a": 1})).unwrap();
    let obj = DocumentObject::builder(&class).build(&d, document.clone()).unwrap();
    obj.set_item("a", 2i64).unwrap();
    drop(obj);
    assert_eq!(d.instance_count(), 0);
    assert_eq!(document.root_snapshot(), json!({"a": 2}));
}

#[test]
#[traced_test]
fn synthesis_is_logged() {
    let d = Dispatcher::default();
    let class = ObjectClass::new("Logged");
    let _obj = DocumentObject::synthesize(&d, &class, json!({"a": 1})).unwrap();
    assert!(logs_contain("property synthesized"));
    assert!(logs_contain("document object synthesized"));
}
