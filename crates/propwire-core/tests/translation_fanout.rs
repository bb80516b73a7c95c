//! Translator swaps re-dispatch every property holding a translatable.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use propwire_core::i18n::{
    JoinDirection, LocaleStrings, LocalizationConfig, StringCatalog, Translatable, Translator,
};
use propwire_core::{
    CallbackResult, Dispatcher, Instance, InstanceId, LocalizationContext, Propagation,
    PropertyDescriptor, PropertyError, Value,
};
use tracing_test::traced_test;

fn label_descriptor() -> Rc<PropertyDescriptor> {
    Rc::new(PropertyDescriptor::text("label", ""))
}

fn record_into(
    log: &Rc<RefCell<Vec<String>>>,
    tag: &'static str,
) -> impl Fn(InstanceId, &Value) -> CallbackResult + 'static {
    let log = Rc::clone(log);
    move |_: InstanceId, value: &Value| {
        if let Value::Text(text) = value {
            log.borrow_mut().push(format!("{tag}:{text}"));
        }
        Ok(Propagation::Continue)
    }
}

fn upper() -> Translator {
    Translator::from_fn("upper", |s| s.to_uppercase())
}

#[test]
fn swap_fires_each_instance_once_with_rendered_text() {
    let d = Dispatcher::default();
    let label = label_descriptor();
    let first = d.create_instance("Button");
    let second = d.create_instance("Button");
    let log = Rc::new(RefCell::new(Vec::new()));

    for (obj, tag) in [(&first, "first"), (&second, "second")] {
        d.register(obj.id(), &label, None).unwrap();
        d.bind(obj.id(), "label", record_into(&log, tag)).unwrap();
        d.set(obj.id(), "label", Translatable::new("open")).unwrap();
    }
    // Each set fired once under the identity translator.
    assert_eq!(*log.borrow(), vec!["first:open", "second:open"]);
    log.borrow_mut().clear();

    assert_eq!(d.set_translator(upper()).unwrap(), 2);
    let mut seen = log.borrow().clone();
    seen.sort();
    assert_eq!(seen, vec!["first:OPEN", "second:OPEN"]);
}

#[test]
fn swap_redispatches_even_when_text_is_unchanged() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("42")).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    d.bind(obj.id(), "label", record_into(&log, "x")).unwrap();

    d.set_translator(upper()).unwrap();
    assert_eq!(*log.borrow(), vec!["x:42"]);
}

#[test]
fn rendered_text_follows_translator_without_another_set() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Dialog");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    let title = Translatable::new("save") + " " + Translatable::new("file");
    d.set(obj.id(), "label", title).unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "save file");

    d.set_translator(upper()).unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "SAVE FILE");
    assert_eq!(
        d.rendered(obj.id(), "label").unwrap(),
        Value::Text("SAVE FILE".into())
    );
    // The stored value still carries its source.
    let stored = d.get(obj.id(), "label").unwrap();
    assert_eq!(stored.as_translatable().unwrap().untranslated(), "save file");
}

#[test]
fn plain_text_leaves_consumer_set() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("open")).unwrap();
    assert_eq!(d.translatable_consumers(), 1);
    assert!(d.with_localization(|ctx| ctx.is_consumer(obj.id(), "label")));

    d.set(obj.id(), "label", "plain").unwrap();
    assert_eq!(d.translatable_consumers(), 0);
    assert_eq!(d.set_translator(upper()).unwrap(), 0);
    assert_eq!(d.text(obj.id(), "label").unwrap(), "plain");
}

#[test]
fn translatable_with_same_rendering_is_stored_without_dispatch() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", "open").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    d.bind(obj.id(), "label", record_into(&log, "x")).unwrap();

    assert!(!d.set(obj.id(), "label", Translatable::new("open")).unwrap());
    assert!(log.borrow().is_empty());
    assert_eq!(d.translatable_consumers(), 1);

    d.set_translator(upper()).unwrap();
    assert_eq!(*log.borrow(), vec!["x:OPEN"]);
}

#[test]
fn translatable_default_registers_consumer() {
    let d = Dispatcher::default();
    let title = Rc::new(PropertyDescriptor::text("title", Translatable::new("untitled")));
    let obj = d.create_instance("Window");
    d.register(obj.id(), &title, None).unwrap();
    assert_eq!(d.translatable_consumers(), 1);

    drop(obj);
    assert_eq!(d.translatable_consumers(), 0);
}

#[test]
fn debug_markers_and_reset() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("open")).unwrap();

    d.load_debug_translator().unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "#open#");
    assert_eq!(d.describe(&Translatable::new("x")), "#x# (x)");

    d.reset_translator().unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "open");
    assert_eq!(d.translator().label(), "identity");
}

#[test]
fn switch_language_uses_catalog_with_fallback() {
    let mut catalog = StringCatalog::new();
    catalog
        .add_locale("fr", [("open", "ouvrir")].into_iter().collect::<LocaleStrings>())
        .unwrap();
    catalog
        .add_locale("en", [("close", "close")].into_iter().collect::<LocaleStrings>())
        .unwrap();
    catalog.set_fallback_chain(vec!["en".into()]);
    let catalog = Arc::new(catalog);

    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("open") + " / " + Translatable::new("save"))
        .unwrap();

    d.switch_language(Arc::clone(&catalog), "fr").unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "ouvrir / save");
    assert_eq!(d.translator().label(), "catalog:fr");
}

#[test]
fn right_to_left_join_direction() {
    let ctx = LocalizationContext::new(
        LocalizationConfig::new().with_join_direction(JoinDirection::RightToLeft),
    );
    let d = Dispatcher::new(ctx);
    let obj = d.create_instance("Label");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("a") + "b").unwrap();
    assert_eq!(d.text(obj.id(), "label").unwrap(), "ba");
}

#[test]
fn callback_error_stops_fanout_but_keeps_translator() {
    let d = Dispatcher::default();
    let obj = d.create_instance("Button");
    d.register(obj.id(), &label_descriptor(), None).unwrap();
    d.set(obj.id(), "label", Translatable::new("open")).unwrap();
    d.bind(obj.id(), "label", |_, _| {
        Err(PropertyError::MissingDocumentKey { key: "label".into() })
    })
    .unwrap();

    let err = d.set_translator(upper()).unwrap_err();
    assert!(matches!(err, PropertyError::MissingDocumentKey { .. }));
    assert_eq!(d.translator().label(), "upper");
}

#[test]
#[traced_test]
fn consumer_dropped_mid_fanout_is_pruned() {
    let d = Dispatcher::default();
    let label = label_descriptor();
    let first = d.create_instance("Button");
    let second = d.create_instance("Button");
    for obj in [&first, &second] {
        d.register(obj.id(), &label, None).unwrap();
        d.set(obj.id(), "label", Translatable::new("open")).unwrap();
    }

    // Consumers are visited in handle order; the first drops the second.
    let victim: Rc<RefCell<Option<Instance>>> = Rc::new(RefCell::new(Some(second)));
    let victim_clone = Rc::clone(&victim);
    d.bind(first.id(), "label", move |_, _| {
        victim_clone.borrow_mut().take();
        Ok(Propagation::Continue)
    })
    .unwrap();

    assert_eq!(d.set_translator(upper()).unwrap(), 1);
    assert_eq!(d.translatable_consumers(), 1);
    assert!(logs_contain("translator swapped"));
    assert!(logs_contain("pruning dead translatable consumer"));
}
