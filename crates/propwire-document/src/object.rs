#![forbid(unsafe_code)]

//! Property-backed objects synthesized from JSON documents.
//!
//! # Construction
//!
//! [`DocumentObjectBuilder::build`] runs in four steps:
//!
//! 1. Build pre-attached children against child views of the document.
//! 2. Register every descriptor the class already knows except those
//!    shadowed by a child key, then plan one entry per document key: skip
//!    child and reserved keys, reuse a visible descriptor, or synthesize a
//!    descriptor from the shape table. The whole plan is validated before
//!    the class is mutated.
//! 3. Hydrate the planned properties from the document inside one
//!    suppression region covering every property of the instance.
//! 4. Bind a write-through callback to every planned property.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unsupported shape | Wide unsigned integer in the document | Construction fails, class untouched |
//! | Shape mismatch | Document value does not fit a reused descriptor | Construction fails |
//! | Missing child key | Pre-attached child has no document entry | Construction fails |
//! | Missing key on write | Key removed from the document after construction | Setter receives `MissingDocumentKey` |

use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, trace};

use propwire_core::value::maps_equivalent;
use propwire_core::{
    BindingId, CallbackResult, Dispatcher, Instance, InstanceId, Propagation,
    PropertyDescriptor, PropertyError, PropertyKind, Result, Value,
};
use propwire_i18n::Translatable;

use crate::class::ObjectClass;
use crate::document::Document;
use crate::shape::{self, Shape};

/// Result of an indexed read.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<'a> {
    /// A property or computed attribute value.
    Value(Value),
    /// A pre-attached sub-object.
    Object(&'a DocumentObject),
}

impl<'a> Entry<'a> {
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Object(_) => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&'a DocumentObject> {
        match self {
            Self::Value(_) => None,
            Self::Object(object) => Some(object),
        }
    }
}

/// Builder for [`DocumentObject`], carrying the pre-attached children.
pub struct DocumentObjectBuilder {
    class: Rc<ObjectClass>,
    children: Vec<(String, DocumentObjectBuilder)>,
}

impl DocumentObjectBuilder {
    /// Pre-attach a sub-object for the nested document under `key`.
    ///
    /// The key is then excluded from property synthesis and mirrored only
    /// through the child.
    #[must_use]
    pub fn child(mut self, key: impl Into<String>, child: DocumentObjectBuilder) -> Self {
        self.children.push((key.into(), child));
        self
    }

    /// Synthesize the object against `document`.
    ///
    /// # Errors
    ///
    /// See the module-level failure table.
    pub fn build(self, dispatcher: &Dispatcher, document: Document) -> Result<DocumentObject> {
        let Self {
            class,
            children: child_builders,
        } = self;
        let snapshot = document.snapshot().ok_or_else(|| PropertyError::MissingDocumentKey {
            key: document.path().join("."),
        })?;

        let mut children = IndexMap::with_capacity(child_builders.len());
        for (key, builder) in child_builders {
            match snapshot.get(&key) {
                Some(JsonValue::Object(_)) => {}
                Some(other) => {
                    return Err(PropertyError::NotMergeable {
                        key,
                        found: Shape::of(other).as_str(),
                    });
                }
                None => return Err(PropertyError::MissingDocumentKey { key }),
            }
            let child = builder.build(dispatcher, document.child(&key))?;
            children.insert(key, child);
        }

        let plan = plan_properties(&class, &snapshot, &children)?;

        let instance = dispatcher.create_instance(class.name());
        let id = instance.id();
        for descriptor in class.descriptors() {
            if children.contains_key(descriptor.name()) {
                continue;
            }
            dispatcher.register(id, &descriptor, None)?;
        }

        let mut mirrored = IndexSet::with_capacity(plan.len());
        let mut hydration = Vec::with_capacity(plan.len());
        for planned in plan {
            let descriptor = match planned.descriptor {
                Planned::Existing(descriptor) => descriptor,
                Planned::New(descriptor) => class.attach(descriptor),
            };
            dispatcher.register(id, &descriptor, None)?;
            mirrored.insert(planned.key.clone());
            hydration.push((planned.key, planned.value));
        }

        {
            let _quiet = dispatcher.suppress_all(id)?;
            for (key, value) in hydration {
                dispatcher.set(id, &key, value)?;
            }
        }
        trace!(instance = %id, class = class.name(), properties = mirrored.len(), "hydrated");

        for key in &mirrored {
            let view = document.clone();
            let target = key.clone();
            dispatcher.bind(id, key, move |_, value: &Value| {
                view.write(&target, value.to_json_with(Translatable::untranslated))?;
                Ok(Propagation::Continue)
            })?;
        }

        debug!(
            instance = %id,
            class = class.name(),
            mirrored = mirrored.len(),
            children = children.len(),
            "document object synthesized"
        );
        Ok(DocumentObject {
            class,
            dispatcher: dispatcher.clone(),
            instance,
            document,
            mirrored,
            children,
        })
    }
}

enum Planned {
    Existing(Rc<PropertyDescriptor>),
    New(PropertyDescriptor),
}

struct PlannedProperty {
    key: String,
    descriptor: Planned,
    value: Value,
}

fn plan_properties(
    class: &ObjectClass,
    snapshot: &JsonMap<String, JsonValue>,
    children: &IndexMap<String, DocumentObject>,
) -> Result<Vec<PlannedProperty>> {
    let mut plan = Vec::with_capacity(snapshot.len());
    for (key, json) in snapshot {
        if children.contains_key(key) {
            continue;
        }
        let descriptor = if let Some(existing) = class.descriptor(key) {
            Planned::Existing(existing)
        } else if class.is_reserved(key) {
            continue;
        } else {
            let kind = shape::kind_for(key, json)?;
            let default = shape::value_for(key, json)?;
            Planned::New(PropertyDescriptor::new(key.clone(), kind, default)?)
        };
        let value = shape::value_for(key, json)?;
        match &descriptor {
            Planned::Existing(existing) => existing.validate(&value)?,
            Planned::New(_) => {}
        }
        plan.push(PlannedProperty {
            key: key.clone(),
            descriptor,
            value,
        });
    }
    Ok(plan)
}

/// A property-backed object mirroring a JSON document.
///
/// Dropping the object frees its instance record and unbinds its
/// write-through callbacks; the backing document is left as it was.
pub struct DocumentObject {
    class: Rc<ObjectClass>,
    dispatcher: Dispatcher,
    instance: Instance,
    document: Document,
    mirrored: IndexSet<String>,
    children: IndexMap<String, DocumentObject>,
}

impl fmt::Debug for DocumentObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentObject")
            .field("class", &self.class.name())
            .field("instance", &self.instance.id())
            .field("path", &self.document.path())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for DocumentObject {
    fn eq(&self, other: &Self) -> bool {
        self.instance.id() == other.instance.id()
    }
}

impl DocumentObject {
    /// Start building an object of `class`.
    pub fn builder(class: &Rc<ObjectClass>) -> DocumentObjectBuilder {
        DocumentObjectBuilder {
            class: Rc::clone(class),
            children: Vec::new(),
        }
    }

    /// Synthesize an object with no pre-attached children from a JSON value.
    ///
    /// # Errors
    ///
    /// A non-object root, or any construction failure.
    pub fn synthesize(
        dispatcher: &Dispatcher,
        class: &Rc<ObjectClass>,
        json: JsonValue,
    ) -> Result<Self> {
        Self::builder(class).build(dispatcher, Document::from_value(json)?)
    }

    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    #[must_use]
    pub fn class(&self) -> &Rc<ObjectClass> {
        &self.class
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The backing document view.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether changes to `key` are written back into the document.
    #[must_use]
    pub fn is_mirrored(&self, key: &str) -> bool {
        self.mirrored.contains(key)
    }

    /// Pre-attached sub-object under `key`.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&DocumentObject> {
        self.children.get(key)
    }

    /// Whether `key` is a property or computed attribute. Sub-objects are
    /// not included.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.dispatcher.has_property(self.id(), key) || self.class.is_reserved(key)
    }

    /// Indexed read.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotFound`] when `key` is neither a property, a
    /// computed attribute, nor a sub-object; getter errors otherwise.
    pub fn get(&self, key: &str) -> Result<Entry<'_>> {
        if self.dispatcher.has_property(self.id(), key) {
            return Ok(Entry::Value(self.dispatcher.get(self.id(), key)?));
        }
        if let Some(computed) = self.class.computed(key) {
            return Ok(Entry::Value(computed.read(self)?));
        }
        self.children
            .get(key)
            .map(Entry::Object)
            .ok_or_else(|| PropertyError::NotFound {
                key: key.to_string(),
            })
    }

    /// Stored value of a property.
    pub fn value(&self, key: &str) -> Result<Value> {
        self.dispatcher.get(self.id(), key)
    }

    /// Display text of a text property.
    pub fn text(&self, key: &str) -> Result<String> {
        self.dispatcher.text(self.id(), key)
    }

    /// Indexed write. Returns whether a property dispatch happened; writes
    /// through a computed setter report `false`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::ReadOnly`] for a computed attribute without setter,
    /// [`PropertyError::NotAssignable`] for any other non-property key, and
    /// errors from the property layer or its callbacks.
    pub fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<bool> {
        if self.dispatcher.has_property(self.id(), key) {
            return self.dispatcher.set(self.id(), key, value);
        }
        match self.class.computed(key) {
            Some(computed) => {
                let setter = computed.setter().ok_or_else(|| PropertyError::ReadOnly {
                    key: key.to_string(),
                })?;
                setter(self, value.into())?;
                Ok(false)
            }
            None => Err(PropertyError::NotAssignable {
                key: key.to_string(),
            }),
        }
    }

    /// Properties cannot be removed.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.dispatcher.delete(self.id(), key)
    }

    /// Bind a callback to a property of this object.
    pub fn bind(
        &self,
        key: &str,
        callback: impl Fn(InstanceId, &Value) -> CallbackResult + 'static,
    ) -> Result<BindingId> {
        self.dispatcher.bind(self.id(), key, callback)
    }

    /// Keys in enumeration order: properties, computed attributes, then
    /// sub-objects.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.dispatcher.property_names(self.id())?;
        keys.extend(self.class.computed_names());
        keys.extend(self.children.keys().cloned());
        Ok(keys)
    }

    pub fn values(&self) -> Result<Vec<Entry<'_>>> {
        Ok(self.items()?.into_iter().map(|(_, entry)| entry).collect())
    }

    pub fn items(&self) -> Result<Vec<(String, Entry<'_>)>> {
        self.keys()?
            .into_iter()
            .map(|key| {
                let entry = self.get(&key)?;
                Ok((key, entry))
            })
            .collect()
    }

    /// Recursively materialize the object as plain JSON, translatables
    /// rendered under the active translator.
    pub fn to_plain(&self) -> Result<JsonValue> {
        let mut out = JsonMap::new();
        for key in self.dispatcher.property_names(self.id())? {
            let value = self.dispatcher.rendered(self.id(), &key)?;
            out.insert(key, value.to_json_with(Translatable::untranslated));
        }
        for key in self.class.computed_names() {
            let Some(computed) = self.class.computed(&key) else {
                continue;
            };
            let value = computed.read(self)?;
            let rendered = self.dispatcher.with_localization(|ctx| ctx.rendered(&value));
            out.insert(key, rendered.to_json_with(Translatable::untranslated));
        }
        for (key, child) in &self.children {
            out.insert(key.clone(), child.to_plain()?);
        }
        Ok(JsonValue::Object(out))
    }

    /// Merge `update` into the object.
    ///
    /// A no-op when `update` equals the current backing document. Otherwise
    /// sub-objects merge recursively, mapping properties take a shallow key
    /// merge followed by one dispatch, and everything else is assigned as an
    /// indexed write.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotFound`] for unknown keys,
    /// [`PropertyError::NotMergeable`] for a non-object aimed at a
    /// sub-object, and any error from the writes themselves. Keys before the
    /// failing one stay merged.
    pub fn merge(&self, update: &JsonMap<String, JsonValue>) -> Result<()> {
        if self
            .document
            .with_object(|current| maps_equivalent(current, update))
            .unwrap_or(false)
        {
            trace!(instance = %self.id(), "merge skipped, document unchanged");
            return Ok(());
        }

        for (key, incoming) in update {
            if let Some(child) = self.children.get(key) {
                match incoming {
                    JsonValue::Object(patch) => child.merge(patch)?,
                    other => {
                        return Err(PropertyError::NotMergeable {
                            key: key.clone(),
                            found: Shape::of(other).as_str(),
                        });
                    }
                }
                continue;
            }

            if !self.contains(key) {
                return Err(PropertyError::NotFound { key: key.clone() });
            }

            if let JsonValue::Object(patch) = incoming
                && self.is_mapping(key)
            {
                self.dispatcher.update(self.id(), key, |value| {
                    if let Value::Map(current) = value {
                        current.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                })?;
                continue;
            }

            self.set_item(key, shape::value_for(key, incoming)?)?;
        }
        debug!(instance = %self.id(), keys = update.len(), "merged");
        Ok(())
    }

    fn is_mapping(&self, key: &str) -> bool {
        self.dispatcher
            .descriptor(self.id(), key)
            .is_ok_and(|descriptor| descriptor.kind() == PropertyKind::Mapping)
    }
}
