#![forbid(unsafe_code)]

//! Object classes: the per-type registry of property descriptors and
//! computed attributes shared by every [`DocumentObject`] of that type.
//!
//! A class is built once with [`ObjectClass::builder`], optionally extending
//! a parent class. Declared properties and computed attributes are fixed at
//! build time; synthesized descriptors are attached later, the first time
//! any instance sees a new document key, and every later instance reuses
//! them.
//!
//! # Invariants
//!
//! 1. A class holds at most one descriptor per name; lookups walk the class
//!    first, then its ancestors.
//! 2. Computed attribute names are reserved: the synthesizer never creates a
//!    property for them, in this class or any subclass.
//! 3. Attaching a descriptor never replaces an existing one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use propwire_core::{PropertyDescriptor, Result, Value};

use crate::object::DocumentObject;

/// Getter of a computed attribute.
pub type Getter = Rc<dyn Fn(&DocumentObject) -> Result<Value>>;
/// Setter of a computed attribute.
pub type Setter = Rc<dyn Fn(&DocumentObject, Value) -> Result<()>>;

/// An attribute derived from other state rather than stored in a property.
#[derive(Clone)]
pub struct ComputedAttribute {
    name: String,
    getter: Getter,
    setter: Option<Setter>,
}

impl ComputedAttribute {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub(crate) fn read(&self, object: &DocumentObject) -> Result<Value> {
        (self.getter)(object)
    }

    pub(crate) fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for ComputedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedAttribute")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Shared per-type descriptor table.
pub struct ObjectClass {
    name: String,
    parent: Option<Rc<ObjectClass>>,
    computed: IndexMap<String, ComputedAttribute>,
    descriptors: RefCell<IndexMap<String, Rc<PropertyDescriptor>>>,
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("properties", &self.descriptors.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ObjectClass {
    /// Start building a class.
    pub fn builder(name: impl Into<String>) -> ObjectClassBuilder {
        ObjectClassBuilder {
            name: name.into(),
            parent: None,
            properties: Vec::new(),
            computed: IndexMap::new(),
        }
    }

    /// A class with no declared properties or computed attributes.
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::builder(name).build()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<ObjectClass>> {
        self.parent.as_ref()
    }

    /// Descriptor for `name` on this class or an ancestor.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<Rc<PropertyDescriptor>> {
        if let Some(descriptor) = self.descriptors.borrow().get(name) {
            return Some(Rc::clone(descriptor));
        }
        self.parent.as_ref()?.descriptor(name)
    }

    /// Every descriptor visible from this class, ancestors first. A name
    /// redeclared by a subclass appears once, at the ancestor's position,
    /// with the subclass's descriptor.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Rc<PropertyDescriptor>> {
        let mut all: IndexMap<String, Rc<PropertyDescriptor>> = IndexMap::new();
        self.collect_descriptors(&mut all);
        all.into_values().collect()
    }

    fn collect_descriptors(&self, all: &mut IndexMap<String, Rc<PropertyDescriptor>>) {
        if let Some(parent) = &self.parent {
            parent.collect_descriptors(all);
        }
        for (name, descriptor) in self.descriptors.borrow().iter() {
            all.insert(name.clone(), Rc::clone(descriptor));
        }
    }

    /// Number of descriptors held directly by this class.
    #[must_use]
    pub fn own_property_count(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// Computed attribute `name` on this class or an ancestor.
    #[must_use]
    pub fn computed(&self, name: &str) -> Option<&ComputedAttribute> {
        self.computed
            .get(name)
            .or_else(|| self.parent.as_ref()?.computed(name))
    }

    /// Computed attribute names visible from this class, ancestors first.
    #[must_use]
    pub fn computed_names(&self) -> Vec<String> {
        let mut names = self
            .parent
            .as_ref()
            .map(|parent| parent.computed_names())
            .unwrap_or_default();
        for name in self.computed.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Whether `name` is reserved for a computed attribute.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.computed(name).is_some()
    }

    /// Attach a synthesized descriptor, or return the one already visible
    /// under that name.
    pub(crate) fn attach(&self, descriptor: PropertyDescriptor) -> Rc<PropertyDescriptor> {
        if let Some(existing) = self.descriptor(descriptor.name()) {
            return existing;
        }
        debug!(
            class = %self.name,
            property = descriptor.name(),
            kind = %descriptor.kind(),
            "property synthesized"
        );
        let descriptor = Rc::new(descriptor);
        self.descriptors
            .borrow_mut()
            .insert(descriptor.name().to_string(), Rc::clone(&descriptor));
        descriptor
    }
}

/// Builder for [`ObjectClass`].
pub struct ObjectClassBuilder {
    name: String,
    parent: Option<Rc<ObjectClass>>,
    properties: Vec<PropertyDescriptor>,
    computed: IndexMap<String, ComputedAttribute>,
}

impl ObjectClassBuilder {
    /// Inherit declared properties and computed attributes from `parent`.
    #[must_use]
    pub fn extends(mut self, parent: &Rc<ObjectClass>) -> Self {
        self.parent = Some(Rc::clone(parent));
        self
    }

    /// Declare a property. Later declarations of the same name win.
    #[must_use]
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Declare a read-only computed attribute.
    #[must_use]
    pub fn computed(
        self,
        name: impl Into<String>,
        getter: impl Fn(&DocumentObject) -> Result<Value> + 'static,
    ) -> Self {
        self.insert_computed(name.into(), Rc::new(getter), None)
    }

    /// Declare a computed attribute that accepts indexed writes.
    #[must_use]
    pub fn computed_with_setter(
        self,
        name: impl Into<String>,
        getter: impl Fn(&DocumentObject) -> Result<Value> + 'static,
        setter: impl Fn(&DocumentObject, Value) -> Result<()> + 'static,
    ) -> Self {
        self.insert_computed(name.into(), Rc::new(getter), Some(Rc::new(setter)))
    }

    fn insert_computed(mut self, name: String, getter: Getter, setter: Option<Setter>) -> Self {
        self.computed.insert(
            name.clone(),
            ComputedAttribute {
                name,
                getter,
                setter,
            },
        );
        self
    }

    #[must_use]
    pub fn build(self) -> Rc<ObjectClass> {
        let descriptors = self
            .properties
            .into_iter()
            .map(|descriptor| (descriptor.name().to_string(), Rc::new(descriptor)))
            .collect();
        Rc::new(ObjectClass {
            name: self.name,
            parent: self.parent,
            computed: self.computed,
            descriptors: RefCell::new(descriptors),
        })
    }
}
