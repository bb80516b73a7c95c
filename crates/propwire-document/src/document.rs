#![forbid(unsafe_code)]

//! Shared views onto a backing JSON document.
//!
//! A [`Document`] is a handle to one JSON object inside a tree: the tree root
//! is shared (`Rc<RefCell<_>>`) and the handle stores the key path from the
//! root. Child views created with [`Document::child`] therefore write into
//! the same tree their parent sees, and write-through callbacks can hold a
//! cheap clone of the view without keeping the owning object alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as JsonValue};

use propwire_core::{PropertyError, Result};

use crate::shape::Shape;

/// View onto the JSON object at `path` within a shared tree.
#[derive(Clone)]
pub struct Document {
    root: Rc<RefCell<JsonValue>>,
    path: Vec<String>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document").field("path", &self.path).finish()
    }
}

impl Document {
    /// Wrap an object as a new document root.
    #[must_use]
    pub fn new(object: JsonMap<String, JsonValue>) -> Self {
        Self {
            root: Rc::new(RefCell::new(JsonValue::Object(object))),
            path: Vec::new(),
        }
    }

    /// Wrap a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnsupportedShape`] for any non-object root.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(object) => Ok(Self::new(object)),
            other => Err(PropertyError::UnsupportedShape {
                key: String::new(),
                shape: format!("{} at document root", Shape::of(&other).as_str()),
            }),
        }
    }

    /// A view onto the object stored under `key`.
    ///
    /// The view is not checked here; reads through a view whose path no
    /// longer resolves to an object return `None`.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut path = self.path.clone();
        path.push(key.to_string());
        Self {
            root: Rc::clone(&self.root),
            path,
        }
    }

    /// Key path from the tree root.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Whether two views share the same tree.
    #[must_use]
    pub fn same_tree(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
    }

    /// Run `f` against the viewed object.
    pub fn with_object<R>(&self, f: impl FnOnce(&JsonMap<String, JsonValue>) -> R) -> Option<R> {
        let root = self.root.borrow();
        resolve(&root, &self.path).map(f)
    }

    /// Clone of the viewed object.
    #[must_use]
    pub fn snapshot(&self) -> Option<JsonMap<String, JsonValue>> {
        self.with_object(|object| object.clone())
    }

    /// Clone of the whole tree.
    #[must_use]
    pub fn root_snapshot(&self) -> JsonValue {
        self.root.borrow().clone()
    }

    /// Clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.with_object(|object| object.get(key).cloned()).flatten()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.with_object(|object| object.contains_key(key))
            .unwrap_or(false)
    }

    /// Replace the value under an existing `key`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::MissingDocumentKey`] if the key, or the object this
    /// view points at, is gone.
    pub fn write(&self, key: &str, value: JsonValue) -> Result<()> {
        let mut root = self.root.borrow_mut();
        let slot = resolve_mut(&mut root, &self.path)
            .and_then(|object| object.get_mut(key))
            .ok_or_else(|| PropertyError::MissingDocumentKey {
                key: key.to_string(),
            })?;
        *slot = value;
        Ok(())
    }

    /// Remove `key` from the viewed object, returning its value.
    pub fn remove(&self, key: &str) -> Option<JsonValue> {
        let mut root = self.root.borrow_mut();
        resolve_mut(&mut root, &self.path).and_then(|object| object.shift_remove(key))
    }
}

fn resolve<'a>(root: &'a JsonValue, path: &[String]) -> Option<&'a JsonMap<String, JsonValue>> {
    path.iter()
        .try_fold(root, |node, key| node.get(key.as_str()))?
        .as_object()
}

fn resolve_mut<'a>(
    root: &'a mut JsonValue,
    path: &[String],
) -> Option<&'a mut JsonMap<String, JsonValue>> {
    path.iter()
        .try_fold(root, |node, key| node.get_mut(key.as_str()))?
        .as_object_mut()
}
