#![forbid(unsafe_code)]

//! Document synthesizer: observable property objects built from JSON.
//!
//! Given a JSON object, [`DocumentObject::synthesize`] creates one property
//! per key, choosing its kind from the runtime shape of the value, loads the
//! document values without notifying anyone, and then binds a write-through
//! callback so every later change lands back in the document.
//!
//! Descriptors live on an [`ObjectClass`] and are shared by every object of
//! that class: the first document to mention a key defines its kind and
//! default for all later instances.
//!
//! # Example
//!
//! ```
//! use propwire_core::Dispatcher;
//! use propwire_document::{DocumentObject, ObjectClass};
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::default();
//! let class = ObjectClass::new("Settings");
//! let settings =
//!     DocumentObject::synthesize(&dispatcher, &class, json!({"a": 1, "b": "hello"})).unwrap();
//!
//! assert_eq!(settings.keys().unwrap(), ["a", "b"]);
//! assert!(settings.set_item("a", 2i64).unwrap());
//! assert!(!settings.set_item("a", 2i64).unwrap());
//! assert_eq!(settings.document().get("a"), Some(json!(2)));
//! ```

pub mod class;
pub mod document;
pub mod object;
pub mod shape;

pub use class::{ComputedAttribute, Getter, ObjectClass, ObjectClassBuilder, Setter};
pub use document::Document;
pub use object::{DocumentObject, DocumentObjectBuilder, Entry};
pub use shape::{SHAPE_TABLE, Shape};
