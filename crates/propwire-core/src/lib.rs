#![forbid(unsafe_code)]

//! Core: property descriptors, per-instance registry, and change dispatch.
//!
//! # Role in propwire
//! `propwire-core` is the observer layer. A [`PropertyDescriptor`] names a
//! property and its default; a [`Dispatcher`] keeps the per-instance value
//! and callback list for every registered `(instance, property)` pair and
//! notifies callbacks when a write changes the value.
//!
//! # Primary responsibilities
//! - **Registration**: idempotent per instance, conflicting metadata rejected.
//! - **Dispatch**: ordered callbacks with first-handler-wins short-circuit.
//! - **Suppression**: scoped detachment of callbacks via [`SuppressionGuard`].
//! - **Localization**: translatable text values re-dispatched on translator
//!   swap through the injected [`LocalizationContext`].
//!
//! # How it fits in the system
//! `propwire-i18n` supplies translatable text and translators. The document
//! synthesizer (`propwire-document`) builds property-backed objects on top of
//! this crate and uses callbacks to write changes back into JSON.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use propwire_core::{Dispatcher, Propagation, PropertyDescriptor, Value};
//!
//! let dispatcher = Dispatcher::default();
//! let widget = dispatcher.create_instance("Widget");
//! let width = Rc::new(PropertyDescriptor::scalar("width", 0i64));
//! dispatcher.register(widget.id(), &width, None).unwrap();
//!
//! dispatcher
//!     .bind(widget.id(), "width", |_, value| {
//!         assert_eq!(value, &Value::Int(42));
//!         Ok(Propagation::Continue)
//!     })
//!     .unwrap();
//!
//! assert!(dispatcher.set(widget.id(), "width", 42i64).unwrap());
//! assert!(!dispatcher.set(widget.id(), "width", 42i64).unwrap());
//! ```

pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod localization;
pub mod suppress;
pub mod value;

pub use descriptor::{PropertyDescriptor, PropertyKind};
pub use dispatcher::{
    BindingId, CallbackResult, Dispatcher, Instance, InstanceId, Propagation,
};
pub use error::{ErrorClass, PropertyError, Result};
pub use localization::LocalizationContext;
pub use suppress::SuppressionGuard;
pub use value::Value;

pub use propwire_i18n as i18n;
