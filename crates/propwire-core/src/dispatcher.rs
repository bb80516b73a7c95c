#![forbid(unsafe_code)]

//! Per-instance property registry and change dispatch.
//!
//! # Design
//!
//! A [`Dispatcher`] owns an arena of instance records addressed by
//! generational [`InstanceId`] handles. Each record maps property names to
//! their state: the shared [`PropertyDescriptor`], the current value, the
//! ordered callback list and optional registration metadata. The owning side
//! holds an [`Instance`] guard; dropping it frees the record, bumps the slot
//! generation so stale ids fail cleanly, and removes the instance's
//! translatable consumers. The arena never keeps an owner alive.
//!
//! Cloning a `Dispatcher` creates a new handle to the **same** registry, so
//! callbacks can capture a clone and write to other properties.
//!
//! # Invariants
//!
//! 1. `set(v)` dispatches iff `v` differs from the stored value (rendered
//!    comparison when a translatable is involved).
//! 2. Callbacks run in registration order; `Propagation::Stop` ends the
//!    dispatch.
//! 3. No interior borrow is held while callbacks run, so callbacks may call
//!    back into the dispatcher.
//! 4. A translator swap re-dispatches every translatable consumer exactly
//!    once, iterating a snapshot of the consumer set.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Stale id | Instance dropped | `PropertyError::UnknownInstance` |
//! | Callback error | Callback returned `Err` | Dispatch stops, error returned to the setter |
//! | Guard dropped mid-borrow | Instance dropped from inside a registry borrow | Record leaked, warning logged |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, info, trace, warn};

use propwire_i18n::{StringCatalog, Translatable, Translator};

use crate::descriptor::{PropertyDescriptor, PropertyKind};
use crate::error::{PropertyError, Result};
use crate::localization::LocalizationContext;
use crate::suppress::SuppressionGuard;
use crate::value::Value;

/// Whether later callbacks of the same dispatch should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    /// First handler wins: skip the remaining callbacks.
    Stop,
}

/// Return type of property callbacks.
pub type CallbackResult = Result<Propagation>;

pub(crate) type CallbackRc = Rc<dyn Fn(InstanceId, &Value) -> CallbackResult>;

/// Stable handle to an instance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Token returned by [`Dispatcher::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

pub(crate) struct Binding {
    pub(crate) id: BindingId,
    pub(crate) callback: CallbackRc,
}

pub(crate) struct PropertyState {
    descriptor: Rc<PropertyDescriptor>,
    registered_default: Value,
    extra: Option<JsonValue>,
    value: Value,
    pub(crate) callbacks: Vec<Binding>,
}

impl PropertyState {
    fn snapshot_callbacks(&self) -> Vec<CallbackRc> {
        self.callbacks
            .iter()
            .map(|binding| Rc::clone(&binding.callback))
            .collect()
    }
}

struct InstanceRecord {
    label: String,
    properties: IndexMap<String, PropertyState>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    record: Option<InstanceRecord>,
}

#[derive(Default)]
pub(crate) struct DispatcherInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_binding: u64,
    localization: LocalizationContext,
}

impl DispatcherInner {
    fn record(&self, id: InstanceId) -> Result<&InstanceRecord> {
        record_in(&self.slots, id)
    }

    fn state(&self, id: InstanceId, name: &str) -> Result<&PropertyState> {
        self.record(id)?
            .properties
            .get(name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                name: name.to_string(),
            })
    }

    pub(crate) fn state_mut(&mut self, id: InstanceId, name: &str) -> Result<&mut PropertyState> {
        state_in(&mut self.slots, id, name)
    }

    fn allocate(&mut self, label: String) -> InstanceId {
        let record = InstanceRecord {
            label,
            properties: IndexMap::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            InstanceId::new(index, slot.generation)
        } else {
            let index = slot_index(self.slots.len());
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            InstanceId::new(index, 0)
        }
    }

    fn release(&mut self, id: InstanceId) -> Option<InstanceRecord> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.localization.forget_instance(id);
        Some(record)
    }

    fn next_binding_id(&mut self) -> BindingId {
        self.next_binding += 1;
        BindingId(self.next_binding)
    }
}

fn record_in(slots: &[Slot], id: InstanceId) -> Result<&InstanceRecord> {
    slots
        .get(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.record.as_ref())
        .ok_or(PropertyError::UnknownInstance(id))
}

fn state_in<'a>(slots: &'a mut [Slot], id: InstanceId, name: &str) -> Result<&'a mut PropertyState> {
    slots
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.record.as_mut())
        .ok_or(PropertyError::UnknownInstance(id))?
        .properties
        .get_mut(name)
        .ok_or_else(|| PropertyError::UnknownProperty {
            name: name.to_string(),
        })
}

// Indices are never shared; an arena past `u32::MAX` slots cannot be addressed.
fn slot_index(len: usize) -> u32 {
    let Ok(index) = u32::try_from(len) else {
        panic!("instance arena exhausted: {len} slots exceed the u32 index space");
    };
    index
}

fn run_callbacks(id: InstanceId, callbacks: &[CallbackRc], value: &Value) -> Result<()> {
    for callback in callbacks {
        if callback(id, value)? == Propagation::Stop {
            break;
        }
    }
    Ok(())
}

/// Owning guard for an instance record.
///
/// Dropping the guard reclaims the record; ids held elsewhere become stale.
pub struct Instance {
    id: InstanceId,
    owner: Weak<RefCell<DispatcherInner>>,
}

impl Instance {
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("id", &self.id).finish()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        let Some(inner) = self.owner.upgrade() else {
            return;
        };
        // The record is dropped after the borrow ends: its callbacks may own
        // other instance guards.
        let record = match inner.try_borrow_mut() {
            Ok(mut inner) => inner.release(self.id),
            Err(_) => {
                warn!(instance = %self.id, "instance dropped while registry borrowed; record leaked");
                None
            }
        };
        drop(record);
    }
}

/// Shared registry of instance property state.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<RefCell<DispatcherInner>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Dispatcher")
            .field("instances", &(inner.slots.len() - inner.free.len()))
            .field("translator", &inner.localization.translator().label())
            .field("consumers", &inner.localization.consumer_count())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with an injected localization context.
    #[must_use]
    pub fn new(localization: LocalizationContext) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DispatcherInner {
                localization,
                ..DispatcherInner::default()
            })),
        }
    }

    // ── Instances ─────────────────────────────────────────────────────────

    /// Allocate an instance record. `label` names the owning class in logs.
    ///
    /// # Panics
    ///
    /// When more than `u32::MAX` instance slots would be live at once.
    pub fn create_instance(&self, label: impl Into<String>) -> Instance {
        let id = self.inner.borrow_mut().allocate(label.into());
        trace!(instance = %id, "instance created");
        Instance {
            id,
            owner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether `id` refers to a live instance.
    #[must_use]
    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.inner.borrow().record(id).is_ok()
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.slots.iter().filter(|slot| slot.record.is_some()).count()
    }

    /// The label given at creation.
    pub fn label(&self, id: InstanceId) -> Result<String> {
        Ok(self.inner.borrow().record(id)?.label.clone())
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Register per-instance state for `descriptor`.
    ///
    /// Without an explicit `default` the instance starts from a clone of the
    /// descriptor default. Re-registering with the same descriptor and
    /// default is a no-op.
    ///
    /// # Errors
    ///
    /// [`PropertyError::RegistrationConflict`] when the property exists with
    /// a different descriptor, default, or metadata;
    /// [`PropertyError::InvalidValue`] when `default` does not fit the kind.
    pub fn register(
        &self,
        id: InstanceId,
        descriptor: &Rc<PropertyDescriptor>,
        default: Option<Value>,
    ) -> Result<()> {
        self.register_inner(id, descriptor, default, None)
    }

    /// [`register`](Self::register) with extra metadata stored alongside the
    /// state and readable through [`metadata`](Self::metadata).
    pub fn register_with_extra(
        &self,
        id: InstanceId,
        descriptor: &Rc<PropertyDescriptor>,
        default: Option<Value>,
        extra: JsonValue,
    ) -> Result<()> {
        self.register_inner(id, descriptor, default, Some(extra))
    }

    fn register_inner(
        &self,
        id: InstanceId,
        descriptor: &Rc<PropertyDescriptor>,
        default: Option<Value>,
        extra: Option<JsonValue>,
    ) -> Result<()> {
        let default = match default {
            Some(value) => {
                descriptor.validate(&value)?;
                value
            }
            None => descriptor.default_value().clone(),
        };
        let name = descriptor.name();

        let mut guard = self.inner.borrow_mut();
        let DispatcherInner {
            slots,
            localization,
            ..
        } = &mut *guard;
        let record = slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
            .ok_or(PropertyError::UnknownInstance(id))?;

        if let Some(existing) = record.properties.get(name) {
            let same_descriptor = Rc::ptr_eq(&existing.descriptor, descriptor)
                || *existing.descriptor == **descriptor;
            if same_descriptor && existing.registered_default == default && existing.extra == extra
            {
                return Ok(());
            }
            return Err(PropertyError::RegistrationConflict {
                name: name.to_string(),
            });
        }

        if descriptor.kind() == PropertyKind::Text && matches!(default, Value::Translatable(_)) {
            localization.observe(id, name);
        }
        debug!(
            instance = %id,
            property = name,
            kind = %descriptor.kind(),
            "property registered"
        );
        record.properties.insert(
            name.to_string(),
            PropertyState {
                descriptor: Rc::clone(descriptor),
                registered_default: default.clone(),
                extra,
                value: default,
                callbacks: Vec::new(),
            },
        );
        Ok(())
    }

    /// Whether the instance has a property called `name`.
    #[must_use]
    pub fn has_property(&self, id: InstanceId, name: &str) -> bool {
        self.inner.borrow().state(id, name).is_ok()
    }

    /// Property names in registration order.
    pub fn property_names(&self, id: InstanceId) -> Result<Vec<String>> {
        Ok(self
            .inner
            .borrow()
            .record(id)?
            .properties
            .keys()
            .cloned()
            .collect())
    }

    /// The descriptor backing a property.
    pub fn descriptor(&self, id: InstanceId, name: &str) -> Result<Rc<PropertyDescriptor>> {
        Ok(Rc::clone(&self.inner.borrow().state(id, name)?.descriptor))
    }

    /// Metadata stored at registration.
    pub fn metadata(&self, id: InstanceId, name: &str) -> Result<Option<JsonValue>> {
        Ok(self.inner.borrow().state(id, name)?.extra.clone())
    }

    // ── Access ────────────────────────────────────────────────────────────

    /// The stored value, translatables included as-is.
    pub fn get(&self, id: InstanceId, name: &str) -> Result<Value> {
        Ok(self.inner.borrow().state(id, name)?.value.clone())
    }

    /// The value as callbacks see it: translatables rendered to text.
    pub fn rendered(&self, id: InstanceId, name: &str) -> Result<Value> {
        let inner = self.inner.borrow();
        let value = &inner.state(id, name)?.value;
        Ok(inner.localization.rendered(value))
    }

    /// Display text of a text property under the active translator.
    ///
    /// # Errors
    ///
    /// [`PropertyError::InvalidValue`] if the property does not hold text.
    pub fn text(&self, id: InstanceId, name: &str) -> Result<String> {
        let inner = self.inner.borrow();
        let state = inner.state(id, name)?;
        match &state.value {
            Value::Text(s) => Ok(s.clone()),
            Value::Translatable(t) => Ok(inner.localization.render(t)),
            other => Err(PropertyError::InvalidValue {
                name: name.to_string(),
                expected: PropertyKind::Text,
                found: other.type_name(),
            }),
        }
    }

    /// Store `value` and dispatch if it differs from the current value.
    ///
    /// For text properties a translatable registers the property as a
    /// translatable consumer and plain text deregisters it; this happens
    /// even when the rendered text is unchanged and nothing is dispatched.
    ///
    /// Returns whether callbacks were dispatched.
    ///
    /// # Errors
    ///
    /// Stale instance, unknown property, shape mismatch, or the first error
    /// returned by a callback.
    pub fn set(&self, id: InstanceId, name: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let (callbacks, dispatched) = {
            let mut guard = self.inner.borrow_mut();
            let DispatcherInner {
                slots,
                localization,
                ..
            } = &mut *guard;
            let state = state_in(slots, id, name)?;
            state.descriptor.validate(&value)?;

            if state.descriptor.kind() == PropertyKind::Text {
                if matches!(value, Value::Translatable(_)) {
                    localization.observe(id, name);
                } else {
                    localization.forget(id, name);
                }
            }

            let changed = localization.differs(&state.value, &value);
            if state.value != value {
                state.value = value;
            }
            if !changed {
                return Ok(false);
            }
            (
                state.snapshot_callbacks(),
                localization.rendered(&state.value),
            )
        };

        trace!(instance = %id, property = name, callbacks = callbacks.len(), "dispatch");
        run_callbacks(id, &callbacks, &dispatched)?;
        Ok(true)
    }

    /// Mutate a value in place; dispatches iff the result differs.
    ///
    /// This is how mapping and sequence properties are edited without
    /// replacing them wholesale.
    pub fn update(&self, id: InstanceId, name: &str, f: impl FnOnce(&mut Value)) -> Result<bool> {
        let mut value = self.get(id, name)?;
        f(&mut value);
        self.set(id, name, value)
    }

    /// Properties cannot be removed once created.
    ///
    /// # Errors
    ///
    /// Always [`PropertyError::CannotDelete`] (or a lookup error for a stale
    /// instance).
    pub fn delete(&self, id: InstanceId, name: &str) -> Result<()> {
        self.inner.borrow().record(id)?;
        Err(PropertyError::CannotDelete {
            name: name.to_string(),
        })
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    /// Broadcast `value` to the property's callbacks without storing it.
    pub fn dispatch(&self, id: InstanceId, name: &str, value: &Value) -> Result<()> {
        let callbacks = self.inner.borrow().state(id, name)?.snapshot_callbacks();
        run_callbacks(id, &callbacks, value)
    }

    /// Append a callback to the property's callback list.
    pub fn bind(
        &self,
        id: InstanceId,
        name: &str,
        callback: impl Fn(InstanceId, &Value) -> CallbackResult + 'static,
    ) -> Result<BindingId> {
        let mut inner = self.inner.borrow_mut();
        let binding = inner.next_binding_id();
        inner.state_mut(id, name)?.callbacks.push(Binding {
            id: binding,
            callback: Rc::new(callback),
        });
        Ok(binding)
    }

    /// Remove a callback. Returns whether it was bound.
    pub fn unbind(&self, id: InstanceId, name: &str, binding: BindingId) -> Result<bool> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let callbacks = &mut inner.state_mut(id, name)?.callbacks;
            callbacks
                .iter()
                .position(|b| b.id == binding)
                .map(|pos| callbacks.remove(pos))
        };
        Ok(removed.is_some())
    }

    /// Number of callbacks currently bound to a property.
    pub fn binding_count(&self, id: InstanceId, name: &str) -> Result<usize> {
        Ok(self.inner.borrow().state(id, name)?.callbacks.len())
    }

    /// Detach the callbacks of `names` until the returned guard drops.
    ///
    /// The guard restores exactly the bindings that were present when it
    /// was created; callbacks bound during the region are discarded.
    ///
    /// # Errors
    ///
    /// Stale instance or unknown property; nothing is detached on error.
    pub fn suppress(&self, id: InstanceId, names: &[&str]) -> Result<SuppressionGuard> {
        let mut inner = self.inner.borrow_mut();
        for name in names {
            inner.state(id, name)?;
        }
        let mut saved = Vec::with_capacity(names.len());
        for name in names {
            let state = inner.state_mut(id, name)?;
            saved.push((name.to_string(), std::mem::take(&mut state.callbacks)));
        }
        trace!(instance = %id, properties = names.len(), "suppression region entered");
        Ok(SuppressionGuard::new(Rc::downgrade(&self.inner), id, saved))
    }

    /// [`suppress`](Self::suppress) every property of the instance.
    pub fn suppress_all(&self, id: InstanceId) -> Result<SuppressionGuard> {
        let names = self.property_names(id)?;
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.suppress(id, &names)
    }

    /// Run `f` with the callbacks of `names` detached.
    pub fn with_suppressed<R>(
        &self,
        id: InstanceId,
        names: &[&str],
        f: impl FnOnce() -> R,
    ) -> Result<R> {
        let _guard = self.suppress(id, names)?;
        Ok(f())
    }

    // ── Localization ──────────────────────────────────────────────────────

    /// The active translator.
    #[must_use]
    pub fn translator(&self) -> Translator {
        self.inner.borrow().localization.translator().clone()
    }

    /// Render a translatable under the active translator and config.
    #[must_use]
    pub fn render(&self, t: &Translatable) -> String {
        self.inner.borrow().localization.render(t)
    }

    /// `"rendered (source)"` under the active translator.
    #[must_use]
    pub fn describe(&self, t: &Translatable) -> String {
        self.inner.borrow().localization.describe(t)
    }

    /// Run `f` against the localization context.
    pub fn with_localization<R>(&self, f: impl FnOnce(&LocalizationContext) -> R) -> R {
        f(&self.inner.borrow().localization)
    }

    /// Number of `(instance, property)` pairs holding translatables.
    #[must_use]
    pub fn translatable_consumers(&self) -> usize {
        self.inner.borrow().localization.consumer_count()
    }

    /// Replace the translator and re-dispatch every translatable consumer
    /// with its newly rendered text, regardless of whether it changed.
    ///
    /// Returns the number of properties re-dispatched.
    ///
    /// # Errors
    ///
    /// The first callback error; consumers after it are not re-dispatched
    /// but the new translator stays installed.
    pub fn set_translator(&self, translator: Translator) -> Result<usize> {
        let label = translator.label().to_string();
        let consumers = {
            let mut inner = self.inner.borrow_mut();
            inner.localization.replace_translator(translator);
            inner.localization.consumers()
        };
        info!(translator = %label, consumers = consumers.len(), "translator swapped");

        let mut redispatched = 0;
        for (id, name) in consumers {
            let pending = {
                let mut guard = self.inner.borrow_mut();
                let DispatcherInner {
                    slots,
                    localization,
                    ..
                } = &mut *guard;
                match state_in(slots, id, &name) {
                    Ok(state) => match &state.value {
                        Value::Translatable(t) => Some((
                            state.snapshot_callbacks(),
                            Value::Text(localization.render(t)),
                        )),
                        _ => {
                            localization.forget(id, &name);
                            None
                        }
                    },
                    Err(err) => {
                        warn!(instance = %id, property = %name, error = %err, "pruning dead translatable consumer");
                        localization.forget(id, &name);
                        None
                    }
                }
            };
            if let Some((callbacks, value)) = pending {
                run_callbacks(id, &callbacks, &value)?;
                redispatched += 1;
            }
        }
        Ok(redispatched)
    }

    /// Restore the identity translator.
    pub fn reset_translator(&self) -> Result<usize> {
        self.set_translator(Translator::identity())
    }

    /// Install the `#marker#` translator to find untagged strings.
    pub fn load_debug_translator(&self) -> Result<usize> {
        self.set_translator(Translator::debug_markers())
    }

    /// Install a catalog-backed translator for `locale`.
    pub fn switch_language(
        &self,
        catalog: Arc<StringCatalog>,
        locale: impl Into<String>,
    ) -> Result<usize> {
        self.set_translator(Translator::catalog(catalog, locale))
    }
}
