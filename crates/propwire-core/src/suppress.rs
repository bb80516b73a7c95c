#![forbid(unsafe_code)]

//! Scoped callback suppression.
//!
//! While a [`SuppressionGuard`] is alive the callbacks of the named
//! properties are detached, so writes update values without notifying
//! anyone. Dropping the guard reinstates exactly the bindings that existed
//! when it was created, on every exit path including unwinding.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::{trace, warn};

use crate::dispatcher::{Binding, DispatcherInner, InstanceId};

/// RAII guard returned by [`Dispatcher::suppress`](crate::Dispatcher::suppress).
#[must_use = "callbacks are restored as soon as the guard is dropped"]
pub struct SuppressionGuard {
    owner: Weak<RefCell<DispatcherInner>>,
    id: InstanceId,
    saved: Vec<(String, Vec<Binding>)>,
}

impl SuppressionGuard {
    pub(crate) fn new(
        owner: Weak<RefCell<DispatcherInner>>,
        id: InstanceId,
        saved: Vec<(String, Vec<Binding>)>,
    ) -> Self {
        Self { owner, id, saved }
    }

    /// Names of the suppressed properties.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for SuppressionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionGuard")
            .field("instance", &self.id)
            .field("properties", &self.saved.len())
            .finish()
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        let Some(inner) = self.owner.upgrade() else {
            return;
        };
        let mut discarded = Vec::new();
        match inner.try_borrow_mut() {
            Ok(mut inner) => {
                for (name, bindings) in saved {
                    // The instance may have been dropped inside the region.
                    match inner.state_mut(self.id, &name) {
                        Ok(state) => {
                            discarded.push(std::mem::replace(&mut state.callbacks, bindings));
                        }
                        Err(_) => discarded.push(bindings),
                    }
                }
                trace!(instance = %self.id, "suppression region left");
            }
            Err(_) => {
                warn!(instance = %self.id, "suppression guard dropped while registry borrowed; bindings lost");
                discarded.extend(saved.into_iter().map(|(_, bindings)| bindings));
            }
        }
        // Callbacks may own instance guards; release them with no borrow held.
        drop(discarded);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::descriptor::PropertyDescriptor;
    use crate::dispatcher::{Dispatcher, Propagation};

    fn setup() -> (Dispatcher, crate::dispatcher::Instance, Rc<Cell<u32>>) {
        let d = Dispatcher::default();
        let obj = d.create_instance("Widget");
        for name in ["a", "b"] {
            d.register(obj.id(), &Rc::new(PropertyDescriptor::scalar(name, 0)), None)
                .unwrap();
        }
        let hits = Rc::new(Cell::new(0u32));
        for name in ["a", "b"] {
            let hits = Rc::clone(&hits);
            d.bind(obj.id(), name, move |_, _| {
                hits.set(hits.get() + 1);
                Ok(Propagation::Continue)
            })
            .unwrap();
        }
        (d, obj, hits)
    }

    #[test]
    fn suppressed_writes_are_silent() {
        let (d, obj, hits) = setup();
        {
            let guard = d.suppress(obj.id(), &["a"]).unwrap();
            assert_eq!(guard.properties().collect::<Vec<_>>(), vec!["a"]);
            d.set(obj.id(), "a", 1).unwrap();
            d.set(obj.id(), "b", 1).unwrap();
            assert_eq!(d.binding_count(obj.id(), "a").unwrap(), 0);
        }
        assert_eq!(hits.get(), 1);
        assert_eq!(d.get(obj.id(), "a").unwrap(), crate::Value::Int(1));

        d.set(obj.id(), "a", 2).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn bindings_made_during_region_are_discarded() {
        let (d, obj, hits) = setup();
        {
            let _guard = d.suppress_all(obj.id()).unwrap();
            let hits = Rc::clone(&hits);
            d.bind(obj.id(), "a", move |_, _| {
                hits.set(hits.get() + 100);
                Ok(Propagation::Continue)
            })
            .unwrap();
        }
        assert_eq!(d.binding_count(obj.id(), "a").unwrap(), 1);
        d.set(obj.id(), "a", 5).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unknown_property_detaches_nothing() {
        let (d, obj, _hits) = setup();
        assert!(d.suppress(obj.id(), &["a", "missing"]).is_err());
        assert_eq!(d.binding_count(obj.id(), "a").unwrap(), 1);
    }

    #[test]
    fn restored_after_panic() {
        let (d, obj, hits) = setup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            d.with_suppressed(obj.id(), &["a", "b"], || panic!("boom"))
        }));
        assert!(result.is_err());
        d.set(obj.id(), "a", 9).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn instance_dropped_inside_region() {
        let (d, obj, _hits) = setup();
        let guard = d.suppress(obj.id(), &["a"]).unwrap();
        drop(obj);
        drop(guard);
        assert_eq!(d.instance_count(), 0);
    }
}
