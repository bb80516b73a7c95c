#![forbid(unsafe_code)]

//! Localization context owned by a [`Dispatcher`](crate::Dispatcher).
//!
//! The context carries the active [`Translator`], the localization config,
//! and the set of `(instance, property)` pairs whose stored value is a
//! translatable. A translator swap walks a snapshot of that set and
//! re-dispatches each property with its freshly rendered text.
//!
//! # Invariants
//!
//! 1. A pair appears in the consumer set at most once.
//! 2. A pair is in the set iff its text property last received a
//!    translatable (registration default included).
//! 3. Dropping an instance removes all of its pairs.

use std::collections::BTreeSet;

use propwire_i18n::{JoinDirection, LocalizationConfig, TextValue, Translatable, Translator};

use crate::dispatcher::InstanceId;
use crate::value::Value;

/// Active translator, config, and translatable consumers.
#[derive(Debug, Clone, Default)]
pub struct LocalizationContext {
    translator: Translator,
    config: LocalizationConfig,
    consumers: BTreeSet<(InstanceId, String)>,
}

impl LocalizationContext {
    /// Build a context from config. With `debug_markers` set the context
    /// starts with [`Translator::debug_markers`], otherwise identity.
    #[must_use]
    pub fn new(config: LocalizationConfig) -> Self {
        let translator = if config.debug_markers {
            Translator::debug_markers()
        } else {
            Translator::identity()
        };
        Self {
            translator,
            config,
            consumers: BTreeSet::new(),
        }
    }

    /// Build a context from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(LocalizationConfig::from_env())
    }

    /// Start with `translator` instead of the configured one.
    #[must_use]
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    #[must_use]
    pub fn config(&self) -> &LocalizationConfig {
        &self.config
    }

    #[must_use]
    pub fn direction(&self) -> JoinDirection {
        self.config.join_direction
    }

    /// Render a translatable under the active translator.
    #[must_use]
    pub fn render(&self, t: &Translatable) -> String {
        t.render(&self.translator, self.config.join_direction)
    }

    /// `"rendered (source)"`, for logs and debugging.
    #[must_use]
    pub fn describe(&self, t: &Translatable) -> String {
        format!("{} ({})", self.render(t), t.source())
    }

    /// The value as callbacks and documents see it: translatables rendered
    /// to plain text, everything else unchanged.
    #[must_use]
    pub fn rendered(&self, value: &Value) -> Value {
        match value {
            Value::Translatable(t) => Value::Text(self.render(t)),
            other => other.clone(),
        }
    }

    /// Change detection between a stored and an incoming value.
    ///
    /// When either side is a translatable the rendered texts are compared;
    /// otherwise [`Value::equivalent`] decides, so `1` and `1.0` are equal.
    #[must_use]
    pub fn differs(&self, old: &Value, new: &Value) -> bool {
        match (old, new) {
            (Value::Translatable(t), other) | (other, Value::Translatable(t)) => {
                match other.as_text_value() {
                    Some(text) => t.differs_rendered(&text, &self.translator, self.direction()),
                    None => true,
                }
            }
            _ => !old.equivalent(new),
        }
    }

    /// Render a text value.
    #[must_use]
    pub fn render_text(&self, text: &TextValue) -> String {
        text.render(&self.translator, self.config.join_direction)
    }

    /// Number of registered translatable consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Whether `(id, name)` is a registered consumer.
    #[must_use]
    pub fn is_consumer(&self, id: InstanceId, name: &str) -> bool {
        self.consumers.contains(&(id, name.to_string()))
    }

    pub(crate) fn replace_translator(&mut self, translator: Translator) -> Translator {
        std::mem::replace(&mut self.translator, translator)
    }

    pub(crate) fn observe(&mut self, id: InstanceId, name: &str) -> bool {
        self.consumers.insert((id, name.to_string()))
    }

    pub(crate) fn forget(&mut self, id: InstanceId, name: &str) -> bool {
        self.consumers.remove(&(id, name.to_string()))
    }

    pub(crate) fn forget_instance(&mut self, id: InstanceId) {
        self.consumers.retain(|(owner, _)| *owner != id);
    }

    pub(crate) fn consumers(&self) -> Vec<(InstanceId, String)> {
        self.consumers.iter().cloned().collect()
    }
}
