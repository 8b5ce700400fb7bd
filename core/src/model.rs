//! Observable models.

use crate::error::{Error, Result};
use crate::list_model::ListModel;
use crate::proto::{Copied, Prototype};
use crate::value::{JsonObject, Value};
use core::fmt;
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Receives change notifications from models.
///
/// Every method has a no-op default, so listeners only implement the events they care about.
/// Notifications are synchronous and arrive in registration order; a listener may mutate the
/// model it is being notified by.
pub trait Listener: Send + Sync {
    /// A property was set. `old` is `Null` if the property was not set before.
    fn property_changed(&self, model: &Model, key: &str, old: &Value, new: &Value) {
        let _ = (model, key, old, new);
    }

    /// An item was inserted into a list, and now resides at `index`.
    fn item_inserted(&self, list: &ListModel, item: &Model, index: usize) {
        let _ = (list, item, index);
    }

    /// An item was removed from a list; `index` is where it used to be.
    fn item_deleted(&self, list: &ListModel, item: &Model, index: usize) {
        let _ = (list, item, index);
    }

    /// All items of a list were replaced.
    fn list_reset(&self, list: &ListModel) {
        let _ = list;
    }

    /// The items of a list were reordered; `order` is the new order.
    fn list_sorted(&self, list: &ListModel, order: &[Model]) {
        let _ = (list, order);
    }
}

/// Something listeners can be registered on.
pub trait Observable: Clone + Send + Sync + 'static {
    /// Registers a listener. Fails with [`Error::EmptyListener`] if it no longer exists.
    fn add_listener(&self, listener: Weak<dyn Listener>) -> Result<()>;

    /// Unregisters a listener. Does nothing if it is not registered.
    fn remove_listener(&self, listener: &Weak<dyn Listener>);
}

/// Returns true if both references point to the same listener.
pub(crate) fn same_listener(a: &Weak<dyn Listener>, b: &Weak<dyn Listener>) -> bool {
    a.as_ptr().cast::<()>() == b.as_ptr().cast::<()>()
}

#[derive(Default)]
struct ModelState {
    properties: Copied<BTreeMap<String, Value>>,
    listeners: Copied<Vec<Weak<dyn Listener>>>,
}

crate::impl_prototype! {
    ModelState { properties, listeners }
}

/// A key/value store that notifies listeners of every change.
///
/// `Model` is a handle: `Clone` makes another handle to the same model. Use
/// [`clone_proto`](Prototype::clone_proto) to make a new model from this one, which copies the
/// properties and the listener list.
#[derive(Clone, Default)]
pub struct Model(Arc<Mutex<ModelState>>);

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.0.lock();
        f.debug_struct("Model")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("properties", &*state.properties)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl Model {
    pub fn new() -> Model {
        Model::default()
    }

    /// Returns true if both handles refer to the same model.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Clones this model and sets every key of `object` on the clone, in the object’s order.
    ///
    /// Each key fires a notification to the listeners the clone inherited.
    pub fn create_from_object(&self, object: &JsonObject) -> Model {
        let model = self.clone_proto();
        model.set_properties(object);
        model
    }

    /// Sets a property and notifies every listener before returning.
    pub fn set_property(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let old = self
            .0
            .lock()
            .properties
            .insert(key.into(), value.clone())
            .unwrap_or_default();

        let listeners = self.listeners();
        tracing::trace!(key, listeners = listeners.len(), "property changed");
        for listener in listeners {
            listener.property_changed(self, key, &old, &value);
        }
    }

    /// Sets every key of `properties`.
    pub fn set_properties(&self, properties: &JsonObject) {
        for (key, value) in properties {
            self.set_property(key, value.clone());
        }
    }

    /// Returns a property. Properties set to `Null` count as unset.
    pub fn get_property(&self, key: &str) -> Option<Value> {
        self.0
            .lock()
            .properties
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    /// Registers a listener. Fails with [`Error::EmptyListener`] if it no longer exists.
    pub fn add_listener(&self, listener: Weak<dyn Listener>) -> Result<()> {
        if listener.strong_count() == 0 {
            return Err(Error::EmptyListener);
        }
        self.0.lock().listeners.push(listener);
        Ok(())
    }

    /// Unregisters a listener. Does nothing if it is not registered.
    pub fn remove_listener(&self, listener: &Weak<dyn Listener>) {
        self.0
            .lock()
            .listeners
            .retain(|registered| !same_listener(registered, listener));
    }

    /// Live listeners in registration order. Dead ones are pruned.
    pub(crate) fn listeners(&self) -> Vec<Arc<dyn Listener>> {
        let mut state = self.0.lock();
        state.listeners.retain(|listener| listener.strong_count() > 0);
        state.listeners.iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Returns true if `listener` is registered.
    pub fn has_listener(&self, listener: &Weak<dyn Listener>) -> bool {
        self.0
            .lock()
            .listeners
            .iter()
            .any(|registered| same_listener(registered, listener))
    }

    /// Returns the properties as a JSON object.
    pub fn to_json(&self) -> Json {
        // handles are serialized after the lock is released; they may point back at this model
        let properties: Vec<_> = self
            .0
            .lock()
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Json::Object(
            properties
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, value.to_json()))
                .collect(),
        )
    }
}

impl Prototype for Model {
    fn clone_proto(&self) -> Model {
        let state = self.0.lock().clone_proto();
        Model(Arc::new(Mutex::new(state)))
    }
}

impl Observable for Model {
    fn add_listener(&self, listener: Weak<dyn Listener>) -> Result<()> {
        Model::add_listener(self, listener)
    }

    fn remove_listener(&self, listener: &Weak<dyn Listener>) {
        Model::remove_listener(self, listener)
    }
}
