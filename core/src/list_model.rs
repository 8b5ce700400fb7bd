//! List models: observable models holding an ordered sequence of item models.

use crate::error::{Error, Result};
use crate::model::{Listener, Model, Observable};
use crate::proto::{Copied, Prototype};
use crate::value::{expect_object, JsonObject, Value};
use core::cmp::Ordering;
use core::fmt;
use core::ops::Deref;
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::sync::{Arc, Weak};

/// An observable list of item models.
///
/// A list model is also a plain [`Model`] (through `Deref`) and can carry properties of its own.
/// Structural changes are reported to listeners through [`Listener::item_inserted`],
/// [`Listener::item_deleted`], [`Listener::list_reset`] and [`Listener::list_sorted`], on the same
/// listener list that receives property changes.
#[derive(Clone, Default)]
pub struct ListModel {
    model: Model,
    items: Arc<Mutex<Copied<Vec<Model>>>>,
}

impl fmt::Debug for ListModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ListModel")
            .field("ptr", &Arc::as_ptr(&self.items))
            .field("len", &self.get_length())
            .finish()
    }
}

impl Deref for ListModel {
    type Target = Model;
    fn deref(&self) -> &Model {
        &self.model
    }
}

impl ListModel {
    pub fn new() -> ListModel {
        ListModel::default()
    }

    /// Returns true if both handles refer to the same list.
    pub fn ptr_eq(&self, other: &ListModel) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub fn get_length(&self) -> usize {
        self.items.lock().len()
    }

    pub fn get_item_model(&self, index: usize) -> Option<Model> {
        self.items.lock().get(index).cloned()
    }

    /// A snapshot of the items.
    pub fn items(&self) -> Vec<Model> {
        self.items.lock().to_vec()
    }

    /// Returns the index of `item`, compared by identity.
    pub fn index_of(&self, item: &Model) -> Option<usize> {
        self.items.lock().iter().position(|i| i.ptr_eq(item))
    }

    /// Creates an item model from `object` and inserts it before `index`.
    ///
    /// An index past the end appends. Listeners receive the index the item actually ended up at.
    pub fn insert_object_before(&self, object: &JsonObject, index: usize) -> Model {
        let item = Model::new().create_from_object(object);
        self.insert_model_before(item.clone(), index);
        item
    }

    /// Creates an item model from `object` and appends it.
    pub fn push_object(&self, object: &JsonObject) -> Model {
        self.insert_object_before(object, usize::MAX)
    }

    /// Inserts an existing model before `index` and returns the index it ended up at.
    pub fn insert_model_before(&self, item: Model, index: usize) -> usize {
        let index = {
            let mut items = self.items.lock();
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        for listener in self.model.listeners() {
            listener.item_inserted(self, &item, index);
        }
        index
    }

    /// Appends an existing model.
    pub fn push_model(&self, item: Model) -> usize {
        self.insert_model_before(item, usize::MAX)
    }

    /// Removes `item` (compared by identity).
    pub fn delete_item(&self, item: &Model) -> Result<()> {
        let index = self.index_of(item).ok_or(Error::ItemNotFound)?;
        self.delete_index(index).map(|_| ())
    }

    /// Removes and returns the item at `index`.
    pub fn delete_index(&self, index: usize) -> Result<Model> {
        let item = {
            let mut items = self.items.lock();
            if index >= items.len() {
                return Err(Error::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        for listener in self.model.listeners() {
            listener.item_deleted(self, &item, index);
        }
        Ok(item)
    }

    /// Replaces all items with models created from `items`, which must all be plain objects.
    ///
    /// Fires a single reset event.
    pub fn set_items_from_array(&self, items: &[Json]) -> Result<()> {
        let objects = items
            .iter()
            .cloned()
            .map(expect_object)
            .collect::<Result<Vec<_>>>()?;
        let models = objects
            .iter()
            .map(|object| Model::new().create_from_object(object))
            .collect();
        **self.items.lock() = models;

        for listener in self.model.listeners() {
            listener.list_reset(self);
        }
        Ok(())
    }

    /// Each item flattened into a JSON object. The reverse of
    /// [`set_items_from_array`](ListModel::set_items_from_array).
    pub fn get_items_as_array(&self) -> Vec<Json> {
        self.items().iter().map(Model::to_json).collect()
    }

    /// Stable-sorts the items and fires a sort event with the new order.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Model, &Model) -> Ordering,
    {
        let order = {
            let mut items = self.items.lock();
            items.sort_by(|a, b| compare(a, b));
            items.to_vec()
        };
        tracing::debug!(len = order.len(), "list sorted");
        for listener in self.model.listeners() {
            listener.list_sorted(self, &order);
        }
    }

    /// Sorts the items by a property. Numbers compare numerically, everything else by its text
    /// rendering; items without the property go last.
    pub fn sort_by_property(&self, key: &str) {
        self.sort_by(|a, b| compare_values(a.get_property(key), b.get_property(key)))
    }
}

fn compare_values(a: Option<Value>, b: Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

impl Prototype for ListModel {
    fn clone_proto(&self) -> ListModel {
        let items = self.items.lock().clone_proto();
        ListModel {
            model: self.model.clone_proto(),
            items: Arc::new(Mutex::new(items)),
        }
    }
}

impl Observable for ListModel {
    fn add_listener(&self, listener: Weak<dyn Listener>) -> Result<()> {
        self.model.add_listener(listener)
    }

    fn remove_listener(&self, listener: &Weak<dyn Listener>) {
        self.model.remove_listener(listener)
    }
}
