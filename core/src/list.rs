//! List reconciliation.
//!
//! A [`ListController`] renders a [`ListModel`] into a container element by giving every item its
//! own [`ItemController`], cloned from a prototype. The controllers are kept index-aligned with
//! the model’s items: inserts and deletes touch only the affected item, a sort moves the existing
//! item elements, and only binding a new model (or a reset) rebuilds everything.
//!
//! Item elements are made from templates whose ids are rewritten per item (see
//! [`template`](crate::template)). The list identifier that goes into those ids is drawn from the
//! document the first time the controller is bound, and item identifiers come from a counter on
//! the controller that is never reset, so ids stay unique across rebinds and across lists.

use crate::controller::Controller;
use crate::dom::{DocumentRef, NodeId};
use crate::error::{Error, Result};
use crate::list_model::ListModel;
use crate::model::{Listener, Model, Observable};
use crate::proto::Prototype;
use core::fmt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Class toggled on the container and the zero-length element.
pub const HIDDEN_CLASS: &str = "hidden";

/// Controls the rendering of a single list item.
///
/// The list controller drives an item controller through this sequence: `clone_item` from the
/// prototype, `set_model`, `set_list_id`, `set_list_item_id`, `set_list_model`,
/// `create_element`, `drawn`. When the item goes away it calls `unset_model` and then `deleted`.
pub trait ItemController: Send + Sync + 'static {
    /// Clones this (prototype) item controller.
    fn clone_item(&self) -> Arc<dyn ItemController>;

    /// Binds the item’s model.
    fn set_model(&self, model: Model) -> Result<()>;

    /// Unbinds the item’s model. Does nothing if none is bound.
    fn unset_model(&self);

    fn model(&self) -> Option<Model>;

    fn set_list_id(&self, list_id: u64);

    /// Sets the item identifier. If the element already exists, its ids are updated.
    fn set_list_item_id(&self, item_id: u64) -> Result<()>;

    /// The list model the item belongs to.
    fn set_list_model(&self, list: ListModel);

    /// Renders the item into `container`, before `before` or at the end.
    fn create_element(&self, container: NodeId, before: Option<NodeId>) -> Result<NodeId>;

    fn element(&self) -> Option<NodeId>;

    /// Called once the list controller has finished setting the item up.
    fn drawn(&self) {}

    /// Called when the user selects the item.
    fn select(&self) {}

    /// Removes the rendered element.
    fn deleted(&self) -> Result<()>;
}

#[derive(Default)]
struct ListState {
    container: Option<NodeId>,
    item_prototype: Option<Arc<dyn ItemController>>,
    zero_length_element: Option<NodeId>,
    model: Option<ListModel>,
    items: Vec<Arc<dyn ItemController>>,
    list_id: Option<u64>,
    next_item_id: u64,
}

/// Renders a list model as a sequence of item elements.
pub struct ListController {
    me: Weak<ListController>,
    doc: DocumentRef,
    state: Mutex<ListState>,
}

impl fmt::Debug for ListController {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ListController")
            .field("list_id", &state.list_id)
            .field("container", &state.container)
            .field("items", &state.items.len())
            .field("bound", &state.model.is_some())
            .finish()
    }
}

impl ListController {
    pub fn new(doc: &DocumentRef) -> Arc<ListController> {
        Self::with_state(
            doc,
            ListState {
                next_item_id: 1,
                ..ListState::default()
            },
        )
    }

    fn with_state(doc: &DocumentRef, state: ListState) -> Arc<ListController> {
        Arc::new_cyclic(|me| ListController {
            me: me.clone(),
            doc: Arc::clone(doc),
            state: Mutex::new(state),
        })
    }

    /// Clones this controller as a prototype.
    ///
    /// The clone shares the configuration (container, item prototype, zero-length element) but
    /// starts unbound, with no items and no list identifier.
    pub fn clone_controller(&self) -> Arc<ListController> {
        let state = {
            let state = self.state.lock();
            ListState {
                container: state.container,
                item_prototype: state.item_prototype.clone(),
                zero_length_element: state.zero_length_element,
                next_item_id: 1,
                ..ListState::default()
            }
        };
        Self::with_state(&self.doc, state)
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub fn document(&self) -> &DocumentRef {
        &self.doc
    }

    /// Sets the element the item elements are rendered into.
    pub fn set_list_container(&self, container: NodeId) -> Result<()> {
        if !self.doc.lock().contains(container) {
            return Err(Error::MissingElement);
        }
        self.state.lock().container = Some(container);
        Ok(())
    }

    /// Sets the container by the id of an attached element.
    pub fn set_list_container_by_id(&self, element_id: &str) -> Result<()> {
        let container = self.doc.lock().require_element_by_id(element_id)?;
        self.set_list_container(container)
    }

    pub fn container(&self) -> Option<NodeId> {
        self.state.lock().container
    }

    /// Sets the item controller every item controller is cloned from.
    pub fn set_item_controller_prototype(&self, prototype: Arc<dyn ItemController>) {
        self.state.lock().item_prototype = Some(prototype);
    }

    /// Sets an element that is shown instead of the container while the list is empty.
    pub fn set_zero_length_element(&self, element: Option<NodeId>) {
        self.state.lock().zero_length_element = element;
    }

    /// The item controllers, in item order.
    pub fn item_controllers(&self) -> Vec<Arc<dyn ItemController>> {
        self.state.lock().items.clone()
    }

    /// The list identifier, once the controller has been bound.
    pub fn list_id(&self) -> Option<u64> {
        self.state.lock().list_id
    }

    pub fn model(&self) -> Option<ListModel> {
        self.state.lock().model.clone()
    }

    fn is_bound_to(&self, list: &ListModel) -> bool {
        self.state
            .lock()
            .model
            .as_ref()
            .is_some_and(|model| model.ptr_eq(list))
    }

    /// Binds a list model and rebuilds all item controllers.
    ///
    /// Requires the item controller prototype and the container to be set. The controller
    /// unregisters from the previous model before tearing down its item controllers, and
    /// registers with the new model only once every item has been built.
    pub fn set_model(&self, list: ListModel) -> Result<()> {
        let me = self.listener();
        let (prototype, container, old_model, old_items) = {
            let mut state = self.state.lock();
            let prototype = state
                .item_prototype
                .clone()
                .ok_or(Error::MissingItemPrototype)?;
            let container = state.container.ok_or(Error::MissingContainer)?;
            (
                prototype,
                container,
                state.model.take(),
                std::mem::take(&mut state.items),
            )
        };

        if let Some(old_model) = old_model {
            old_model.remove_listener(&me);
        }
        for item in old_items {
            item.unset_model();
            if let Err(err) = item.deleted() {
                tracing::error!(error = %err, "could not delete list item");
            }
        }
        list.remove_listener(&me);
        self.doc.lock().empty_element(container)?;

        let assigned = self.state.lock().list_id;
        let list_id = match assigned {
            Some(list_id) => list_id,
            None => {
                let list_id = self.doc.lock().next_list_id();
                self.state.lock().list_id = Some(list_id);
                list_id
            }
        };
        self.state.lock().model = Some(list.clone());
        self.show_or_hide_zero_length_element()?;

        let models = list.items();
        let mut items = Vec::with_capacity(models.len());
        let mut failure = None;
        for model in models {
            let (item, built) = self.build_item(&prototype, model, list_id, &list, container, None);
            items.push(item);
            if let Err(err) = built {
                failure.get_or_insert(err);
            }
        }
        tracing::debug!(list_id, items = items.len(), "list bound");
        self.state.lock().items = items;

        list.add_listener(me)?;
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Unbinds the model and tears down every item controller.
    pub fn unset_model(&self) {
        let (model, items) = {
            let mut state = self.state.lock();
            (state.model.take(), std::mem::take(&mut state.items))
        };
        if let Some(model) = model {
            model.remove_listener(&self.listener());
        }
        for item in items {
            item.unset_model();
            if let Err(err) = item.deleted() {
                tracing::error!(error = %err, "could not delete list item");
            }
        }
    }

    fn next_item_id(&self) -> u64 {
        let mut state = self.state.lock();
        let item_id = state.next_item_id;
        state.next_item_id += 1;
        item_id
    }

    /// Clones the prototype for `model` and renders it.
    ///
    /// The item controller is returned even if rendering failed, so the controllers stay aligned
    /// with the items; a failed item has whatever it rendered removed and stays without an
    /// element.
    fn build_item(
        &self,
        prototype: &Arc<dyn ItemController>,
        model: Model,
        list_id: u64,
        list: &ListModel,
        container: NodeId,
        before: Option<NodeId>,
    ) -> (Arc<dyn ItemController>, Result<()>) {
        let item = prototype.clone_item();
        let built = self.render_item(&item, model, list_id, list, container, before);
        if built.is_err() {
            if let Err(err) = item.deleted() {
                tracing::error!(error = %err, "could not clean up list item");
            }
        }
        (item, built)
    }

    fn render_item(
        &self,
        item: &Arc<dyn ItemController>,
        model: Model,
        list_id: u64,
        list: &ListModel,
        container: NodeId,
        before: Option<NodeId>,
    ) -> Result<()> {
        item.set_model(model)?;
        item.set_list_id(list_id);
        item.set_list_item_id(self.next_item_id())?;
        item.set_list_model(list.clone());
        item.create_element(container, before)?;
        item.drawn();
        Ok(())
    }

    /// Shows the zero-length element instead of the container while the list is empty.
    fn show_or_hide_zero_length_element(&self) -> Result<()> {
        let (zero_length_element, container, model) = {
            let state = self.state.lock();
            (state.zero_length_element, state.container, state.model.clone())
        };
        let (zero_length_element, container) = match (zero_length_element, container) {
            (Some(zero_length_element), Some(container)) => (zero_length_element, container),
            _ => return Ok(()),
        };
        let empty = model.is_none_or(|model| model.get_length() == 0);

        let mut doc = self.doc.lock();
        if empty {
            doc.add_class(container, HIDDEN_CLASS)?;
            doc.remove_class(zero_length_element, HIDDEN_CLASS)
        } else {
            doc.remove_class(container, HIDDEN_CLASS)?;
            doc.add_class(zero_length_element, HIDDEN_CLASS)
        }
    }

    /// Creates an item controller for an inserted item, rendered before the element of the item
    /// currently at `index`.
    pub fn insert_before_event(&self, list: &ListModel, item: &Model, index: usize) -> Result<()> {
        let (prototype, container, list_id, following) = {
            let state = self.state.lock();
            let prototype = state
                .item_prototype
                .clone()
                .ok_or(Error::MissingItemPrototype)?;
            let container = state.container.ok_or(Error::MissingContainer)?;
            let index = index.min(state.items.len());
            (
                prototype,
                container,
                state.list_id.unwrap_or_default(),
                state.items[index..].to_vec(),
            )
        };
        // items that failed to render have no element to insert before
        let before = following.iter().find_map(|next| next.element());

        let (controller, built) =
            self.build_item(&prototype, item.clone(), list_id, list, container, before);
        {
            let mut state = self.state.lock();
            let index = index.min(state.items.len());
            state.items.insert(index, controller);
        }
        tracing::debug!(list_id, index, "list item inserted");
        self.show_or_hide_zero_length_element()?;
        built
    }

    /// Tears down the item controller at `index`.
    pub fn delete_item_event(&self, _list: &ListModel, _item: &Model, index: usize) -> Result<()> {
        let controller = {
            let mut state = self.state.lock();
            if index < state.items.len() {
                Some(state.items.remove(index))
            } else {
                None
            }
        };
        if let Some(controller) = controller {
            controller.unset_model();
            let deleted = controller.deleted();
            tracing::debug!(index, "list item deleted");
            self.show_or_hide_zero_length_element()?;
            deleted?;
        }
        Ok(())
    }

    /// Reorders the item controllers to match `order`, moving their elements without
    /// recreating anything. Does nothing to the document if the order did not change.
    pub fn sort_event(&self, order: &[Model]) -> Result<()> {
        let (container, mut remaining) = {
            let state = self.state.lock();
            (state.container, state.items.clone())
        };

        let mut sorted = Vec::with_capacity(remaining.len());
        let mut changed = false;
        for model in order {
            let found = remaining
                .iter()
                .position(|item| item.model().is_some_and(|m| m.ptr_eq(model)));
            if let Some(pos) = found {
                changed |= pos != 0;
                sorted.push(remaining.remove(pos));
            }
        }
        // controllers whose model was not in the new order keep their place after the others
        sorted.append(&mut remaining);

        if changed {
            if let Some(container) = container {
                let elements: Vec<_> = sorted.iter().filter_map(|item| item.element()).collect();
                let mut doc = self.doc.lock();
                for element in elements {
                    doc.append_child(container, element)?;
                }
            }
            tracing::debug!(items = sorted.len(), "list items reordered");
        }
        self.state.lock().items = sorted;
        Ok(())
    }

    /// Rebuilds everything, same as binding the model again.
    pub fn reset_event(&self, list: &ListModel) -> Result<()> {
        self.set_model(list.clone())
    }
}

impl Prototype for Arc<ListController> {
    fn clone_proto(&self) -> Arc<ListController> {
        self.clone_controller()
    }
}

impl Listener for ListController {
    fn item_inserted(&self, list: &ListModel, item: &Model, index: usize) {
        if !self.is_bound_to(list) {
            return;
        }
        if let Err(err) = self.insert_before_event(list, item, index) {
            tracing::error!(error = %err, index, "could not insert list item");
        }
    }

    fn item_deleted(&self, list: &ListModel, item: &Model, index: usize) {
        if !self.is_bound_to(list) {
            return;
        }
        if let Err(err) = self.delete_item_event(list, item, index) {
            tracing::error!(error = %err, index, "could not delete list item");
        }
    }

    fn list_reset(&self, list: &ListModel) {
        if !self.is_bound_to(list) {
            return;
        }
        if let Err(err) = self.reset_event(list) {
            tracing::error!(error = %err, "could not rebuild list");
        }
    }

    fn list_sorted(&self, list: &ListModel, order: &[Model]) {
        if !self.is_bound_to(list) {
            return;
        }
        if let Err(err) = self.sort_event(order) {
            tracing::error!(error = %err, "could not reorder list");
        }
    }
}

impl Controller for ListController {
    type Model = ListModel;

    fn set_model(&self, list: ListModel) -> Result<()> {
        ListController::set_model(self, list)
    }

    fn unset_model(&self) {
        ListController::unset_model(self)
    }

    fn refresh(&self) -> Result<()> {
        match self.model() {
            Some(list) => self.set_model(list),
            None => Ok(()),
        }
    }

    fn attach(&self, element: NodeId) -> Result<()> {
        self.set_list_container(element)
    }

    fn element(&self) -> Option<NodeId> {
        self.container()
    }

    fn model(&self) -> Option<ListModel> {
        ListController::model(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::template::{full_element_id, item_prefix};
    use crate::value::expect_object;
    use proptest::prelude::*;
    use serde_json::json;

    /// Renders each item as an empty `li` with a templated id. Items whose model has `fail` set
    /// to `create` or `delete` fail at that step.
    struct TestItem {
        doc: DocumentRef,
        state: Mutex<TestItemState>,
    }

    #[derive(Default)]
    struct TestItemState {
        model: Option<Model>,
        list_id: u64,
        item_id: u64,
        list: Option<ListModel>,
        element: Option<NodeId>,
        drawn: bool,
        fail: Option<String>,
    }

    impl TestItem {
        fn prototype(doc: &DocumentRef) -> Arc<dyn ItemController> {
            Arc::new(TestItem {
                doc: Arc::clone(doc),
                state: Mutex::default(),
            })
        }
    }

    impl ItemController for TestItem {
        fn clone_item(&self) -> Arc<dyn ItemController> {
            TestItem::prototype(&self.doc)
        }

        fn set_model(&self, model: Model) -> Result<()> {
            let mut state = self.state.lock();
            state.fail = model.get_property("fail").map(|fail| fail.to_string());
            state.model = Some(model);
            Ok(())
        }

        fn unset_model(&self) {
            self.state.lock().model = None;
        }

        fn model(&self) -> Option<Model> {
            self.state.lock().model.clone()
        }

        fn set_list_id(&self, list_id: u64) {
            self.state.lock().list_id = list_id;
        }

        fn set_list_item_id(&self, item_id: u64) -> Result<()> {
            self.state.lock().item_id = item_id;
            Ok(())
        }

        fn set_list_model(&self, list: ListModel) {
            self.state.lock().list = Some(list);
        }

        fn create_element(&self, container: NodeId, before: Option<NodeId>) -> Result<NodeId> {
            let element_id = {
                let state = self.state.lock();
                full_element_id(&item_prefix(state.list_id), "item", state.item_id)
            };
            let element = {
                let mut doc = self.doc.lock();
                let element = doc.create_element_with_id("li", &element_id);
                doc.insert_before(container, element, before)?;
                element
            };
            let mut state = self.state.lock();
            state.element = Some(element);
            if state.fail.as_deref() == Some("create") {
                return Err(Error::MissingTemplate);
            }
            Ok(element)
        }

        fn element(&self) -> Option<NodeId> {
            self.state.lock().element
        }

        fn drawn(&self) {
            self.state.lock().drawn = true;
        }

        fn deleted(&self) -> Result<()> {
            let mut state = self.state.lock();
            if state.fail.as_deref() == Some("delete") {
                return Err(Error::ItemNotFound);
            }
            match state.element.take() {
                Some(element) => self.doc.lock().remove(element),
                None => Ok(()),
            }
        }
    }

    fn object(json: serde_json::Value) -> crate::value::JsonObject {
        expect_object(json).unwrap()
    }

    fn setup() -> (DocumentRef, Arc<ListController>, NodeId) {
        let doc = Document::shared();
        let container = {
            let mut doc = doc.lock();
            let container = doc.create_element_with_id("ul", "items");
            let body = doc.body();
            doc.append_child(body, container).unwrap();
            container
        };
        let controller = ListController::new(&doc);
        controller.set_list_container_by_id("items").unwrap();
        controller.set_item_controller_prototype(TestItem::prototype(&doc));
        (doc, controller, container)
    }

    /// Controllers match the items one to one, and their elements are the container’s children.
    fn assert_aligned(doc: &DocumentRef, controller: &ListController, list: &ListModel) {
        let items = list.items();
        let controllers = controller.item_controllers();
        assert_eq!(items.len(), controllers.len());
        for (item, controller) in items.iter().zip(&controllers) {
            assert!(controller.model().unwrap().ptr_eq(item));
        }
        let elements: Vec<_> = controllers.iter().filter_map(|c| c.element()).collect();
        let container = controller.container().unwrap();
        assert_eq!(doc.lock().children(container), &elements[..]);
    }

    #[test]
    fn configuration_is_required() {
        let doc = Document::shared();
        let controller = ListController::new(&doc);
        assert_eq!(
            controller.set_model(ListModel::new()),
            Err(Error::MissingItemPrototype)
        );
        controller.set_item_controller_prototype(TestItem::prototype(&doc));
        assert_eq!(
            controller.set_model(ListModel::new()),
            Err(Error::MissingContainer)
        );
        assert_eq!(
            controller.set_list_container_by_id("missing"),
            Err(Error::ElementNotFound("missing".into()))
        );
    }

    #[test]
    fn bind_insert_delete() {
        let (doc, controller, container) = setup();
        let list = ListModel::new();
        list.push_object(&object(json!({"title": "A"})));
        controller.set_model(list.clone()).unwrap();
        assert_eq!(controller.list_id(), Some(1));
        assert_eq!(list.listener_count(), 1);

        list.push_object(&object(json!({"title": "C"})));
        list.insert_object_before(&object(json!({"title": "B"})), 1);
        assert_aligned(&doc, &controller, &list);

        let ids: Vec<_> = {
            let doc = doc.lock();
            doc.children(container)
                .iter()
                .map(|c| doc.element_id(*c).unwrap().to_string())
                .collect()
        };
        assert_eq!(ids, vec!["list1.item_#1", "list1.item_#3", "list1.item_#2"]);

        let removed = controller.item_controllers()[0].element().unwrap();
        list.delete_index(0).unwrap();
        assert_aligned(&doc, &controller, &list);
        assert!(!doc.lock().contains(removed));
    }

    #[test]
    fn rebinding_tears_down_and_keeps_counting() {
        let (doc, controller, container) = setup();
        let first = ListModel::new();
        first.push_object(&object(json!({"title": "A"})));
        controller.set_model(first.clone()).unwrap();
        let old = controller.item_controllers()[0].clone();

        let second = ListModel::new();
        second.push_object(&object(json!({"title": "B"})));
        controller.set_model(second.clone()).unwrap();

        assert_eq!(first.listener_count(), 0);
        assert!(old.element().is_none());
        assert!(old.model().is_none());
        assert_aligned(&doc, &controller, &second);

        // events from the old model are ignored
        first.push_object(&object(json!({"title": "X"})));
        assert_eq!(controller.item_controllers().len(), 1);

        let id = doc.lock().children(container)[0];
        assert_eq!(doc.lock().element_id(id), Some("list1.item_#2"));
    }

    #[test]
    fn failed_items_keep_their_place() {
        let (doc, controller, container) = setup();
        let list = ListModel::new();
        list.push_object(&object(json!({"title": "A"})));
        list.push_object(&object(json!({"title": "B", "fail": "create"})));
        list.push_object(&object(json!({"title": "C"})));

        assert_eq!(controller.set_model(list.clone()), Err(Error::MissingTemplate));
        assert_eq!(controller.item_controllers().len(), 3);
        assert_eq!(doc.lock().children(container).len(), 2);
        assert_eq!(list.listener_count(), 1);
        assert_aligned(&doc, &controller, &list);

        // inserted before the failed item, so it lands before C
        list.insert_object_before(&object(json!({"title": "D"})), 1);
        list.push_object(&object(json!({"title": "E", "fail": "create"})));
        assert_aligned(&doc, &controller, &list);
        let titles: Vec<_> = controller
            .item_controllers()
            .iter()
            .filter(|item| item.element().is_some())
            .map(|item| item.model().unwrap().get_property("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["A", "D", "C"]);

        list.delete_index(2).unwrap();
        assert_aligned(&doc, &controller, &list);
    }

    #[test]
    fn teardown_continues_past_failures() {
        let (doc, controller, container) = setup();
        let first = ListModel::new();
        first.push_object(&object(json!({"title": "A", "fail": "delete"})));
        first.push_object(&object(json!({"title": "B"})));
        controller.set_model(first.clone()).unwrap();
        let old = controller.item_controllers();
        let before = doc.lock().node_count();

        let second = ListModel::new();
        second.push_object(&object(json!({"title": "X"})));
        controller.set_model(second.clone()).unwrap();

        assert!(old.iter().all(|item| item.model().is_none()));
        assert!(old[1].element().is_none());
        assert_eq!(first.listener_count(), 0);
        assert_aligned(&doc, &controller, &second);
        assert_eq!(doc.lock().children(container).len(), 1);
        // the element the failed item left behind went with the container’s contents
        assert_eq!(doc.lock().node_count(), before - 1);
    }

    #[test]
    fn reset_rebuilds() {
        let (doc, controller, _) = setup();
        let list = ListModel::new();
        list.push_object(&object(json!({"title": "A"})));
        controller.set_model(list.clone()).unwrap();

        list.set_items_from_array(&[json!({"title": "B"}), json!({"title": "C"})])
            .unwrap();
        assert_aligned(&doc, &controller, &list);
        assert_eq!(list.listener_count(), 1);
    }

    #[test]
    fn sort_moves_existing_elements() {
        let (doc, controller, _) = setup();
        let list = ListModel::new();
        for (title, rank) in [("A", 2), ("B", 3), ("C", 1)] {
            list.push_object(&object(json!({"title": title, "rank": rank})));
        }
        controller.set_model(list.clone()).unwrap();
        let before = controller.item_controllers();

        list.sort_by_property("rank");
        let after = controller.item_controllers();
        assert_aligned(&doc, &controller, &list);
        assert!(Arc::ptr_eq(&after[0], &before[2]));
        assert!(Arc::ptr_eq(&after[1], &before[0]));
        assert!(Arc::ptr_eq(&after[2], &before[1]));
    }

    #[test]
    fn zero_length_element_toggles() {
        let (doc, controller, container) = setup();
        let empty = doc.lock().create_element("p");
        controller.set_zero_length_element(Some(empty));

        let list = ListModel::new();
        controller.set_model(list.clone()).unwrap();
        assert!(doc.lock().has_class(container, HIDDEN_CLASS));
        assert!(!doc.lock().has_class(empty, HIDDEN_CLASS));

        list.push_object(&object(json!({"title": "A"})));
        assert!(!doc.lock().has_class(container, HIDDEN_CLASS));
        assert!(doc.lock().has_class(empty, HIDDEN_CLASS));

        list.delete_index(0).unwrap();
        assert!(doc.lock().has_class(container, HIDDEN_CLASS));
    }

    #[test]
    fn unset_model_unregisters_before_teardown() {
        let (doc, controller, container) = setup();
        let list = ListModel::new();
        list.push_object(&object(json!({"title": "A"})));
        controller.set_model(list.clone()).unwrap();

        Controller::unset_model(&*controller);
        assert_eq!(list.listener_count(), 0);
        assert!(controller.item_controllers().is_empty());
        assert!(doc.lock().children(container).is_empty());
        Controller::unset_model(&*controller);
    }

    #[test]
    fn clones_share_configuration_only() {
        let (_doc, controller, _) = setup();
        let list = ListModel::new();
        controller.set_model(list).unwrap();

        let clone = controller.clone_proto();
        assert_eq!(clone.container(), controller.container());
        assert!(clone.model().is_none());
        assert_eq!(clone.list_id(), None);

        clone.set_model(ListModel::new()).unwrap();
        assert_eq!(clone.list_id(), Some(2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize),
        Push,
        Delete(usize),
        Reset(usize),
        Sort,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8usize).prop_map(Op::Insert),
            Just(Op::Push),
            (0..8usize).prop_map(Op::Delete),
            (0..4usize).prop_map(Op::Reset),
            Just(Op::Sort),
        ]
    }

    proptest! {
        /// Item controllers stay index-aligned with the items through any sequence of changes.
        #[test]
        fn controllers_stay_aligned(ops in prop::collection::vec(op_strategy(), 0..32)) {
            let (doc, controller, _) = setup();
            let list = ListModel::new();
            controller.set_model(list.clone()).unwrap();

            for (n, op) in ops.into_iter().enumerate() {
                let item = object(json!({"rank": (n * 7) % 11}));
                match op {
                    Op::Insert(index) => {
                        list.insert_object_before(&item, index);
                    }
                    Op::Push => {
                        list.push_object(&item);
                    }
                    Op::Delete(index) => {
                        let _ = list.delete_index(index);
                    }
                    Op::Reset(len) => {
                        let items: Vec<_> = (0..len).map(|i| json!({"rank": i})).collect();
                        list.set_items_from_array(&items).unwrap();
                    }
                    Op::Sort => list.sort_by_property("rank"),
                }
                assert_aligned(&doc, &controller, &list);
            }
        }
    }
}
