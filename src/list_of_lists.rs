use crate::item::ListItemController;
use parking_lot::Mutex;
use std::sync::Arc;
use stork_core::{
    impl_prototype, Cloned, DocumentRef, Error, ItemController, ListController, ListModel, Model,
    NodeId, Prototype, Result, Shared,
};

struct SubListState {
    sub_list: Cloned<Arc<ListController>>,
    container_id: Shared<String>,
    model_property: Shared<String>,
}

impl_prototype! {
    SubListState { sub_list, container_id, model_property }
}

/// An item that renders a nested list.
///
/// Rendering is done by a [`ListItemController`] base. Once the base has rendered the item, the
/// sub-list controller is pointed at the contained element `container_id` and bound to the list
/// model stored in the item’s `model_property`. Every clone gets its own sub-list controller,
/// cloned from the prototype’s, so configure the sub-list (item prototype, zero-length element)
/// through [`ListOfListsItem::sub_list_controller`] before the item is used as a prototype.
pub struct ListOfListsItem {
    base: Arc<ListItemController>,
    state: Mutex<SubListState>,
}

impl ListOfListsItem {
    pub fn new(doc: &DocumentRef, container_id: &str, model_property: &str) -> Arc<ListOfListsItem> {
        Arc::new(ListOfListsItem {
            base: ListItemController::new(doc),
            state: Mutex::new(SubListState {
                sub_list: Cloned(ListController::new(doc)),
                container_id: Shared(container_id.into()),
                model_property: Shared(model_property.into()),
            }),
        })
    }

    /// The item controller that renders this item. Templates and links are configured on it.
    pub fn base(&self) -> &Arc<ListItemController> {
        &self.base
    }

    pub fn sub_list_controller(&self) -> Arc<ListController> {
        self.state.lock().sub_list.0.clone()
    }

    pub fn set_sub_list_container_id(&self, container_id: &str) {
        *self.state.lock().container_id = container_id.into();
    }

    pub fn set_sub_list_model_property(&self, property: &str) {
        *self.state.lock().model_property = property.into();
    }

    pub fn clone_controller(&self) -> Arc<ListOfListsItem> {
        Arc::new(ListOfListsItem {
            base: self.base.clone_controller(),
            state: Mutex::new(self.state.lock().clone_proto()),
        })
    }

    fn bind_sub_list(&self) -> Result<()> {
        let (sub_list, container_id, property) = {
            let state = self.state.lock();
            (
                state.sub_list.0.clone(),
                state.container_id.0.clone(),
                state.model_property.0.clone(),
            )
        };
        let container = self.base.get_contained_element(&container_id)?;
        let list = self
            .base
            .model()
            .and_then(|model| model.get_property(&property))
            .and_then(|value| value.as_list().cloned())
            .ok_or(Error::NotAListModel(property))?;
        sub_list.set_list_container(container)?;
        sub_list.set_model(list)
    }
}

impl ItemController for ListOfListsItem {
    fn clone_item(&self) -> Arc<dyn ItemController> {
        self.clone_controller()
    }

    fn set_model(&self, model: Model) -> Result<()> {
        self.base.set_model(model)
    }

    fn unset_model(&self) {
        self.base.unset_model()
    }

    fn model(&self) -> Option<Model> {
        self.base.model()
    }

    fn set_list_id(&self, list_id: u64) {
        self.base.set_list_id(list_id)
    }

    fn set_list_item_id(&self, item_id: u64) -> Result<()> {
        self.base.set_list_item_id(item_id)
    }

    fn set_list_model(&self, list: ListModel) {
        self.base.set_list_model(list)
    }

    /// Renders the item, then the nested list inside it. If the nested list cannot be bound,
    /// the item’s element is removed again.
    fn create_element(&self, container: NodeId, before: Option<NodeId>) -> Result<NodeId> {
        let element = self.base.create_element(container, before)?;
        if let Err(err) = self.bind_sub_list() {
            self.sub_list_controller().unset_model();
            if let Err(cleanup) = self.base.deleted() {
                tracing::error!(error = %cleanup, "could not remove list item");
            }
            return Err(err);
        }
        Ok(element)
    }

    fn element(&self) -> Option<NodeId> {
        self.base.element()
    }

    fn drawn(&self) {
        self.base.drawn()
    }

    fn select(&self) {
        self.base.select()
    }

    fn deleted(&self) -> Result<()> {
        self.sub_list_controller().unset_model();
        self.base.deleted()
    }
}
