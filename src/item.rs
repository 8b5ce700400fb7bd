use crate::links::{LinkTable, MethodCall};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use stork_core::template::{clone_node_set_ids, full_element_id, item_prefix, update_number_ids};
use stork_core::{
    impl_prototype, Binding, Controller, ControllerListener, ControllerListeners, Copied,
    DocumentRef, Error, ItemController, ListModel,
    Listener, Model, NodeId, Prototype, Result, Shared, Value,
};

/// Configuration shared with clones.
#[derive(Clone, Default)]
struct ItemConfig {
    template: Shared<Option<NodeId>>,
    links: Copied<LinkTable>,
    listeners: Copied<ControllerListeners>,
}

impl_prototype! {
    ItemConfig { template, links, listeners }
}

/// Per-item state; clones start without any.
#[derive(Default)]
struct ItemRuntime {
    binding: Binding<Model>,
    list_id: Option<u64>,
    item_id: Option<u64>,
    list: Option<ListModel>,
}

/// An item controller that renders its item from a template.
///
/// The template is a detached subtree whose element ids end in `_#n`. Every item renders a copy
/// with the ids rewritten, and model properties are linked to the copy’s elements by the ids the
/// template used, without the suffix.
pub struct ListItemController {
    me: Weak<ListItemController>,
    doc: DocumentRef,
    config: Mutex<ItemConfig>,
    runtime: Mutex<ItemRuntime>,
}

impl ListItemController {
    pub fn new(doc: &DocumentRef) -> Arc<ListItemController> {
        Self::with_config(doc, ItemConfig::default())
    }

    fn with_config(doc: &DocumentRef, config: ItemConfig) -> Arc<ListItemController> {
        Arc::new_cyclic(|me| ListItemController {
            me: me.clone(),
            doc: Arc::clone(doc),
            config: Mutex::new(config),
            runtime: Mutex::default(),
        })
    }

    /// Clones the controller. The clone shares the template and gets its own copy of the links,
    /// but none of the item state.
    pub fn clone_controller(&self) -> Arc<ListItemController> {
        let config = self.config.lock().clone_proto();
        Self::with_config(&self.doc, config)
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub fn document(&self) -> &DocumentRef {
        &self.doc
    }

    /// Uses `template` for rendering items. The template is detached from the document.
    pub fn set_item_template(&self, template: NodeId) -> Result<()> {
        self.doc.lock().detach(template)?;
        *self.config.lock().template = Some(template);
        Ok(())
    }

    /// Uses the attached element with this id as the template.
    pub fn set_item_template_by_id(&self, element_id: &str) -> Result<()> {
        let template = self.doc.lock().require_element_by_id(element_id)?;
        self.set_item_template(template)
    }

    pub fn link_text_property(&self, property: &str, element: &str) {
        self.config.lock().links.link_text(property, element);
    }

    pub fn link_text_property_method<F>(&self, name: &str, element: &str, method: F)
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
    {
        self.config
            .lock()
            .links
            .link_text_method(name, element, method);
    }

    pub fn link_attr_property(&self, property: &str, element: &str, attribute: &str) {
        self.config
            .lock()
            .links
            .link_attribute(property, element, attribute);
    }

    pub fn map_property_to_attr(
        &self,
        property: &str,
        element: &str,
        attribute: &str,
        values: BTreeMap<String, String>,
    ) {
        self.config
            .lock()
            .links
            .map_attribute(property, element, attribute, values);
    }

    pub fn link_property_to_method<F>(&self, property: &str, elements: &[&str], method: F)
    where
        F: Fn(&MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        self.config
            .lock()
            .links
            .link_method(property, elements, method);
    }

    /// Registers a listener for controller events. Clones made afterwards start with it.
    pub fn add_listener(&self, listener: Weak<dyn ControllerListener>) -> Result<()> {
        self.config.lock().listeners.add(listener)
    }

    pub fn remove_listener(&self, listener: &Weak<dyn ControllerListener>) {
        self.config.lock().listeners.remove(listener);
    }

    pub fn list_id(&self) -> Option<u64> {
        self.runtime.lock().list_id
    }

    /// The item identifier within the list. Not the index.
    pub fn list_item_id(&self) -> Option<u64> {
        self.runtime.lock().item_id
    }

    pub fn list_model(&self) -> Option<ListModel> {
        self.runtime.lock().list.clone()
    }

    fn prefix(&self) -> String {
        item_prefix(self.list_id().unwrap_or_default())
    }

    /// The full id of the rendered copy of the template element `base_#n`.
    pub fn generate_element_id(&self, base: &str) -> String {
        full_element_id(&self.prefix(), base, self.list_item_id().unwrap_or_default())
    }

    /// Finds the rendered copy of the template element `base_#n` inside this item.
    pub fn get_contained_element(&self, base: &str) -> Result<NodeId> {
        let element_id = self.generate_element_id(base);
        let root = self.element();
        root.and_then(|root| self.doc.lock().contained_element_by_id(root, &element_id))
            .ok_or_else(|| Error::ContainedElementNotFound(base.into()))
    }

    /// Binds the item’s model and refreshes if the element exists.
    pub fn set_model(&self, model: Model) -> Result<()> {
        let attached = self.runtime.lock().binding.bind(model, &self.listener())?;
        if attached {
            self.refresh()?;
        }
        Ok(())
    }

    pub fn unset_model(&self) {
        self.runtime.lock().binding.unbind(&self.listener());
    }

    pub fn model(&self) -> Option<Model> {
        self.runtime.lock().binding.model().cloned()
    }

    /// The rendered element.
    pub fn element(&self) -> Option<NodeId> {
        self.runtime.lock().binding.element()
    }

    /// Applies every link to the rendered element. Does nothing before the element exists.
    pub fn refresh(&self) -> Result<()> {
        let (root, model, prefix, item_id) = {
            let runtime = self.runtime.lock();
            (
                runtime.binding.element(),
                runtime.binding.model().cloned(),
                item_prefix(runtime.list_id.unwrap_or_default()),
                runtime.item_id.unwrap_or_default(),
            )
        };
        let (root, model) = match (root, model) {
            (Some(root), Some(model)) => (root, model),
            _ => return Ok(()),
        };
        let links = self.config.lock().links.clone();
        links.refresh(&self.doc, &model, |doc, base| {
            doc.contained_element_by_id(root, &full_element_id(&prefix, base, item_id))
        })
    }
}

impl Listener for ListItemController {
    fn property_changed(&self, _: &Model, key: &str, _: &Value, _: &Value) {
        if let Err(err) = self.refresh() {
            tracing::error!(error = %err, key, "could not refresh list item");
        }
    }
}

impl Controller for ListItemController {
    type Model = Model;

    fn set_model(&self, model: Model) -> Result<()> {
        ListItemController::set_model(self, model)
    }

    fn unset_model(&self) {
        ListItemController::unset_model(self)
    }

    fn refresh(&self) -> Result<()> {
        ListItemController::refresh(self)
    }

    fn attach(&self, element: NodeId) -> Result<()> {
        self.runtime
            .lock()
            .binding
            .attach(&self.doc.lock(), element)
    }

    fn element(&self) -> Option<NodeId> {
        ListItemController::element(self)
    }

    fn model(&self) -> Option<Model> {
        ListItemController::model(self)
    }
}

impl ItemController for ListItemController {
    fn clone_item(&self) -> Arc<dyn ItemController> {
        self.clone_controller()
    }

    fn set_model(&self, model: Model) -> Result<()> {
        ListItemController::set_model(self, model)
    }

    fn unset_model(&self) {
        ListItemController::unset_model(self)
    }

    fn model(&self) -> Option<Model> {
        ListItemController::model(self)
    }

    fn set_list_id(&self, list_id: u64) {
        self.runtime.lock().list_id = Some(list_id);
    }

    fn set_list_item_id(&self, item_id: u64) -> Result<()> {
        let element = {
            let mut runtime = self.runtime.lock();
            runtime.item_id = Some(item_id);
            runtime.binding.element()
        };
        match element {
            Some(element) => update_number_ids(&mut self.doc.lock(), element, item_id),
            None => Ok(()),
        }
    }

    fn set_list_model(&self, list: ListModel) {
        self.runtime.lock().list = Some(list);
    }

    /// Renders a copy of the template into `container` and fills it from the model.
    fn create_element(&self, container: NodeId, before: Option<NodeId>) -> Result<NodeId> {
        let template = (*self.config.lock().template).ok_or(Error::MissingTemplate)?;
        let prefix = self.prefix();
        let item_id = self.list_item_id().unwrap_or_default();
        let element = {
            let mut doc = self.doc.lock();
            let element = clone_node_set_ids(&mut doc, template, &prefix, item_id)?;
            doc.insert_before(container, element, before)?;
            element
        };
        self.runtime.lock().binding.set_element(Some(element));
        self.refresh()?;
        Ok(element)
    }

    fn element(&self) -> Option<NodeId> {
        ListItemController::element(self)
    }

    /// Tells the listeners that this item was selected. Does nothing unless the item is rendered.
    fn select(&self) {
        let model = match (self.element(), self.model()) {
            (Some(_), Some(model)) => model,
            _ => return,
        };
        let listeners = self.config.lock().listeners.snapshot();
        tracing::debug!(listeners = listeners.len(), "list item selected");
        for listener in listeners {
            listener.item_selected(self, &model);
        }
    }

    /// Removes the rendered element from the document.
    fn deleted(&self) -> Result<()> {
        let element = self.runtime.lock().binding.element();
        if let Some(element) = element {
            self.runtime.lock().binding.set_element(None);
            self.doc.lock().remove(element)?;
        }
        Ok(())
    }
}
