//! Views rendering a single model into an element.
//!
//! An [`HtmlView`] is attached to an element and links model properties to the elements inside
//! it, by id. Cloning a view that has an element gives the clone a deep copy of that element with
//! every id rewritten to a fresh unique one; [`HtmlView::get_my_element_by_id`] translates the
//! original ids to the ones in the copy, so links declared on the prototype keep working.

use crate::links::{LinkTable, MethodCall};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use stork_core::template::{clone_node_set_ids, full_element_id};
use stork_core::{
    impl_prototype, Binding, Controller, Copied, Document, DocumentRef, Listener, Model, NodeId,
    Prototype, Result, Shared, Value,
};

/// Id prefix of elements copied for cloned views.
pub const VIEW_PREFIX: &str = "view-";

#[derive(Default)]
struct ViewState {
    links: Copied<LinkTable>,
    binding: Binding<Model>,
    /// Unique index of the copied element, if this view renders a copy.
    element_index: Shared<Option<u64>>,
}

impl_prototype! {
    ViewState { links, binding, element_index }
}

/// Finds the element that had id `base` in the original element, inside `root`.
fn find_element(doc: &Document, root: NodeId, index: Option<u64>, base: &str) -> Option<NodeId> {
    let element_id = match index {
        Some(index) => full_element_id(VIEW_PREFIX, base, index),
        None => base.to_string(),
    };
    if doc.is_attached(root) {
        doc.element_by_id(&element_id)
    } else {
        doc.contained_element_by_id(root, &element_id)
    }
}

/// A view of one model, rendered into an element.
pub struct HtmlView {
    me: Weak<HtmlView>,
    doc: DocumentRef,
    state: Mutex<ViewState>,
}

impl HtmlView {
    pub fn new(doc: &DocumentRef) -> Arc<HtmlView> {
        Self::with_state(doc, ViewState::default())
    }

    fn with_state(doc: &DocumentRef, state: ViewState) -> Arc<HtmlView> {
        Arc::new_cyclic(|me| HtmlView {
            me: me.clone(),
            doc: Arc::clone(doc),
            state: Mutex::new(state),
        })
    }

    fn listener(&self) -> Weak<dyn Listener> {
        self.me.clone()
    }

    pub fn document(&self) -> &DocumentRef {
        &self.doc
    }

    /// Clones the view.
    ///
    /// The clone gets its own copy of the links and the same model, and is registered with it.
    /// If this view has an element, the clone renders into a detached deep copy of it; use
    /// [`HtmlView::append_to_element`] to put the copy in the document.
    pub fn clone_view(&self) -> Result<Arc<HtmlView>> {
        let mut state = self.state.lock().clone_proto();
        if let Some(element) = state.binding.element() {
            let mut doc = self.doc.lock();
            let index = doc.next_unique_id();
            let copy = clone_node_set_ids(&mut doc, element, VIEW_PREFIX, index)?;
            state.binding.set_element(Some(copy));
            *state.element_index = Some(index);
        }
        let model = state.binding.model().cloned();
        let view = Self::with_state(&self.doc, state);
        if let Some(model) = model {
            model.add_listener(view.listener())?;
        }
        tracing::debug!(index = ?view.element_index(), "view cloned");
        Ok(view)
    }

    /// Renders into the attached element with this id.
    pub fn attach_by_id(&self, element_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.binding.attach_by_id(&self.doc.lock(), element_id)?;
        *state.element_index = None;
        Ok(())
    }

    /// Index of the copied element, `None` if the view renders an element it was attached to.
    pub fn element_index(&self) -> Option<u64> {
        *self.state.lock().element_index
    }

    /// Finds an element of this view by the id it has in the original element.
    pub fn get_my_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        let (root, index) = {
            let state = self.state.lock();
            (state.binding.element(), *state.element_index)
        };
        find_element(&self.doc.lock(), root?, index, element_id)
    }

    /// Appends the element of this view to `parent`. Does nothing without an element.
    pub fn append_to_element(&self, parent: NodeId) -> Result<()> {
        match self.element() {
            Some(element) => self.doc.lock().append_child(parent, element),
            None => Ok(()),
        }
    }

    pub fn link_text_property(&self, property: &str, element: &str) {
        self.state.lock().links.link_text(property, element);
    }

    pub fn link_text_property_method<F>(&self, name: &str, element: &str, method: F)
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
    {
        self.state
            .lock()
            .links
            .link_text_method(name, element, method);
    }

    pub fn link_attr_property(&self, property: &str, element: &str, attribute: &str) {
        self.state
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
        self.state
            .lock()
            .links
            .map_attribute(property, element, attribute, values);
    }

    pub fn link_property_to_method<F>(&self, property: &str, elements: &[&str], method: F)
    where
        F: Fn(&MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .links
            .link_method(property, elements, method);
    }
}

impl Listener for HtmlView {
    fn property_changed(&self, _: &Model, key: &str, _: &Value, _: &Value) {
        if let Err(err) = self.refresh() {
            tracing::error!(error = %err, key, "could not refresh view");
        }
    }
}

impl Controller for HtmlView {
    type Model = Model;

    fn set_model(&self, model: Model) -> Result<()> {
        self.state.lock().binding.bind(model, &self.listener())?;
        self.refresh()
    }

    fn unset_model(&self) {
        self.state.lock().binding.unbind(&self.listener());
    }

    fn refresh(&self) -> Result<()> {
        let (root, index, model, links) = {
            let state = self.state.lock();
            (
                state.binding.element(),
                *state.element_index,
                state.binding.model().cloned(),
                state.links.clone(),
            )
        };
        match (root, model) {
            (Some(root), Some(model)) => links.refresh(&self.doc, &model, |doc, base| {
                find_element(doc, root, index, base)
            }),
            _ => Ok(()),
        }
    }

    /// Renders into `element`, which is used as is.
    fn attach(&self, element: NodeId) -> Result<()> {
        let mut state = self.state.lock();
        state.binding.attach(&self.doc.lock(), element)?;
        *state.element_index = None;
        Ok(())
    }

    fn element(&self) -> Option<NodeId> {
        self.state.lock().binding.element()
    }

    fn model(&self) -> Option<Model> {
        self.state.lock().binding.model().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stork_core::Error;

    /// `div#card > h1#title + a#link`, attached.
    fn card() -> (DocumentRef, NodeId, NodeId) {
        let doc = Document::shared();
        let (card, title) = {
            let mut doc = doc.lock();
            let body = doc.body();
            let card = doc.create_element_with_id("div", "card");
            let title = doc.create_element_with_id("h1", "title");
            let link = doc.create_element_with_id("a", "link");
            doc.append_child(card, title).unwrap();
            doc.append_child(card, link).unwrap();
            doc.append_child(body, card).unwrap();
            (card, title)
        };
        (doc, card, title)
    }

    #[test]
    fn attached_view_follows_its_model() {
        let (doc, card, title) = card();
        let view = HtmlView::new(&doc);
        view.attach_by_id("card").unwrap();
        view.link_text_property("name", "title");
        view.link_attr_property("url", "link", "href");

        let model = Model::new();
        model.set_property("name", "Stork");
        view.set_model(model.clone()).unwrap();

        assert_eq!(view.element(), Some(card));
        assert_eq!(view.get_my_element_by_id("title"), Some(title));
        assert_eq!(doc.lock().text_content(title), "Stork");

        model.set_property("url", "/stork");
        let link = view.get_my_element_by_id("link").unwrap();
        assert_eq!(doc.lock().attribute(link, "href"), Some("/stork"));
    }

    #[test]
    fn clones_render_into_their_own_copy() {
        let (doc, card, title) = card();
        let view = HtmlView::new(&doc);
        view.attach(card).unwrap();
        view.link_text_property("name", "title");
        let model = Model::new();
        model.set_property("name", "A");
        view.set_model(model.clone()).unwrap();

        let copy = view.clone_view().unwrap();
        copy.link_attr_property("name", "title", "data-name");
        let copy_element = copy.element().unwrap();
        let copy_title = copy.get_my_element_by_id("title").unwrap();
        assert_ne!(copy_element, card);
        assert_ne!(copy_title, title);
        assert!(!doc.lock().is_attached(copy_element));
        assert_eq!(model.listener_count(), 2);

        let index = copy.element_index().unwrap();
        assert_eq!(
            doc.lock().element_id(copy_title),
            Some(full_element_id(VIEW_PREFIX, "title", index).as_str())
        );

        model.set_property("name", "B");
        assert_eq!(doc.lock().text_content(title), "B");
        assert_eq!(doc.lock().text_content(copy_title), "B");
        // links added to the clone stay on the clone
        assert_eq!(doc.lock().attribute(copy_title, "data-name"), Some("B"));
        assert_eq!(doc.lock().attribute(title, "data-name"), None);

        let body = doc.lock().body();
        copy.append_to_element(body).unwrap();
        assert!(doc.lock().is_attached(copy_element));
        assert_eq!(copy.get_my_element_by_id("title"), Some(copy_title));
    }

    #[test]
    fn clones_of_clones_get_fresh_ids() {
        let (doc, card, _) = card();
        let view = HtmlView::new(&doc);
        view.attach(card).unwrap();

        let first = view.clone_view().unwrap();
        let second = first.clone_view().unwrap();
        let (first_title, second_title) = (
            first.get_my_element_by_id("title").unwrap(),
            second.get_my_element_by_id("title").unwrap(),
        );
        assert_ne!(first_title, second_title);
        assert_ne!(first.element_index(), second.element_index());
        let doc = doc.lock();
        assert_ne!(doc.element_id(first_title), doc.element_id(second_title));
    }

    #[test]
    fn view_without_element() {
        let (doc, _, _) = card();
        let view = HtmlView::new(&doc);
        view.link_text_property("name", "title");
        view.set_model(Model::new()).unwrap();
        assert_eq!(view.get_my_element_by_id("title"), None);
        assert_eq!(view.attach_by_id("nope"), Err(Error::MissingElement));

        let copy = view.clone_view().unwrap();
        assert!(copy.element().is_none());
        assert!(copy.element_index().is_none());
        let body = doc.lock().body();
        view.append_to_element(body).unwrap();
    }
}
