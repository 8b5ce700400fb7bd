//! The controller/view binding protocol.
//!
//! A controller (or view) is bound to one model at a time and to at most one element. Binding
//! registers it as a listener of the model; rebinding unregisters it from the previous model
//! first, and a bound controller that is attached refreshes right away so it never shows content
//! from the model it was bound to before.
//!
//! [`Binding`] holds that state and implements the ordering. Components keep it behind their own
//! lock and call [`Controller::refresh`] only after releasing it, because a refresh reads the
//! model and may cause further notifications.

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::list::ItemController;
use crate::model::{Listener, Model, Observable};
use crate::proto::Prototype;
use std::sync::{Arc, Weak};

/// A controller or view bound to a model.
pub trait Controller: Send + Sync {
    type Model: Observable;

    /// Binds a model, unbinding the previous one first. Refreshes if attached.
    fn set_model(&self, model: Self::Model) -> Result<()>;

    /// Unbinds the model. Does nothing if no model is bound.
    fn unset_model(&self);

    /// Re-renders everything that depends on the model.
    fn refresh(&self) -> Result<()>;

    /// Sets the element this controller renders into. Fails with [`Error::MissingElement`] if
    /// the element does not exist.
    fn attach(&self, element: NodeId) -> Result<()>;

    fn element(&self) -> Option<NodeId>;

    fn model(&self) -> Option<Self::Model>;
}

/// Model and element of a controller.
#[derive(Debug)]
pub struct Binding<M> {
    model: Option<M>,
    element: Option<NodeId>,
}

impl<M> Default for Binding<M> {
    fn default() -> Self {
        Binding {
            model: None,
            element: None,
        }
    }
}

impl<M: Observable> Binding<M> {
    pub fn new() -> Binding<M> {
        Binding::default()
    }

    /// Unregisters `listener` from the current model (if any) and registers it with `model`.
    ///
    /// Returns true if the controller is attached and should refresh.
    pub fn bind(&mut self, model: M, listener: &Weak<dyn Listener>) -> Result<bool> {
        self.unbind(listener);
        model.add_listener(listener.clone())?;
        self.model = Some(model);
        Ok(self.element.is_some())
    }

    /// Unregisters `listener` from the current model and forgets it.
    pub fn unbind(&mut self, listener: &Weak<dyn Listener>) -> Option<M> {
        let model = self.model.take()?;
        model.remove_listener(listener);
        Some(model)
    }

    /// Sets the element, which must exist in `doc`.
    pub fn attach(&mut self, doc: &Document, element: NodeId) -> Result<()> {
        if !doc.contains(element) {
            return Err(Error::MissingElement);
        }
        self.element = Some(element);
        Ok(())
    }

    /// Sets the element by id; it must be attached to `doc`.
    pub fn attach_by_id(&mut self, doc: &Document, element_id: &str) -> Result<()> {
        let element = doc.element_by_id(element_id).ok_or(Error::MissingElement)?;
        self.attach(doc, element)
    }

    /// Sets the element without checking it. Used by components that created it themselves.
    pub fn set_element(&mut self, element: Option<NodeId>) {
        self.element = element;
    }

    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.model.is_some()
    }
}

/// A cloned binding refers to the same model and element. It is not registered with the model;
/// that is up to the component that owns it.
impl<M: Clone> Prototype for Binding<M> {
    fn clone_proto(&self) -> Self {
        Binding {
            model: self.model.clone(),
            element: self.element,
        }
    }
}

/// Receives events raised by controllers, such as the user selecting a list item.
pub trait ControllerListener: Send + Sync {
    fn item_selected(&self, _item: &dyn ItemController, _model: &Model) {}
}

/// Listeners of a controller.
///
/// Held weakly, like model listeners. Components keep the list in a [`Copied`](crate::Copied)
/// field, so clones start out with the listeners registered on their prototype.
#[derive(Clone, Default)]
pub struct ControllerListeners(Vec<Weak<dyn ControllerListener>>);

impl ControllerListeners {
    /// Registers a listener. Fails with [`Error::EmptyListener`] if it no longer exists.
    pub fn add(&mut self, listener: Weak<dyn ControllerListener>) -> Result<()> {
        if listener.strong_count() == 0 {
            return Err(Error::EmptyListener);
        }
        self.0.push(listener);
        Ok(())
    }

    /// Unregisters a listener. Does nothing if it is not registered.
    pub fn remove(&mut self, listener: &Weak<dyn ControllerListener>) {
        let target = listener.as_ptr().cast::<()>();
        self.0
            .retain(|existing| existing.as_ptr().cast::<()>() != target);
    }

    /// Live listeners, in registration order. Drops the ones that no longer exist.
    pub fn snapshot(&mut self) -> Vec<Arc<dyn ControllerListener>> {
        self.0.retain(|listener| listener.strong_count() > 0);
        self.0.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
