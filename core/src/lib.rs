//! UI toolkit core.
//!
//! # Conceptual overview
//! Stork builds user interfaces out of prototypes and observable models, rendered into a
//! document.
//!
//! ## Prototypes
//! There are no classes. A new object is made by cloning an existing one, which then serves as
//! its prototype: anything the clone does not set itself is looked up on the prototype, live.
//! Because of that, mutable state on a prototype would be shared by every clone, so prototypes
//! declare which properties need to be copied (containers like listener lists, shallowly) or
//! cloned (stateful sub-objects, with their own lineage) whenever they are cloned. These
//! declarations are applied before a clone is handed out and compound over generations.
//!
//! The typed components of this crate are prototypes too. Their state structs mark fields as
//! [`Copied`], [`Cloned`] or [`Shared`], and [`impl_prototype!`] derives the clone.
//!
//! ## Models
//! A [`Model`] is a key/value store. Every property change synchronously notifies every
//! registered [`Listener`], in registration order, before returning. Listeners are held weakly
//! and may react by changing models again; no lock is held while they run.
//!
//! A [`ListModel`] additionally holds an ordered sequence of item models and reports inserts,
//! deletes, resets and sorts with enough detail to update only the affected part of a view.
//!
//! ## Controllers and views
//! A [`Controller`] is bound to one model at a time. Binding registers it as a listener (after
//! unregistering from the previous model) and refreshes it if it is attached to an element, so it
//! never shows content from a previous model. The default reaction to a change is a full refresh
//! of the controller; finer updates are the business of link tables in the templating layer.
//!
//! ## Lists
//! A [`ListController`] keeps one [`ItemController`] per item of its list model, in the same
//! order. Each item controller renders its own subtree, made from a template whose ids are
//! rewritten with a list prefix and an item identifier so that no two rendered subtrees share an
//! id, even across lists of lists.
//!
//! ## Document
//! Rendering targets a [`Document`]: an arena of element and text nodes addressed by
//! [`NodeId`]. Element ids are a derived addressing scheme on top of that.

pub mod controller;
pub mod dom;
mod error;
pub mod list;
pub mod list_model;
pub mod model;
#[macro_use]
pub mod proto;
pub mod template;
pub mod value;

pub use controller::{Binding, Controller, ControllerListener, ControllerListeners};
pub use dom::{Document, DocumentRef, NodeId};
pub use error::{Error, Result};
pub use list::{ItemController, ListController};
pub use list_model::ListModel;
pub use model::{Listener, Model, Observable};
pub use proto::{clone, Call, Cloned, Copied, Object, Prototype, Shared};
pub use value::{expect_object, JsonObject, Value};
