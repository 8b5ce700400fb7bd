//! Templated views and lists on top of [`stork_core`].
//!
//! Components here render models by linking their properties to elements declared in the
//! document: a [`LinkTable`] says which property goes where, a [`ListItemController`] renders list
//! items from a template subtree, a [`ListOfListsItem`] nests a list inside each item, and an
//! [`HtmlView`] renders a single model into an element it is attached to.

mod html_view;
mod item;
mod links;
mod list_of_lists;

pub use html_view::{HtmlView, VIEW_PREFIX};
pub use item::ListItemController;
pub use links::{LinkTable, MethodCall, PropertyMethod, TextMethod};
pub use list_of_lists::ListOfListsItem;
pub use stork_core::*;
