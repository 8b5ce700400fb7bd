use stork_core::{Document, DocumentRef, Model, NodeId, Result, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Computes text from a model.
pub type TextMethod = Arc<dyn Fn(&Model) -> Value + Send + Sync>;

/// Called when a linked property may have changed.
pub type PropertyMethod = Arc<dyn Fn(&MethodCall) -> Result<()> + Send + Sync>;

/// Arguments of a [`PropertyMethod`].
///
/// The document is not locked while the method runs.
pub struct MethodCall<'a> {
    pub doc: &'a DocumentRef,
    pub model: &'a Model,
    pub property: &'a str,
    /// Resolved elements, keyed by the ids the link was declared with. Ids that did not resolve
    /// are absent.
    pub elements: &'a BTreeMap<String, NodeId>,
}

#[derive(Clone)]
struct TextMethodLink {
    element: String,
    method: TextMethod,
}

#[derive(Clone, Debug)]
struct AttrLink {
    element: String,
    attribute: String,
}

#[derive(Clone, Debug)]
struct AttrMap {
    element: String,
    attribute: String,
    values: BTreeMap<String, String>,
}

#[derive(Clone)]
struct MethodLink {
    elements: Vec<String>,
    method: PropertyMethod,
}

/// Declarations linking model properties to parts of a rendered element.
///
/// Each table is keyed by model property (or method name); linking a key again replaces the
/// previous link. Links whose element cannot be found, and attribute links whose property is
/// unset, are skipped when refreshing.
#[derive(Clone, Default)]
pub struct LinkTable {
    text: BTreeMap<String, String>,
    text_methods: BTreeMap<String, TextMethodLink>,
    attributes: BTreeMap<String, AttrLink>,
    attribute_maps: BTreeMap<String, AttrMap>,
    methods: BTreeMap<String, MethodLink>,
}

impl LinkTable {
    /// Renders `property` as the text of `element`.
    pub fn link_text(&mut self, property: &str, element: &str) {
        self.text.insert(property.into(), element.into());
    }

    /// Renders the result of `method` as the text of `element`.
    pub fn link_text_method<F>(&mut self, name: &str, element: &str, method: F)
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
    {
        self.text_methods.insert(
            name.into(),
            TextMethodLink {
                element: element.into(),
                method: Arc::new(method),
            },
        );
    }

    /// Sets `attribute` of `element` to the value of `property`.
    pub fn link_attribute(&mut self, property: &str, element: &str, attribute: &str) {
        self.attributes.insert(
            property.into(),
            AttrLink {
                element: element.into(),
                attribute: attribute.into(),
            },
        );
    }

    /// Sets `attribute` of `element` to the entry of `values` matching the value of `property`.
    /// Values without an entry leave the attribute alone.
    pub fn map_attribute(
        &mut self,
        property: &str,
        element: &str,
        attribute: &str,
        values: BTreeMap<String, String>,
    ) {
        self.attribute_maps.insert(
            property.into(),
            AttrMap {
                element: element.into(),
                attribute: attribute.into(),
                values,
            },
        );
    }

    /// Calls `method` on every refresh, with the elements named in `elements`.
    pub fn link_method<F>(&mut self, property: &str, elements: &[&str], method: F)
    where
        F: Fn(&MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        self.methods.insert(
            property.into(),
            MethodLink {
                elements: elements.iter().map(|e| e.to_string()).collect(),
                method: Arc::new(method),
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.text_methods.is_empty()
            && self.attributes.is_empty()
            && self.attribute_maps.is_empty()
            && self.methods.is_empty()
    }

    /// Applies every link. `resolve` maps the element ids used in the links to nodes.
    pub fn refresh<R>(&self, doc: &DocumentRef, model: &Model, resolve: R) -> Result<()>
    where
        R: Fn(&Document, &str) -> Option<NodeId>,
    {
        // model reads and text methods run before the document is locked
        let mut texts = Vec::new();
        for (property, element) in &self.text {
            let text = model.get_property(property).unwrap_or_default();
            texts.push((element, text.to_string()));
        }
        for link in self.text_methods.values() {
            texts.push((&link.element, (link.method)(model).to_string()));
        }

        let mut attributes = Vec::new();
        for (property, link) in &self.attributes {
            if let Some(value) = model.get_property(property) {
                attributes.push((&link.element, &link.attribute, value.to_string()));
            }
        }
        for (property, map) in &self.attribute_maps {
            let mapped = model
                .get_property(property)
                .and_then(|value| map.values.get(&value.to_string()));
            if let Some(mapped) = mapped {
                attributes.push((&map.element, &map.attribute, mapped.clone()));
            }
        }

        let mut calls = Vec::new();
        {
            let mut doc = doc.lock();
            for (element, text) in texts {
                if let Some(node) = resolve(&doc, element) {
                    doc.set_text(node, &text)?;
                }
            }
            for (element, attribute, value) in attributes {
                if let Some(node) = resolve(&doc, element) {
                    doc.set_attribute(node, attribute, &value)?;
                }
            }
            for (property, link) in &self.methods {
                let elements: BTreeMap<_, _> = link
                    .elements
                    .iter()
                    .filter_map(|id| resolve(&doc, id).map(|node| (id.clone(), node)))
                    .collect();
                calls.push((property, &link.method, elements));
            }
        }

        for (property, method, elements) in calls {
            method(&MethodCall {
                doc,
                model,
                property,
                elements: &elements,
            })?;
        }
        Ok(())
    }
}
