//! Prototype cloning.
//!
//! There are no classes: new objects are made by cloning existing ones, and every object can serve
//! as the prototype of further clones. Two flavours live here.
//!
//! - [`Object`] is the dynamic form: a bag of slots with a parent link. Lookups of slots an object
//!   has not set itself fall through to its ancestors, live (a later change to the prototype is
//!   visible in the clone until the clone sets its own value). Methods are slots too, and an
//!   overriding method reaches the implementation it overrides through [`Call::call_super`].
//! - [`Prototype`] is the static form, implemented by the typed components of this crate. Their
//!   fields are wrapped in [`Copied`], [`Cloned`] or [`Shared`] to declare what a clone gets, and
//!   [`impl_prototype!`] derives the clone from those declarations.
//!
//! In both forms the isolation of copied and cloned properties happens before the clone is handed
//! to the caller, so a fresh clone never shares a mutable container with its prototype.

use crate::error::{Error, Result};
use crate::value::Value;
use core::fmt;
use core::ops::{Deref, DerefMut};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the post-clone hook slot.
pub const CLONED_HOOK: &str = "cloned";

/// Types that can be cloned as prototypes.
pub trait Prototype: Sized {
    /// Creates a new object from this one, with property isolation applied.
    fn clone_proto(&self) -> Self;
}

/// Clones a prototype.
pub fn clone<P: Prototype>(prototype: &P) -> P {
    prototype.clone_proto()
}

/// Derives [`Prototype`] for a struct whose fields all implement it (usually through
/// [`Copied`], [`Cloned`] and [`Shared`]).
///
/// Syntax:
///
/// ```text
/// impl_prototype! {
///     StructName { field_a, field_b, ... }
/// }
/// ```
#[macro_export]
macro_rules! impl_prototype {
    (
        $(#[$attr:meta])*
        $struct:ident { $($field:ident),* $(,)? }
    ) => {
        $(#[$attr])*
        impl $crate::proto::Prototype for $struct {
            fn clone_proto(&self) -> Self {
                $struct {
                    $($field: $crate::proto::Prototype::clone_proto(&self.$field),)*
                }
            }
        }
    };
}

/// A copied property: every clone gets its own shallow copy of the current value.
///
/// Use it for owned containers (listener lists, link tables) that must not leak mutations between
/// sibling clones. Values inside the container are not copied deeper than `Clone` goes, so handles
/// stored in it stay shared.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Copied<T>(pub T);

impl<T: Clone> Prototype for Copied<T> {
    fn clone_proto(&self) -> Self {
        Copied(self.0.clone())
    }
}

impl<T> Deref for Copied<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Copied<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// A cloned property: every clone gets a prototype clone of the value, with its own lineage.
#[derive(Debug, Default)]
pub struct Cloned<P>(pub P);

impl<P: Prototype> Prototype for Cloned<P> {
    fn clone_proto(&self) -> Self {
        Cloned(self.0.clone_proto())
    }
}

impl<P> Deref for Cloned<P> {
    type Target = P;
    fn deref(&self) -> &P {
        &self.0
    }
}

impl<P> DerefMut for Cloned<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.0
    }
}

/// A plain property: clones start out with the prototype’s value. Handles stay shared.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shared<T>(pub T);

impl<T: Clone> Prototype for Shared<T> {
    fn clone_proto(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Shared<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// A method slot.
pub type Method = Arc<dyn Fn(&Call) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
enum Slot {
    Value(Value),
    Method(Method),
}

#[derive(Default)]
struct Slots {
    own: HashMap<String, Slot>,
    /// Names of copied properties. Every object owns its list.
    copy_properties: Vec<String>,
    /// Names of cloned properties. Every object owns its list.
    clone_properties: Vec<String>,
}

struct ObjectInner {
    parent: Option<Object>,
    slots: Mutex<Slots>,
}

/// A dynamic prototype object.
///
/// `Object` is a handle; `Clone` makes another handle to the same object. Use
/// [`derive`](Object::derive) (or [`clone`]) to make a new object that delegates to this one.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

/// An invocation of a method slot.
pub struct Call<'a> {
    /// The object the method was called on.
    pub receiver: &'a Object,
    /// The object in the receiver’s chain that holds the running implementation.
    pub owner: &'a Object,
    pub name: &'a str,
    pub args: &'a [Value],
}

impl<'a> Call<'a> {
    /// Calls the implementation this one overrides, with the same receiver and arguments.
    pub fn call_super(&self) -> Result<Value> {
        self.call_super_with(self.args)
    }

    /// Calls the implementation this one overrides, with the same receiver.
    pub fn call_super_with(&self, args: &[Value]) -> Result<Value> {
        let found = match self.owner.parent() {
            Some(parent) => parent.lookup_method(self.name),
            None => None,
        };
        match found {
            Some((owner, method)) => method(&Call {
                receiver: self.receiver,
                owner: &owner,
                name: self.name,
                args,
            }),
            // the base post-clone hook does nothing
            None if self.name == CLONED_HOOK => Ok(Value::Null),
            None => {
                tracing::warn!(
                    method = self.name,
                    "super dispatch found no ancestor implementation"
                );
                Err(Error::SuperNotFound(self.name.into()))
            }
        }
    }

    /// Returns an argument, or `Null` if it was not passed.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::root()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let slots = self.0.slots.lock();
        let mut names: Vec<_> = slots.own.keys().collect();
        names.sort();
        f.debug_struct("Object")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("own", &names)
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

impl Object {
    /// Creates a root object: no parent and no properties.
    ///
    /// A post-clone hook defined anywhere in a chain, roots included, can always call
    /// [`Call::call_super`]: past the topmost hook it reaches the base hook, which does nothing.
    pub fn root() -> Object {
        Object(Arc::new(ObjectInner {
            parent: None,
            slots: Mutex::new(Slots::default()),
        }))
    }

    /// Creates a new object delegating to this one. Same as [`clone`].
    ///
    /// A failing post-clone hook is logged; use [`try_derive`](Object::try_derive) to get the
    /// error instead.
    pub fn derive(&self) -> Object {
        self.clone_proto()
    }

    /// Creates a new object delegating to this one, failing if its post-clone hook fails.
    pub fn try_derive(&self) -> Result<Object> {
        let object = self.new_child();
        object.run_cloned_hook()?;
        Ok(object)
    }

    pub fn parent(&self) -> Option<&Object> {
        self.0.parent.as_ref()
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Iterates over this object and its ancestors.
    fn chain(&self) -> impl Iterator<Item = &Object> {
        std::iter::successors(Some(self), |object| object.parent())
    }

    /// Looks up a value, delegating to ancestors for slots this object has not set.
    ///
    /// A method slot shadows values further up the chain and yields `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        for object in self.chain() {
            match object.0.slots.lock().own.get(name) {
                Some(Slot::Value(value)) => return Some(value.clone()),
                Some(Slot::Method(_)) => return None,
                None => (),
            }
        }
        None
    }

    /// Sets a value on this object (never on an ancestor).
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.0
            .slots
            .lock()
            .own
            .insert(name.into(), Slot::Value(value.into()));
    }

    /// Returns true if this object itself holds the slot.
    pub fn has_own(&self, name: &str) -> bool {
        self.0.slots.lock().own.contains_key(name)
    }

    /// Mutates a value in place, in whichever object of the chain holds it.
    ///
    /// This is how a shared container gets mutated through a clone that never set it; copied
    /// properties exist so that this does not reach the prototype. `f` must not access this
    /// object’s chain.
    pub fn update<R>(&self, name: &str, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        for object in self.chain() {
            let mut slots = object.0.slots.lock();
            match slots.own.get_mut(name) {
                Some(Slot::Value(value)) => return Some(f(value)),
                Some(Slot::Method(_)) => return None,
                None => (),
            }
        }
        None
    }

    /// Declares a copied property and sets its default value.
    pub fn copied_property(&self, name: &str, default: impl Into<Value>) {
        let mut slots = self.0.slots.lock();
        slots.own.insert(name.into(), Slot::Value(default.into()));
        if !slots.copy_properties.iter().any(|p| p == name) {
            slots.copy_properties.push(name.into());
        }
    }

    /// Declares a cloned property: every clone of this object gets its own clone of `source`.
    pub fn cloned_property(&self, name: &str, source: Object) {
        let mut slots = self.0.slots.lock();
        slots.own.insert(name.into(), Slot::Value(Value::Object(source)));
        if !slots.clone_properties.iter().any(|p| p == name) {
            slots.clone_properties.push(name.into());
        }
    }

    /// Names of the copied properties declared on this object or inherited at clone time.
    pub fn copy_properties(&self) -> Vec<String> {
        self.0.slots.lock().copy_properties.clone()
    }

    /// Names of the cloned properties declared on this object or inherited at clone time.
    pub fn clone_properties(&self) -> Vec<String> {
        self.0.slots.lock().clone_properties.clone()
    }

    /// Sets a method slot on this object.
    pub fn define_method<F>(&self, name: &str, method: F)
    where
        F: Fn(&Call) -> Result<Value> + Send + Sync + 'static,
    {
        self.0
            .slots
            .lock()
            .own
            .insert(name.into(), Slot::Method(Arc::new(method)));
    }

    /// Finds the closest method slot named `name`, with the object that holds it.
    fn lookup_method(&self, name: &str) -> Option<(Object, Method)> {
        for object in self.chain() {
            match object.0.slots.lock().own.get(name) {
                Some(Slot::Method(method)) => return Some((object.clone(), Arc::clone(method))),
                Some(Slot::Value(_)) => return None,
                None => (),
            }
        }
        None
    }

    /// Returns true if a method slot named `name` is reachable.
    pub fn responds_to(&self, name: &str) -> bool {
        self.lookup_method(name).is_some()
    }

    /// Calls a method with this object as the receiver.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let (owner, method) = self
            .lookup_method(name)
            .ok_or_else(|| Error::NoSuchMethod(name.into()))?;
        method(&Call {
            receiver: self,
            owner: &owner,
            name,
            args,
        })
    }

    /// Applies copied and cloned property declarations to a fresh clone.
    fn isolate(&self) {
        let (copy_properties, clone_properties) = {
            let slots = self.0.slots.lock();
            (slots.copy_properties.clone(), slots.clone_properties.clone())
        };
        for name in &copy_properties {
            if let Some(value) = self.get(name) {
                self.set(name, value.shallow_copy());
            }
        }
        for name in &clone_properties {
            if let Some(Value::Object(source)) = self.get(name) {
                self.set(name, source.clone_proto());
            }
        }
    }
}

impl Object {
    /// Makes an isolated child of this object without running the post-clone hook.
    fn new_child(&self) -> Object {
        // the declaration lists are copied so additions on one branch stay on that branch
        let (copy_properties, clone_properties) = {
            let slots = self.0.slots.lock();
            (slots.copy_properties.clone(), slots.clone_properties.clone())
        };
        let object = Object(Arc::new(ObjectInner {
            parent: Some(self.clone()),
            slots: Mutex::new(Slots {
                own: HashMap::new(),
                copy_properties,
                clone_properties,
            }),
        }));

        object.isolate();
        object
    }

    fn run_cloned_hook(&self) -> Result<()> {
        if self.responds_to(CLONED_HOOK) {
            self.call(CLONED_HOOK, &[])?;
        }
        Ok(())
    }
}

impl Prototype for Object {
    fn clone_proto(&self) -> Object {
        let object = self.new_child();
        if let Err(err) = object.run_cloned_hook() {
            tracing::error!(error = %err, "post-clone hook failed");
        }
        object
    }
}
