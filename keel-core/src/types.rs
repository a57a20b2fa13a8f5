//! Service identities: plain types, generic definitions and their instantiations.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::instance::Instance;

/// Turns the resolved elements of a sequence into the sequence value itself.
pub(crate) type Collect = fn(Vec<Instance>) -> Option<Instance>;

enum SequenceDefinition {}

/// Open generic definition such as `Logger<_>`, identified by a marker type.
#[derive(Clone, Copy)]
pub struct GenericDefinition {
    id: TypeId,
    name: &'static str,
    arity: usize,
}

impl GenericDefinition {
    /// Definition identified by marker type `M`. Two definitions are equal iff their markers are.
    pub fn of<M: ?Sized + 'static>(name: &'static str, arity: usize) -> Self {
        Self {
            id: TypeId::of::<M>(),
            name,
            arity,
        }
    }

    /// The built-in "sequence of T" definition.
    pub fn sequence() -> Self {
        Self::of::<SequenceDefinition>("Sequence", 1)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_sequence(&self) -> bool {
        self.id == TypeId::of::<SequenceDefinition>()
    }
}

impl PartialEq for GenericDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenericDefinition {}

impl Hash for GenericDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, ",".repeat(self.arity.saturating_sub(1)))
    }
}

#[derive(Clone)]
enum Shape {
    Plain,
    Definition(GenericDefinition),
    Closed {
        definition: GenericDefinition,
        arguments: Arc<[ServiceType]>,
        collect: Option<Collect>,
    },
}

/// Identity of a service as the registration model sees it.
///
/// Equality and hashing only look at the underlying `TypeId`; the generic shape is
/// metadata used by the open-generic and sequence fallbacks.
#[derive(Clone)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
    shape: Shape,
}

impl ServiceType {
    /// Plain service type, e.g. `ServiceType::of::<dyn Greeter>()`.
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
            shape: Shape::Plain,
        }
    }

    /// Unbound generic definition. Never resolvable by itself.
    pub fn definition(definition: GenericDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            shape: Shape::Definition(definition),
        }
    }

    /// Bound instantiation `S` of `definition` with the given type arguments.
    pub fn closed<S: ?Sized + 'static>(
        definition: GenericDefinition,
        arguments: Vec<ServiceType>,
    ) -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
            shape: Shape::Closed {
                definition,
                arguments: arguments.into(),
                collect: None,
            },
        }
    }

    /// Sequence of every registered `S`. Resolves to a `Vec<Arc<S>>`.
    pub fn sequence_of<S: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<(SequenceDefinition, PhantomData<S>)>(),
            name: type_name::<Vec<Arc<S>>>(),
            shape: Shape::Closed {
                definition: GenericDefinition::sequence(),
                arguments: vec![ServiceType::of::<S>()].into(),
                collect: Some(collect_sequence::<S>),
            },
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_generic_definition(&self) -> bool {
        matches!(self.shape, Shape::Definition(_))
    }

    /// Definition this type instantiates, if it is a bound generic.
    pub fn generic_definition(&self) -> Option<GenericDefinition> {
        match &self.shape {
            Shape::Closed { definition, .. } => Some(*definition),
            _ => None,
        }
    }

    pub fn generic_arguments(&self) -> &[ServiceType] {
        match &self.shape {
            Shape::Closed { arguments, .. } => arguments,
            _ => &[],
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.generic_definition()
            .is_some_and(|definition| definition.is_sequence())
    }

    /// Element type of a sequence.
    pub fn sequence_element(&self) -> Option<&ServiceType> {
        if self.is_sequence() {
            self.generic_arguments().first()
        } else {
            None
        }
    }

    pub(crate) fn collector(&self) -> Option<Collect> {
        match &self.shape {
            Shape::Closed { collect, .. } => *collect,
            _ => None,
        }
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Shape::Definition(definition) => write!(f, "{definition:?}"),
            _ => f.write_str(self.name),
        }
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceType({self})")
    }
}

fn collect_sequence<S: ?Sized + Send + Sync + 'static>(items: Vec<Instance>) -> Option<Instance> {
    let mut elements: Vec<Arc<S>> = Vec::with_capacity(items.len());
    for item in items {
        elements.push(item.downcast::<S>()?);
    }
    Some(Instance::from_value(elements))
}
