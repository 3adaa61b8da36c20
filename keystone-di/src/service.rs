//! Type identities and type-erased component values

use downcast_rs::{impl_downcast, DowncastSync};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Trait that every constructed object implements
pub trait Service: DowncastSync {
    /// Get the type name of the service
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl_downcast!(sync Service);

/// Blanket implementation for all suitable types
impl<T: Any + Send + Sync> Service for T {}

/// Identity of a contract or implementation type
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Identity of `T`, which may be unsized (`dyn Trait`)
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, `dyn ` prefix or generic arguments
    pub fn short_name(&self) -> &'static str {
        let base = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let head = base.split('<').next().unwrap_or(base);
        head.rsplit("::").next().unwrap_or(head)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({})", self.name)
    }
}

/// A resolved value: an `Arc<C>` for some contract `C`, tagged with the
/// runtime type of the object behind it.
#[derive(Clone)]
pub struct Component {
    value: Arc<dyn Service>,
    contract: TypeInfo,
    concrete: TypeInfo,
}

impl Component {
    /// Wrap a value presented as contract `C` whose runtime type is `concrete`
    pub fn new<C>(value: Arc<C>, concrete: TypeInfo) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            contract: TypeInfo::of::<C>(),
            concrete,
        }
    }

    /// Wrap a concrete value presented as its own type. Trait-object values
    /// go through [`Component::new`] so their runtime type is recorded.
    pub fn from_value<C>(value: Arc<C>) -> Self
    where
        C: Send + Sync + 'static,
    {
        Self::new(value, TypeInfo::of::<C>())
    }

    /// Contract this component is presented as
    pub fn contract(&self) -> TypeInfo {
        self.contract
    }

    /// Runtime type of the underlying object
    pub fn concrete(&self) -> TypeInfo {
        self.concrete
    }

    /// Recover the typed handle, if `C` is the component's contract
    pub fn downcast<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.value.downcast_ref::<Arc<C>>().cloned()
    }

    /// Like [`Component::downcast`] but reports a mismatch as an error
    pub fn typed<C>(&self) -> DiResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.downcast::<C>().ok_or_else(|| DiError::TypeMismatch {
            expected: std::any::type_name::<C>().to_string(),
            found: self.contract.name().to_string(),
        })
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("contract", &self.contract.name())
            .field("concrete", &self.concrete.name())
            .finish()
    }
}
