//! Identifier resolution for arbitrary domain objects.
//!
//! Hosts register, once at configuration time, how to read the identifier
//! of each entity type they want to log. Resolution is then a map lookup by
//! [`TypeId`] followed by a call to the registered accessor.
//!
//! Exactly one identifier field per type is supported. Registering a second
//! field is accepted so that the mismatch is reported where the entity is
//! logged, as [`LogError::MultipleIdentifiers`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{LogError, RegistryError};
use crate::event::{ObjectId, ObjectRef};

type Accessor = Arc<dyn Fn(&dyn Any) -> Option<ObjectId> + Send + Sync>;

struct IdentifierField {
    name: String,
    accessor: Accessor,
}

struct TypeIdentity {
    type_name: &'static str,
    object_type: String,
    fields: Vec<IdentifierField>,
}

/// Registry of identifier accessors keyed by entity type.
#[derive(Default)]
pub struct IdentifierRegistry {
    types: HashMap<TypeId, TypeIdentity>,
}

impl std::fmt::Debug for IdentifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.types.values().map(|t| {
                let fields: Vec<&str> = t.fields.iter().map(|field| field.name.as_str()).collect();
                (t.object_type.as_str(), fields)
            }))
            .finish()
    }
}

impl IdentifierRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `field` as the identifier of `T`, labelled with the full
    /// Rust type name.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if `T` is already registered under a
    /// different label or `field` is already registered for it.
    pub fn register<T, F, I>(&mut self, field: &str, accessor: F) -> Result<&mut Self, RegistryError>
    where
        T: Any,
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: Into<ObjectId>,
    {
        self.register_as::<T, F, I>(type_name::<T>(), field, accessor)
    }

    /// Registers `field` as the identifier of `T` under an explicit object
    /// type label.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EmptyObjectType` for an empty label, and the
    /// same conflicts as [`register`](Self::register).
    pub fn register_as<T, F, I>(
        &mut self,
        object_type: &str,
        field: &str,
        accessor: F,
    ) -> Result<&mut Self, RegistryError>
    where
        T: Any,
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: Into<ObjectId>,
    {
        let type_name = type_name::<T>();
        if object_type.is_empty() {
            return Err(RegistryError::EmptyObjectType { type_name });
        }

        let entry = self
            .types
            .entry(TypeId::of::<T>())
            .or_insert_with(|| TypeIdentity {
                type_name,
                object_type: object_type.to_string(),
                fields: Vec::new(),
            });

        if entry.object_type != object_type {
            return Err(RegistryError::ConflictingObjectType {
                type_name,
                existing: entry.object_type.clone(),
                requested: object_type.to_string(),
            });
        }
        if entry.fields.iter().any(|f| f.name == field) {
            return Err(RegistryError::DuplicateField {
                object_type: object_type.to_string(),
                field: field.to_string(),
            });
        }

        let accessor: Accessor = Arc::new(move |entity: &dyn Any| {
            entity.downcast_ref::<T>().map(|e| accessor(e).into())
        });
        entry.fields.push(IdentifierField {
            name: field.to_string(),
            accessor,
        });

        Ok(self)
    }

    /// Returns the object type label registered for `T`, if any.
    pub fn object_type_of<T: Any>(&self) -> Option<&str> {
        self.types
            .get(&TypeId::of::<T>())
            .map(|t| t.object_type.as_str())
    }

    /// Resolves the `(object_type, object_id)` pair of `entity`.
    ///
    /// # Errors
    ///
    /// - `LogError::IdentifierNotFound` if `T` has no registered accessor.
    /// - `LogError::MultipleIdentifiers` if `T` has more than one.
    pub fn resolve<T: Any>(&self, entity: &T) -> Result<ObjectRef, LogError> {
        let not_found = LogError::IdentifierNotFound {
            type_name: type_name::<T>(),
        };
        let identity = match self.types.get(&TypeId::of::<T>()) {
            Some(identity) => identity,
            None => return Err(not_found),
        };

        let field = match identity.fields.as_slice() {
            [field] => field,
            [] => return Err(not_found),
            many => {
                return Err(LogError::MultipleIdentifiers {
                    object_type: identity.object_type.clone(),
                    fields: many.iter().map(|f| f.name.clone()).collect(),
                })
            }
        };

        let entity: &dyn Any = entity;
        let object_id = (field.accessor)(entity).ok_or(LogError::IdentifierNotFound {
            type_name: identity.type_name,
        })?;

        Ok(ObjectRef {
            object_type: identity.object_type.clone(),
            object_id,
        })
    }
}
