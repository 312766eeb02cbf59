//! Response models bound as `model` in post-call scripts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type DecodeFn = dyn Fn(&[u8]) -> Result<BoundModel, serde_json::Error> + Send + Sync;

/// Describes the type a JSON response body is decoded into.
///
/// ```
/// use api_suite::hooks::ModelDescriptor;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// let descriptor = ModelDescriptor::named::<User>("User");
/// let model = descriptor.decode(br#"{"id": 1, "name": "ada"}"#).unwrap();
///
/// assert_eq!(model.downcast_ref::<User>().unwrap().name, "ada");
/// assert_eq!(model.json()["id"], 1);
/// ```
#[derive(Clone)]
pub struct ModelDescriptor {
    type_name: String,
    decode: Arc<DecodeFn>,
}

impl ModelDescriptor {
    /// Descriptor for `T`, named after its Rust type.
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        Self::named::<T>(std::any::type_name::<T>())
    }

    /// Descriptor for `T` with a custom display name.
    pub fn named<T>(type_name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let bound_name = type_name.clone();

        Self {
            type_name,
            decode: Arc::new(move |bytes: &[u8]| -> Result<BoundModel, serde_json::Error> {
                let value: T = serde_json::from_slice(bytes)?;
                let json = serde_json::to_value(&value)?;
                Ok(BoundModel {
                    type_name: bound_name.clone(),
                    value: Box::new(value),
                    json,
                })
            }),
        }
    }

    /// Descriptor that accepts any JSON document.
    pub fn json(type_name: impl Into<String>) -> Self {
        Self::named::<serde_json::Value>(type_name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Decodes a response body.
    pub fn decode(&self, bytes: &[u8]) -> Result<BoundModel, serde_json::Error> {
        (self.decode)(bytes)
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A decoded response model.
///
/// Holds the typed value and its JSON form, which directives navigate.
pub struct BoundModel {
    type_name: String,
    value: Box<dyn Any + Send + Sync>,
    json: serde_json::Value,
}

impl BoundModel {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The typed value, if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn json(&self) -> &serde_json::Value {
        &self.json
    }
}

impl fmt::Debug for BoundModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundModel")
            .field("type_name", &self.type_name)
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}
