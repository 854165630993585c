//! Typed params/results and their type-erased handle
//!
//! Envelopes are not generic over a method's params and results types, so
//! filters written once can observe every method. The typed values are kept
//! behind [`Payload`], which can be encoded, validated and downcast back to
//! the concrete type by the generated code that created it.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::validation::{Validate, ValidationContext};

/// Bound for every generated params and results type.
///
/// `()` stands for "no params" or "no results"; such methods send an empty
/// body and omit the `results` member.
pub trait Model: Validate + Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const IS_EMPTY: bool = false;
}

impl Model for () {
    const IS_EMPTY: bool = true;
}

trait ErasedModel: Send + Sync {
    fn to_value(&self) -> serde_json::Result<Value>;
    fn validate(&self, vc: &mut ValidationContext) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn type_name(&self) -> &'static str;
}

impl<T: Model> ErasedModel for T {
    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn validate(&self, vc: &mut ValidationContext) -> bool {
        Validate::validate(self, vc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Opaque handle to a typed params or results value.
pub struct Payload(Box<dyn ErasedModel>);

impl Payload {
    pub fn new<T: Model>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Decodes `raw` as a `T`.
    pub fn decode<T: Model>(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<T>(raw).map(Self::new)
    }

    pub fn from_value<T: Model>(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value::<T>(value).map(Self::new)
    }

    pub fn get<T: Model>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut::<T>()
    }

    /// Unwraps the handle, or returns `None` if it holds another type.
    pub fn take<T: Model>(self) -> Option<T> {
        self.0.into_any().downcast::<T>().ok().map(|value| *value)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        self.0.to_value()
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        self.to_value().and_then(|value| serde_json::to_vec(&value))
    }

    pub fn validate(&self, vc: &mut ValidationContext) -> bool {
        self.0.validate(vc)
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name()).finish()
    }
}
