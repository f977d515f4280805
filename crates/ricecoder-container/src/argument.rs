//! Resolved constructor arguments
//!
//! By the time a component constructor runs, every `@service` reference in
//! its definition has been replaced by the built service and every `%param%`
//! reference by the parameter value. [`Arguments`] is that resolved list,
//! with positional accessors that report the offending index on failure.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::container::Service;
use crate::{DIError, DIResult};

/// One resolved constructor argument
#[derive(Clone)]
pub enum Argument {
    /// A literal or parameter value
    Value(Value),
    /// A service resolved from an `@id` reference
    Service(Service),
}

impl Argument {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Argument::Value(value) => Some(value),
            Argument::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            Argument::Service(service) => Some(service),
            Argument::Value(_) => None,
        }
    }

    /// True for JSON `null`, which is also what unset parameters resolve to
    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Value(Value::Null))
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Service(_) => f.write_str("Service(..)"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Service> for Argument {
    fn from(service: Service) -> Self {
        Argument::Service(service)
    }
}

/// Positional list of resolved arguments handed to a component constructor
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    pub fn new(items: Vec<Argument>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    fn argument(&self, index: usize) -> DIResult<&Argument> {
        self.items.get(index).ok_or(DIError::MissingArgument {
            index,
            len: self.items.len(),
        })
    }

    /// Literal value at `index`
    pub fn value(&self, index: usize) -> DIResult<&Value> {
        self.argument(index)?
            .as_value()
            .ok_or(DIError::InvalidArgument {
                index,
                expected: "value",
            })
    }

    pub fn str(&self, index: usize) -> DIResult<&str> {
        self.value(index)?.as_str().ok_or(DIError::InvalidArgument {
            index,
            expected: "string",
        })
    }

    pub fn string(&self, index: usize) -> DIResult<String> {
        self.str(index).map(str::to_string)
    }

    /// String at `index`, or `None` when the argument is missing or null
    pub fn optional_string(&self, index: usize) -> DIResult<Option<String>> {
        match self.items.get(index) {
            None => Ok(None),
            Some(argument) if argument.is_null() => Ok(None),
            Some(_) => self.string(index).map(Some),
        }
    }

    pub fn i64(&self, index: usize) -> DIResult<i64> {
        self.value(index)?.as_i64().ok_or(DIError::InvalidArgument {
            index,
            expected: "integer",
        })
    }

    pub fn u64(&self, index: usize) -> DIResult<u64> {
        self.value(index)?.as_u64().ok_or(DIError::InvalidArgument {
            index,
            expected: "unsigned integer",
        })
    }

    pub fn f64(&self, index: usize) -> DIResult<f64> {
        self.value(index)?.as_f64().ok_or(DIError::InvalidArgument {
            index,
            expected: "number",
        })
    }

    pub fn bool(&self, index: usize) -> DIResult<bool> {
        self.value(index)?.as_bool().ok_or(DIError::InvalidArgument {
            index,
            expected: "boolean",
        })
    }

    /// Service at `index`, downcast to its concrete type
    pub fn service<T>(&self, index: usize) -> DIResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let service = self
            .argument(index)?
            .as_service()
            .ok_or(DIError::InvalidArgument {
                index,
                expected: "service",
            })?;

        service
            .clone()
            .downcast::<T>()
            .map_err(|_| DIError::InvalidArgument {
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Service at `index`, or `None` when the argument is missing or null
    pub fn optional_service<T>(&self, index: usize) -> DIResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        match self.items.get(index) {
            None => Ok(None),
            Some(argument) if argument.is_null() => Ok(None),
            Some(_) => self.service(index).map(Some),
        }
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(items: Vec<Argument>) -> Self {
        Self::new(items)
    }
}

impl IntoIterator for Arguments {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
