//! Result value descriptors: "decode column X as type T into property P".

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use crate::error::DecodeError;
use crate::raw::RawValue;
use crate::value::{ResultValue, Value};

/// A shared conversion function from a raw column value.
pub type Converter<T> = Arc<dyn Fn(&RawValue) -> Result<T, DecodeError> + Send + Sync>;

/// Wraps a closure as a [`Converter`], fixing its signature.
#[inline]
pub(crate) fn converter<T, F>(f: F) -> Converter<T>
where
    F: Fn(&RawValue) -> Result<T, DecodeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Declares that a result column decodes to `T` under a property name.
///
/// Descriptors can only be created through the tagging functions
/// ([`as_string`](crate::as_string), [`TaggingFunctions`](crate::TaggingFunctions), ...),
/// so nothing else can be mistaken for one while a fragment is flattened.
pub struct ValueDescriptor<T> {
    property_name: CompactString,
    converter: Converter<T>,
    accept_null: bool,
}

impl<T> ValueDescriptor<T> {
    pub(crate) fn new(
        property_name: impl Into<CompactString>,
        converter: Converter<T>,
        accept_null: bool,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            converter,
            accept_null,
        }
    }

    #[inline]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Whether a SQL NULL bypasses the converter and decodes to absent.
    #[inline]
    pub const fn accepts_null(&self) -> bool {
        self.accept_null
    }

    /// Applies the converter to a raw value.
    #[inline]
    pub fn convert(&self, raw: &RawValue) -> Result<T, DecodeError> {
        (self.converter)(raw)
    }
}

impl<T: ResultValue> ValueDescriptor<T> {
    pub(crate) fn erase(self) -> ErasedDescriptor {
        let convert = self.converter;
        ErasedDescriptor {
            property_name: self.property_name,
            converter: converter(move |raw| convert(raw).map(ResultValue::into_value)),
            accept_null: self.accept_null,
        }
    }
}

impl<T> Clone for ValueDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            property_name: self.property_name.clone(),
            converter: Arc::clone(&self.converter),
            accept_null: self.accept_null,
        }
    }
}

impl<T> fmt::Debug for ValueDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueDescriptor")
            .field("property_name", &self.property_name)
            .field("accept_null", &self.accept_null)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// A descriptor embedded in a fragment, decoding to a dynamic [`Value`].
#[derive(Clone)]
pub struct ErasedDescriptor {
    property_name: CompactString,
    converter: Converter<Value>,
    accept_null: bool,
}

impl ErasedDescriptor {
    #[inline]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    #[inline]
    pub(crate) fn property_key(&self) -> &CompactString {
        &self.property_name
    }

    #[inline]
    pub const fn accepts_null(&self) -> bool {
        self.accept_null
    }

    #[inline]
    pub fn convert(&self, raw: &RawValue) -> Result<Value, DecodeError> {
        (self.converter)(raw)
    }
}

impl fmt::Debug for ErasedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedDescriptor")
            .field("property_name", &self.property_name)
            .field("accept_null", &self.accept_null)
            .finish()
    }
}
