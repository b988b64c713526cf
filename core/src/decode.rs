//! Row decoding: raw aliased columns to records keyed by property name.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::flatten::ResultDescriptors;
use crate::raw::RawRow;
use crate::value::{ResultValue, Value};

/// One decoded row, fields in alias order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: SmallVec<[(CompactString, Value); 8]>,
}

impl Record {
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(name, value)| (name == property).then_some(value))
    }

    /// Returns the field converted back to its static type.
    pub fn get_as<T: ResultValue>(&self, property: &str) -> Result<T> {
        let value = self
            .get(property)
            .cloned()
            .ok_or_else(|| Error::MissingColumn(property.into()))?;
        T::from_value(value).map_err(|source| Error::Decode {
            property: property.into(),
            source,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn push(&mut self, property: CompactString, value: Value) {
        self.fields.push((property, value));
    }
}

impl IntoIterator for Record {
    type Item = (CompactString, Value);
    type IntoIter = smallvec::IntoIter<[(CompactString, Value); 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<CompactString>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

/// Applies a query's descriptors to raw rows.
///
/// Cheap to build; reuse one decoder for every row of a result set.
#[derive(Debug, Clone, Copy)]
pub struct RowDecoder<'q> {
    descriptors: &'q ResultDescriptors,
}

impl<'q> RowDecoder<'q> {
    pub const fn new(descriptors: &'q ResultDescriptors) -> Self {
        Self { descriptors }
    }

    pub fn decode(&self, row: &RawRow) -> Result<Record> {
        let mut record = Record::default();
        for (alias, descriptor) in self.descriptors.iter() {
            let raw = row
                .get(alias)
                .ok_or_else(|| Error::MissingColumn(alias.into()))?;
            let value = if raw.is_null() && descriptor.accepts_null() {
                Value::Absent
            } else {
                descriptor.convert(raw).map_err(|source| Error::Decode {
                    property: descriptor.property_key().clone(),
                    source,
                })?
            };
            record.push(descriptor.property_key().clone(), value);
        }
        Ok(record)
    }
}

/// Builds a decoder for `descriptors`.
#[inline]
pub const fn make_decoder(descriptors: &ResultDescriptors) -> RowDecoder<'_> {
    RowDecoder::new(descriptors)
}
