//! Flattening a fragment tree into one parameterized statement.

use std::fmt::Write;

use compact_str::{CompactString, format_compact};
use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::decode::{Record, RowDecoder};
use crate::descriptor::ErasedDescriptor;
use crate::error::{Error, Result};
use crate::fragment::{Fragment, Item};
use crate::param::Param;
use crate::raw::RawRow;

/// Generated column alias → descriptor, in alias order.
#[derive(Debug, Clone, Default)]
pub struct ResultDescriptors {
    entries: SmallVec<[(CompactString, ErasedDescriptor); 8]>,
}

impl ResultDescriptors {
    pub fn get(&self, alias: &str) -> Option<&ErasedDescriptor> {
        self.entries
            .iter()
            .find_map(|(a, descriptor)| (a == alias).then_some(descriptor))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErasedDescriptor)> {
        self.entries
            .iter()
            .map(|(alias, descriptor)| (alias.as_str(), descriptor))
    }
}

/// The flattened form of a fragment tree.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub sql: String,
    pub query_params: Vec<Param>,
    pub result_descriptors: ResultDescriptors,
}

impl ParsedQuery {
    pub fn decoder(&self) -> RowDecoder<'_> {
        RowDecoder::new(&self.result_descriptors)
    }

    /// Decodes every row, failing on the first bad column.
    pub fn decode_rows(&self, rows: &[RawRow]) -> Result<Vec<Record>> {
        let decoder = self.decoder();
        rows.iter().map(|row| decoder.decode(row)).collect()
    }
}

#[derive(Default)]
struct Flattener {
    sql: String,
    params: Vec<Param>,
    descriptors: ResultDescriptors,
    property_names: HashSet<CompactString>,
}

impl Flattener {
    fn add_fragment<S>(&mut self, fragment: &Fragment<S>) -> Result<()> {
        let segments = fragment.segments();
        for (segment, item) in segments.iter().zip(fragment.items()) {
            self.sql.push_str(segment);
            match item {
                Item::Value(descriptor) => self.add_value(descriptor)?,
                Item::Fragment(nested) => self.add_fragment(nested.as_ref())?,
                Item::Param(param) => self.add_param(param),
            }
        }
        if let Some(last) = segments.last() {
            self.sql.push_str(last);
        }
        Ok(())
    }

    fn add_value(&mut self, descriptor: &ErasedDescriptor) -> Result<()> {
        let property = descriptor.property_key();
        if !self.property_names.insert(property.clone()) {
            return Err(Error::DuplicateProperty(property.clone()));
        }
        let alias = format_compact!("result_{}", self.descriptors.len());
        self.sql.push_str("AS ");
        self.sql.push_str(&alias);
        self.descriptors.entries.push((alias, descriptor.clone()));
        Ok(())
    }

    fn add_param(&mut self, param: &Param) {
        self.params.push(param.clone());
        let _ = write!(self.sql, "${}", self.params.len());
    }
}

/// Walks `root` depth-first and produces the statement text, the bound
/// parameters and the alias map.
///
/// Placeholders are numbered `$1..` and aliases `result_0..` in traversal
/// order across the whole tree. Two result values with the same property
/// name anywhere in the tree fail with [`Error::DuplicateProperty`].
pub fn flatten<S>(root: &Fragment<S>) -> Result<ParsedQuery> {
    let mut state = Flattener::default();
    state.add_fragment(root)?;
    Ok(ParsedQuery {
        sql: state.sql,
        query_params: state.params,
        result_descriptors: state.descriptors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;
    use crate::tagging::{as_boolean, as_safe_integer, as_string};

    #[test]
    fn numbers_params_across_nesting() {
        let inner = sql!(" AND b = ", 2, " AND c = ", 3, "");
        let outer = sql!("WHERE a = ", 1, "", inner, " AND d = ", 4, "");
        let parsed = outer.flatten().unwrap();
        assert_eq!(parsed.sql, "WHERE a = $1 AND b = $2 AND c = $3 AND d = $4");
        assert_eq!(
            parsed.query_params,
            vec![Param::Int(1), Param::Int(2), Param::Int(3), Param::Int(4)]
        );
    }

    #[test]
    fn aliases_follow_traversal_order() {
        let inner = sql!(", b ", as_string("b"), "");
        let outer = sql!("SELECT a ", as_safe_integer("a"), "", inner, ", c ", as_boolean("c"), " FROM t");
        let parsed = outer.flatten().unwrap();
        assert_eq!(
            parsed.sql,
            "SELECT a AS result_0, b AS result_1, c AS result_2 FROM t"
        );
        let names: Vec<_> = parsed
            .result_descriptors
            .iter()
            .map(|(alias, d)| (alias.to_owned(), d.property_name().to_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("result_0".to_owned(), "a".to_owned()),
                ("result_1".to_owned(), "b".to_owned()),
                ("result_2".to_owned(), "c".to_owned()),
            ]
        );
    }

    #[test]
    fn duplicate_property_in_nested_fragment() {
        let deep = sql!("x ", as_string("id"), "");
        let middle = sql!("", deep, "");
        let outer = sql!("SELECT id ", as_safe_integer("id"), ", ", middle, "");
        let err = outer.flatten().unwrap_err();
        assert!(matches!(err, Error::DuplicateProperty(ref name) if name == "id"));
    }

    #[test]
    fn flattening_is_repeatable() {
        let fragment = sql!("SELECT v ", as_string("v"), " WHERE k = ", "key", "");
        let first = fragment.flatten().unwrap();
        let second = fragment.flatten().unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.query_params, second.query_params);
    }

    #[test]
    fn reusing_a_fragment_twice_duplicates_its_properties() {
        let column = sql!("a ", as_string("a"), "");
        let outer = Fragment::sql("SELECT ")
            .nest(column.clone())
            .push(", ")
            .nest(column);
        assert!(matches!(outer.flatten(), Err(Error::DuplicateProperty(_))));
    }

    #[test]
    fn raw_text_is_copied_verbatim() {
        let parsed = Fragment::raw("SELECT '$1'").flatten().unwrap();
        assert_eq!(parsed.sql, "SELECT '$1'");
        assert!(parsed.query_params.is_empty());
        assert!(parsed.result_descriptors.is_empty());
    }
}
