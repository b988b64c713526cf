//! Type-level result shapes.
//!
//! Every fragment carries the list of field types its result values decode
//! to. Building a fragment extends that list in the same left-to-right,
//! depth-first order the flattener assigns `result_N` aliases, so field `i`
//! of a shape is always the descriptor aliased `result_i`.

use core::marker::PhantomData;

use compact_str::CompactString;

use crate::decode::Record;
use crate::error::{Error, Result};
use crate::value::{ResultValue, Value};

/// A fragment with no result values. Decodes to `()`.
pub struct Nil;

/// `Head` is the type of the next `result_N` field; `Tail` lists the fields
/// after it.
pub struct Cons<Head, Tail>(PhantomData<(Head, Tail)>);

/// A list whose remaining fields are only known at runtime.
///
/// Fragments built with [`Fragment::new`](crate::Fragment::new) have this
/// shape. Anything appended after it stays dynamic, and a list that ends in
/// `Dynamic` has no [`Shape`].
pub struct Dynamic;

/// Implemented by every result field list a [`Fragment`](crate::Fragment)
/// can carry.
pub trait TypeSet {}

impl TypeSet for Nil {}
impl TypeSet for Dynamic {}
impl<Head, Tail: TypeSet> TypeSet for Cons<Head, Tail> {}

/// The fields of a fragment followed by the fields of the one nested or
/// appended after it.
pub trait Concat<Fields> {
    type Output: TypeSet;
}

impl<Fields: TypeSet> Concat<Fields> for Nil {
    type Output = Fields;
}

impl<Fields: TypeSet> Concat<Fields> for Dynamic {
    type Output = Dynamic;
}

impl<Head, Tail, Fields> Concat<Fields> for Cons<Head, Tail>
where
    Tail: Concat<Fields> + TypeSet,
    Fields: TypeSet,
{
    type Output = Cons<Head, <Tail as Concat<Fields>>::Output>;
}

/// Expands to the type-level list of the given field types.
///
/// ```
/// # use sqlfrag_core::{shape_list, shape::{Cons, Nil}};
/// type Pair = shape_list!(i64, String);
/// let _: fn(Pair) -> Cons<i64, Cons<String, Nil>> = |pair| pair;
/// ```
#[macro_export]
macro_rules! shape_list {
    () => { $crate::shape::Nil };
    ($head:ty $(, $tail:ty)* $(,)?) => {
        $crate::shape::Cons<$head, $crate::shape_list!($($tail),*)>
    };
}

/// A fully known result shape and the tuple its rows decode into.
#[diagnostic::on_unimplemented(
    message = "result shape `{Self}` is not statically known",
    label = "fragments built with `Fragment::new` or nesting such fragments have a dynamic shape",
    note = "use the `*_record` query methods, or build the fragment with `sql!`/the builder methods"
)]
pub trait Shape: TypeSet {
    /// The decoded row, one tuple element per field.
    type Row: Send + 'static;

    /// Number of fields.
    const WIDTH: usize;

    fn decode(record: Record) -> Result<Self::Row>;
}

impl Shape for Nil {
    type Row = ();

    const WIDTH: usize = 0;

    fn decode(record: Record) -> Result<Self::Row> {
        check_width(&record, Self::WIDTH)
    }
}

fn check_width(record: &Record, width: usize) -> Result<()> {
    if record.len() == width {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!(
            "{} fields decoded for a shape of {width}",
            record.len()
        )))
    }
}

fn take_field<T: ResultValue>(
    fields: &mut impl Iterator<Item = (CompactString, Value)>,
) -> Result<T> {
    let (property, value) = fields
        .next()
        .ok_or_else(|| Error::ShapeMismatch("record ended before the shape".into()))?;
    T::from_value(value).map_err(|source| Error::Decode { property, source })
}

macro_rules! impl_shape {
    ($($T:ident),+) => {
        impl<$($T: ResultValue),+> Shape for shape_list!($($T),+) {
            type Row = ($($T,)+);

            const WIDTH: usize = 0 $(+ { let _ = stringify!($T); 1 })+;

            fn decode(record: Record) -> Result<Self::Row> {
                check_width(&record, Self::WIDTH)?;
                let mut fields = record.into_iter();
                Ok(($(take_field::<$T>(&mut fields)?,)+))
            }
        }
    };
}

macro_rules! seq_types {
    (@acc $callback:ident [$($acc:ident),*]) => {};
    (@acc $callback:ident [$($acc:ident),*] $next:ident $($rest:ident)*) => {
        $callback!($($acc,)* $next);
        seq_types!(@acc $callback [$($acc,)* $next] $($rest)*);
    };
}

seq_types!(@acc impl_shape [] T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10 T11 T12 T13 T14 T15);
