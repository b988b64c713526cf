//! Query fragments: literal SQL segments interleaved with items.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, Utc};
use smallvec::SmallVec;

use crate::descriptor::{ErasedDescriptor, ValueDescriptor};
use crate::error::{Error, Result};
use crate::flatten::{ParsedQuery, flatten};
use crate::param::Param;
use crate::shape::{Concat, Cons, Dynamic, Nil, TypeSet};
use crate::value::ResultValue;

/// An item embedded between two segments.
#[derive(Debug, Clone)]
pub enum Item {
    /// A value bound to a `$n` placeholder.
    Param(Param),
    /// A result value declaration, rendered as `AS result_N`.
    Value(ErasedDescriptor),
    /// A nested fragment, flattened in place.
    Fragment(Box<Fragment>),
}

impl Item {
    pub fn param(value: impl Into<Param>) -> Self {
        Item::Param(value.into())
    }

    pub fn value<T: ResultValue>(descriptor: ValueDescriptor<T>) -> Self {
        Item::Value(descriptor.erase())
    }

    pub fn fragment<S>(fragment: Fragment<S>) -> Self {
        Item::Fragment(Box::new(fragment.into_dynamic()))
    }
}

/// Something that can be embedded in a fragment, together with the fields
/// it adds to the fragment's result shape.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be embedded in a query fragment",
    label = "expected a bound value, a value descriptor or a fragment",
    note = "bind other values with `.bind(Param::from(...))`"
)]
pub trait IntoItem {
    type Shape: TypeSet;

    fn into_item(self) -> Item;
}

impl<T: ResultValue> IntoItem for ValueDescriptor<T> {
    type Shape = Cons<T, Nil>;

    fn into_item(self) -> Item {
        Item::value(self)
    }
}

impl<S: TypeSet> IntoItem for Fragment<S> {
    type Shape = S;

    fn into_item(self) -> Item {
        Item::fragment(self)
    }
}

impl<S: TypeSet> IntoItem for &Fragment<S> {
    type Shape = S;

    fn into_item(self) -> Item {
        Item::fragment(self.clone())
    }
}

impl<T: Into<Param>> IntoItem for Option<T> {
    type Shape = Nil;

    fn into_item(self) -> Item {
        Item::param(self)
    }
}

macro_rules! impl_into_item_param {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoItem for $ty {
                type Shape = Nil;

                #[inline]
                fn into_item(self) -> Item {
                    Item::Param(self.into())
                }
            }
        )+
    };
}

impl_into_item_param!(
    Param,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    String,
    &str,
    &String,
    DateTime<Utc>,
    NaiveDate,
    serde_json::Value,
    Vec<String>,
    Vec<&str>,
    Vec<Option<String>>,
    Vec<i64>,
    Vec<i32>,
    Vec<Option<i64>>,
);

/// An immutable piece of SQL: `segments.len() == items.len() + 1`.
///
/// `S` is the statically known result shape (see [`crate::shape`]).
/// Fragments are plain data and can be cloned, shared and flattened any
/// number of times.
///
/// ```
/// use sqlfrag_core::{Fragment, as_safe_integer, as_string};
///
/// let query = Fragment::sql("SELECT id ")
///     .value(as_safe_integer("id"))
///     .push(", name ")
///     .value(as_string("name"))
///     .push(" FROM t WHERE x = ")
///     .bind(5);
///
/// let parsed = query.flatten().unwrap();
/// assert_eq!(parsed.sql, "SELECT id AS result_0, name AS result_1 FROM t WHERE x = $1");
/// ```
pub struct Fragment<S = Dynamic> {
    segments: SmallVec<[Cow<'static, str>; 4]>,
    items: SmallVec<[Item; 4]>,
    shape: PhantomData<fn() -> S>,
}

impl Fragment {
    /// Builds a fragment from explicit segments and items.
    ///
    /// Fails with [`Error::InvalidArguments`] unless there is exactly one
    /// more segment than items. The shape of the result is [`Dynamic`].
    pub fn new<I, T>(segments: I, items: impl IntoIterator<Item = Item>) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Cow<'static, str>>,
    {
        let segments: SmallVec<[Cow<'static, str>; 4]> =
            segments.into_iter().map(Into::into).collect();
        let items: SmallVec<[Item; 4]> = items.into_iter().collect();
        if segments.len() != items.len() + 1 {
            return Err(Error::InvalidArguments {
                segments: segments.len(),
                items: items.len(),
            });
        }
        Ok(Self {
            segments,
            items,
            shape: PhantomData,
        })
    }

    /// Starts a fragment from literal SQL text.
    pub fn sql(text: &'static str) -> Fragment<Nil> {
        Fragment::from_text(Cow::Borrowed(text))
    }

    /// Wraps runtime text as SQL without any escaping.
    ///
    /// The caller is responsible for trusting `text`; this is the only way
    /// to splice runtime strings into the statement text.
    pub fn raw(text: impl Into<String>) -> Fragment<Nil> {
        Fragment::from_text(Cow::Owned(text.into()))
    }
}

impl<S> Fragment<S> {
    fn from_text(text: Cow<'static, str>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(text);
        Self {
            segments,
            items: SmallVec::new(),
            shape: PhantomData,
        }
    }

    #[inline]
    pub fn segments(&self) -> &[Cow<'static, str>] {
        &self.segments
    }

    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Forgets the static shape.
    pub fn into_dynamic(self) -> Fragment {
        self.retype()
    }

    /// Flattens the fragment tree into one statement.
    pub fn flatten(&self) -> Result<ParsedQuery> {
        flatten(self)
    }

    fn retype<S2>(self) -> Fragment<S2> {
        Fragment {
            segments: self.segments,
            items: self.items,
            shape: PhantomData,
        }
    }

    fn append(mut self, item: Item) -> Self {
        self.items.push(item);
        self.segments.push(Cow::Borrowed(""));
        self
    }
}

impl<S: TypeSet> Fragment<S> {
    /// Appends literal text to the trailing segment.
    pub fn push(mut self, text: &'static str) -> Self {
        if let Some(last) = self.segments.last_mut() {
            if last.is_empty() {
                *last = Cow::Borrowed(text);
            } else {
                last.to_mut().push_str(text);
            }
        }
        self
    }

    /// Appends a bound value.
    pub fn bind(self, value: impl Into<Param>) -> Self {
        self.append(Item::param(value))
    }

    /// Appends a result value, adding its type to the shape.
    pub fn value<T>(self, descriptor: ValueDescriptor<T>) -> Fragment<<S as Concat<Cons<T, Nil>>>::Output>
    where
        T: ResultValue,
        S: Concat<Cons<T, Nil>>,
    {
        self.append(Item::value(descriptor)).retype()
    }

    /// Embeds another fragment, adding its fields to the shape.
    pub fn nest<S2>(self, fragment: Fragment<S2>) -> Fragment<<S as Concat<S2>>::Output>
    where
        S2: TypeSet,
        S: Concat<S2>,
    {
        self.append(Item::fragment(fragment)).retype()
    }

    /// Appends any embeddable item. This is what [`sql!`](crate::sql) expands to.
    pub fn item<I>(self, item: I) -> Fragment<<S as Concat<I::Shape>>::Output>
    where
        I: IntoItem,
        S: Concat<I::Shape>,
    {
        self.append(item.into_item()).retype()
    }

    /// Number of result values declared in this fragment tree.
    pub fn result_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                Item::Value(_) => 1,
                Item::Fragment(nested) => nested.result_count(),
                Item::Param(_) => 0,
            })
            .sum()
    }
}

impl<S> Clone for Fragment<S> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            items: self.items.clone(),
            shape: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Fragment<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("segments", &self.segments)
            .field("items", &self.items)
            .finish()
    }
}

/// Builds a [`Fragment`] from literal segments alternating with items.
///
/// The first and last arguments are SQL text; every item is followed by the
/// segment after it, so the segment/item invariant holds by construction.
///
/// ```
/// use sqlfrag_core::{as_safe_integer, as_string, sql};
///
/// let query = sql!("SELECT id ", as_safe_integer("id"), ", name ", as_string("name"), " FROM t WHERE x = ", 5, "");
/// assert_eq!(query.flatten().unwrap().query_params.len(), 1);
/// ```
#[macro_export]
macro_rules! sql {
    ($head:expr $(, $item:expr, $segment:expr)*) => {
        $crate::Fragment::sql($head) $( .item($item).push($segment) )*
    };
}
