// Argument Normalizer
// Reduces positional or named arguments to the ordered value sequence callbacks receive

use crate::db::traits::{NamedValue, Value};
use std::borrow::Cow;

/// Positional values are already canonical and are borrowed as-is
pub fn from_values(args: &[Value]) -> Cow<'_, [Value]> {
    Cow::Borrowed(args)
}

/// Keep only the values of named arguments, in their original order.
///
/// Parameter names are dropped.
pub fn from_named(args: &[NamedValue]) -> Cow<'_, [Value]> {
    Cow::Owned(args.iter().map(|arg| arg.value.clone()).collect())
}
