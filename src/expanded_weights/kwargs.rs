//! Keyword arguments and their flat encoding
//!
//! A custom function only receives a flat argument list, so keyword
//! arguments travel as their values appended after the positional arguments,
//! plus the list of their names.

use super::ExpandedArg;
use crate::error::{Error, Result};

/// Ordered keyword arguments
#[derive(Clone, Debug, Default)]
pub struct Kwargs {
    entries: Vec<(&'static str, ExpandedArg)>,
}

impl Kwargs {
    /// Empty keyword arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::insert`]
    pub fn with(mut self, name: &'static str, value: impl Into<ExpandedArg>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name`, replacing an existing value in place
    pub fn insert(&mut self, name: &'static str, value: impl Into<ExpandedArg>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a keyword argument
    pub fn get(&self, name: &str) -> Option<&ExpandedArg> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &ExpandedArg> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Number of keyword arguments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into `(names, values)`, the inverse of [`standard_kwargs`]
    pub fn flatten(self) -> (Vec<&'static str>, Vec<ExpandedArg>) {
        self.entries.into_iter().unzip()
    }
}

/// Rebuild `(args, kwargs)` from a flat argument list
///
/// The last `kwarg_names.len()` values of `flat_args` are the keyword
/// arguments, in the order of `kwarg_names`.
pub fn standard_kwargs(
    kwarg_names: &[&'static str],
    flat_args: &[ExpandedArg],
) -> Result<(Vec<ExpandedArg>, Kwargs)> {
    let split = flat_args
        .len()
        .checked_sub(kwarg_names.len())
        .ok_or_else(|| {
            Error::invalid_argument(
                "kwarg_names",
                format!(
                    "{} keyword names for only {} arguments",
                    kwarg_names.len(),
                    flat_args.len()
                ),
            )
        })?;

    let (args, kwarg_values) = flat_args.split_at(split);
    let mut kwargs = Kwargs::new();
    for (&name, value) in kwarg_names.iter().zip(kwarg_values) {
        kwargs.insert(name, value.clone());
    }
    Ok((args.to_vec(), kwargs))
}
