mod header_name;
mod header_value;
mod header_values;

pub use header_name::{HeaderName, KnownHeaderName};
pub use header_value::HeaderValue;
pub use header_values::HeaderValues;

use indexmap::{Equivalent, IndexMap, map::Entry};
use smartcow::SmartCow;
use std::fmt::{self, Display, Formatter};

struct Lookup<'a>(HeaderName<'a>);

impl Equivalent<HeaderName<'static>> for Lookup<'_> {
    fn equivalent(&self, key: &HeaderName<'static>) -> bool {
        self.0 == *key
    }
}

impl std::hash::Hash for Lookup<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Weir's header multimap.
///
/// Iteration yields headers in insertion order, names compare
/// case-insensitively, and repeated names accumulate values instead of
/// replacing them (unless [`Headers::insert`] is used).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use]
pub struct Headers {
    entries: IndexMap<HeaderName<'static>, HeaderValues>,
}

impl Headers {
    /// Construct an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// How many unique header names have been added? Note that each
    /// name may hold more than one [`HeaderValue`].
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Are there zero headers?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a value or values for this header name, retaining any values
    /// already present. To replace instead, use [`Headers::insert`].
    pub fn append(
        &mut self,
        name: impl Into<HeaderName<'static>>,
        values: impl Into<HeaderValues>,
    ) {
        match self.entries.entry(name.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().extend(values.into()),
            Entry::Vacant(entry) => {
                entry.insert(values.into());
            }
        }
    }

    /// Add a value or values for this header name, replacing any values
    /// already present. To combine, see [`Headers::append`].
    pub fn insert(
        &mut self,
        name: impl Into<HeaderName<'static>>,
        values: impl Into<HeaderValues>,
    ) {
        self.entries.insert(name.into(), values.into());
    }

    /// Add a value or values for this header name if and only if the
    /// name is not already present.
    pub fn try_insert(
        &mut self,
        name: impl Into<HeaderName<'static>>,
        values: impl Into<HeaderValues>,
    ) {
        self.entries.entry(name.into()).or_insert_with(|| values.into());
    }

    /// If the name is not already present, execute the provided
    /// function and insert its value.
    pub fn try_insert_with<V>(
        &mut self,
        name: impl Into<HeaderName<'static>>,
        values: impl FnOnce() -> V,
    ) where
        V: Into<HeaderValues>,
    {
        self.entries
            .entry(name.into())
            .or_insert_with(|| values().into());
    }

    /// Retrieves all values for the provided header name, if any.
    pub fn get_values<'a>(&self, name: impl Into<HeaderName<'a>>) -> Option<&HeaderValues> {
        self.entries.get(&Lookup(name.into()))
    }

    /// Retrieves the singular value for this header name. `None` if the
    /// header is absent or repeated.
    pub fn get<'a>(&self, name: impl Into<HeaderName<'a>>) -> Option<&HeaderValue> {
        self.get_values(name).and_then(HeaderValues::one)
    }

    /// Retrieves the singular &str value for this header name.
    pub fn get_str<'a>(&self, name: impl Into<HeaderName<'a>>) -> Option<&str> {
        self.get_values(name).and_then(HeaderValues::as_str)
    }

    pub(crate) fn get_lower<'a>(&self, name: impl Into<HeaderName<'a>>) -> Option<SmartCow<'_>> {
        self.get_values(name).and_then(HeaderValues::as_lower)
    }

    /// Takes all values for the provided header name out of this map,
    /// preserving the order of the remaining headers.
    pub fn remove<'a>(&mut self, name: impl Into<HeaderName<'a>>) -> Option<HeaderValues> {
        self.entries.shift_remove(&Lookup(name.into()))
    }

    /// Predicate function to check whether this map contains the
    /// provided header name.
    pub fn has_header<'a>(&self, name: impl Into<HeaderName<'a>>) -> bool {
        self.entries.contains_key(&Lookup(name.into()))
    }

    /// Convenience function to check whether the singular value for the
    /// provided name is ascii-case-insensitively equal to the provided
    /// comparison &str. Returns false if there is no value for the name.
    pub fn eq_ignore_ascii_case<'a>(
        &'a self,
        name: impl Into<HeaderName<'a>>,
        needle: &str,
    ) -> bool {
        self.get_str(name)
            .is_some_and(|value| value.eq_ignore_ascii_case(needle))
    }

    /// Checks whether any value for the provided name contains `token`
    /// as one of its comma-separated elements, compared
    /// ascii-case-insensitively. `Connection: Keep-Alive, Upgrade`
    /// contains the token `keep-alive`.
    pub fn contains_token<'a>(&self, name: impl Into<HeaderName<'a>>, token: &str) -> bool {
        self.get_values(name).is_some_and(|values| {
            values.iter().any(|value| {
                value
                    .as_str()
                    .is_some_and(|s| s.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
            })
        })
    }

    /// Removes every header from this map.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return an iterator over borrowed header names and values, in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName<'static>, &HeaderValues)> {
        self.entries.iter()
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, values) in &self.entries {
            for value in values {
                f.write_fmt(format_args!("{name}: {value}\r\n"))?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a HeaderName<'static>, &'a HeaderValues);
    type IntoIter = indexmap::map::Iter<'a, HeaderName<'static>, HeaderValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Headers {
    type Item = (HeaderName<'static>, HeaderValues);
    type IntoIter = indexmap::map::IntoIter<HeaderName<'static>, HeaderValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<HN, HV> Extend<(HN, HV)> for Headers
where
    HN: Into<HeaderName<'static>>,
    HV: Into<HeaderValues>,
{
    fn extend<T: IntoIterator<Item = (HN, HV)>>(&mut self, iter: T) {
        for (name, values) in iter {
            self.append(name, values);
        }
    }
}

impl<HN, HV> FromIterator<(HN, HV)> for Headers
where
    HN: Into<HeaderName<'static>>,
    HV: Into<HeaderValues>,
{
    fn from_iter<T: IntoIterator<Item = (HN, HV)>>(iter: T) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}
