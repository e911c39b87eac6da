use crate::HeaderValue;
use smallvec::{SmallVec, smallvec};
use smartcow::SmartCow;
use std::{
    fmt::{Debug, Display},
    ops::{Deref, DerefMut},
};

/// A collection of [`HeaderValue`]s with the same header name
#[derive(Clone, Eq, PartialEq)]
pub struct HeaderValues(SmallVec<[HeaderValue; 1]>);

impl Deref for HeaderValues {
    type Target = [HeaderValue];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for HeaderValues {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Default for HeaderValues {
    fn default() -> Self {
        Self(SmallVec::with_capacity(1))
    }
}

impl Debug for HeaderValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.one() {
            Some(value) => Debug::fmt(value, f),
            None => f.debug_list().entries(&self.0).finish(),
        }
    }
}

impl HeaderValues {
    /// builds an empty `HeaderValues`
    pub fn new() -> Self {
        Self::default()
    }

    /// the singular value as a &str, if it is utf8. see [`HeaderValues::one`]
    pub fn as_str(&self) -> Option<&str> {
        self.one().and_then(HeaderValue::as_str)
    }

    pub(crate) fn as_lower(&self) -> Option<SmartCow<'_>> {
        self.one().and_then(HeaderValue::as_lower)
    }

    /// if there is exactly one header value, returns it. `None` for
    /// repeated headers
    pub fn one(&self) -> Option<&HeaderValue> {
        if self.0.len() == 1 {
            self.0.first()
        } else {
            None
        }
    }

    /// add a value to this collection
    pub fn append(&mut self, value: impl Into<HeaderValue>) {
        self.0.push(value.into());
    }

    /// extend this collection with another
    pub fn extend(&mut self, values: impl Into<HeaderValues>) {
        self.0.extend(values.into());
    }
}

impl IntoIterator for HeaderValues {
    type Item = HeaderValue;
    type IntoIter = smallvec::IntoIter<[HeaderValue; 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderValues {
    type Item = &'a HeaderValue;
    type IntoIter = std::slice::Iter<'a, HeaderValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<I> FromIterator<I> for HeaderValues
where
    I: Into<HeaderValue>,
{
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Display for HeaderValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(value, f)?;
        }
        Ok(())
    }
}

impl From<HeaderValue> for HeaderValues {
    fn from(v: HeaderValue) -> Self {
        Self(smallvec![v])
    }
}

impl From<Vec<u8>> for HeaderValues {
    fn from(v: Vec<u8>) -> Self {
        Self(smallvec![v.into()])
    }
}

impl From<String> for HeaderValues {
    fn from(s: String) -> Self {
        Self(smallvec![s.into()])
    }
}

impl From<&'static str> for HeaderValues {
    fn from(s: &'static str) -> Self {
        Self(smallvec![s.into()])
    }
}

impl From<u64> for HeaderValues {
    fn from(n: u64) -> Self {
        Self(smallvec![n.into()])
    }
}

impl<HV> From<Vec<HV>> for HeaderValues
where
    HV: Into<HeaderValue>,
{
    fn from(v: Vec<HV>) -> Self {
        Self(v.into_iter().map(Into::into).collect())
    }
}
