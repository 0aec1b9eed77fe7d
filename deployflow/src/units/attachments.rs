//! Typed attachment store carried by every deployment unit.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Key identifying an attachment.
///
/// Typed attachments are keyed by their Rust type name; untyped ones use an
/// explicit name. Deployers declare their inputs and outputs with these keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentKey(String);

impl AttachmentKey {
    /// Returns the key for attachments of type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    /// Returns a key with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttachmentKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for AttachmentKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

type Value = Box<dyn Any + Send + Sync>;

/// Result of looking an attachment up.
#[derive(Debug)]
pub enum Lookup<'a> {
    /// Nothing was ever attached under this key.
    Absent,
    /// The key was attached explicitly without a value.
    Null,
    /// A value is attached.
    Present(&'a (dyn Any + Send + Sync)),
}

impl Lookup<'_> {
    /// Returns true if the key is attached, with or without a value.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// A heterogeneous map from attachment key to value.
///
/// "Not present" and "present but null" are distinct: [`Attachments::put_null`]
/// records the key without a value.
#[derive(Default)]
pub struct Attachments {
    entries: HashMap<AttachmentKey, Option<Value>>,
}

impl Attachments {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a value under its type key. Returns true if a previous entry
    /// was replaced.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) -> bool {
        self.put_named(AttachmentKey::of::<T>(), value)
    }

    /// Attaches a value under an explicit key. Returns true if a previous
    /// entry was replaced.
    pub fn put_named<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<AttachmentKey>,
        value: T,
    ) -> bool {
        self.entries
            .insert(key.into(), Some(Box::new(value)))
            .is_some()
    }

    /// Records the key as attached without a value.
    pub fn put_null(&mut self, key: impl Into<AttachmentKey>) -> bool {
        self.entries.insert(key.into(), None).is_some()
    }

    /// Returns the value attached under `T`'s type key.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.get_named(&AttachmentKey::of::<T>())
    }

    /// Returns the value attached under `key` if it has type `T`.
    #[must_use]
    pub fn get_named<T: Any + Send + Sync>(&self, key: &AttachmentKey) -> Option<&T> {
        self.entries
            .get(key)
            .and_then(Option::as_ref)
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value attached under `T`'s type key.
    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&AttachmentKey::of::<T>())
            .and_then(Option::as_mut)
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Looks a key up, distinguishing absent from null.
    #[must_use]
    pub fn lookup(&self, key: &AttachmentKey) -> Lookup<'_> {
        match self.entries.get(key) {
            None => Lookup::Absent,
            Some(None) => Lookup::Null,
            Some(Some(v)) => Lookup::Present(&**v),
        }
    }

    /// Returns true if the key is attached, with or without a value.
    #[must_use]
    pub fn contains(&self, key: &AttachmentKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true if a non-null value is attached under the key.
    #[must_use]
    pub fn is_present(&self, key: &AttachmentKey) -> bool {
        matches!(self.entries.get(key), Some(Some(_)))
    }

    /// Removes the entry under `key`. Returns true if something was attached.
    pub fn remove(&mut self, key: &AttachmentKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes and returns the value attached under `T`'s type key.
    pub fn take<T: Any + Send + Sync>(&mut self) -> Option<T> {
        let key = AttachmentKey::of::<T>();
        match self.entries.remove(&key) {
            Some(Some(v)) => match v.downcast::<T>() {
                Ok(v) => Some(*v),
                Err(v) => {
                    self.entries.insert(key, Some(v));
                    None
                }
            },
            Some(None) => {
                self.entries.insert(key, None);
                None
            }
            None => None,
        }
    }

    /// Returns all attached keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<AttachmentKey> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of attached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachments")
            .field("keys", &self.keys())
            .finish()
    }
}
