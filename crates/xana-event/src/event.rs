//! The per-transition event container.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Detector source address qualifying an event key, e.g. a DAQ device name.
///
/// The framework treats sources as opaque strings; matching is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Src(String);

impl Src {
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Src {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Src {
    fn from(addr: &str) -> Self {
        Self(addr.to_owned())
    }
}

impl From<String> for Src {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

/// Error from event container operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// A value with the same (type, source, key) triple is already stored.
    #[error("duplicate event key: {0}")]
    DuplicateKey(EventKey),
}

/// Full key of a stored value: value type plus optional source and string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    type_id: TypeId,
    type_name: &'static str,
    src: Option<Src>,
    key: Option<String>,
}

impl EventKey {
    fn new<T: Any>(src: Option<Src>, key: Option<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            src,
            key,
        }
    }

    /// Name of the stored value type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Source address, if the value was stored with one.
    #[must_use]
    pub fn src(&self) -> Option<&Src> {
        self.src.as_ref()
    }

    /// String key, if the value was stored with one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(src) = &self.src {
            write!(f, " src={src}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " key={key}")?;
        }
        Ok(())
    }
}

/// Typed key/value container carried through the module chain.
///
/// One `Event` is allocated per transition by the dispatcher, handed
/// read/write to every module in the chain, and finally reaches the iterator
/// consumer. Values are shared with reference-count semantics ([`Arc`]); the
/// container itself is exclusively owned by the transition it belongs to.
///
/// Keys are (value type, optional [`Src`], optional string key) triples;
/// storing a second value under an occupied key is an error.
///
/// # Example
///
/// ```
/// use xana_event::Event;
///
/// let mut evt = Event::new();
/// evt.put(42u32).unwrap();
/// evt.put_keyed("raw".to_string(), "tag").unwrap();
///
/// assert_eq!(*evt.get::<u32>().unwrap(), 42);
/// assert_eq!(*evt.get_keyed::<String>("tag").unwrap(), "raw");
/// assert!(evt.get::<i64>().is_none());
/// ```
#[derive(Default)]
pub struct Event {
    values: HashMap<EventKey, Arc<dyn Any + Send + Sync>>,
    // Hidden marker written by the dispatcher when a module requested skip.
    skipped: bool,
}

impl Event {
    /// Creates an empty event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value keyed by its type only.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateKey`] if a value of this type without
    /// source or key qualifiers is already stored.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) -> Result<(), EventError> {
        self.insert(value, None, None)
    }

    /// Stores a value keyed by its type and a source address.
    pub fn put_at<T: Any + Send + Sync>(&mut self, value: T, src: Src) -> Result<(), EventError> {
        self.insert(value, Some(src), None)
    }

    /// Stores a value keyed by its type and a string key.
    pub fn put_keyed<T: Any + Send + Sync>(
        &mut self,
        value: T,
        key: impl Into<String>,
    ) -> Result<(), EventError> {
        self.insert(value, None, Some(key.into()))
    }

    fn insert<T: Any + Send + Sync>(
        &mut self,
        value: T,
        src: Option<Src>,
        key: Option<String>,
    ) -> Result<(), EventError> {
        let event_key = EventKey::new::<T>(src, key);
        if self.values.contains_key(&event_key) {
            return Err(EventError::DuplicateKey(event_key));
        }
        self.values.insert(event_key, Arc::new(value));
        Ok(())
    }

    /// Fetches a value stored under the bare type key.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.fetch(&EventKey::new::<T>(None, None))
    }

    /// Fetches a value stored under a type and source address.
    #[must_use]
    pub fn get_at<T: Any + Send + Sync>(&self, src: &Src) -> Option<Arc<T>> {
        self.fetch(&EventKey::new::<T>(Some(src.clone()), None))
    }

    /// Fetches a value stored under a type and string key.
    #[must_use]
    pub fn get_keyed<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.fetch(&EventKey::new::<T>(None, Some(key.to_owned())))
    }

    fn fetch<T: Any + Send + Sync>(&self, key: &EventKey) -> Option<Arc<T>> {
        self.values
            .get(key)
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    /// Returns `true` if a value is stored under the bare type key.
    #[must_use]
    pub fn exists<T: Any + Send + Sync>(&self) -> bool {
        self.values.contains_key(&EventKey::new::<T>(None, None))
    }

    /// All keys currently stored, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<EventKey> {
        self.values.keys().cloned().collect()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Marks this event as skipped by a module in the chain.
    ///
    /// Set by the dispatcher the first time a module returns a skip verdict;
    /// observe-all modules and the final consumer can inspect it through
    /// [`Event::is_skipped`].
    pub fn mark_skipped(&mut self) {
        self.skipped = true;
    }

    /// Returns `true` if some module requested skip for this event.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("values", &self.values.len())
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let mut evt = Event::new();
        evt.put(7u32).unwrap();
        assert_eq!(*evt.get::<u32>().unwrap(), 7);
        assert!(evt.get::<u64>().is_none());
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut evt = Event::new();
        evt.put(1u32).unwrap();
        let err = evt.put(2u32).unwrap_err();
        assert!(err.to_string().contains("duplicate event key"));
        // first value untouched
        assert_eq!(*evt.get::<u32>().unwrap(), 1);
    }

    #[test]
    fn src_and_key_qualifiers_are_distinct() {
        let mut evt = Event::new();
        let src = Src::new("det.0:cam.1");
        evt.put(1u32).unwrap();
        evt.put_at(2u32, src.clone()).unwrap();
        evt.put_keyed(3u32, "corrected").unwrap();

        assert_eq!(*evt.get::<u32>().unwrap(), 1);
        assert_eq!(*evt.get_at::<u32>(&src).unwrap(), 2);
        assert_eq!(*evt.get_keyed::<u32>("corrected").unwrap(), 3);
        assert_eq!(evt.len(), 3);
    }

    #[test]
    fn values_are_shared() {
        let mut evt = Event::new();
        evt.put(vec![1u8, 2, 3]).unwrap();
        let a = evt.get::<Vec<u8>>().unwrap();
        let b = evt.get::<Vec<u8>>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn skip_marker() {
        let mut evt = Event::new();
        assert!(!evt.is_skipped());
        evt.mark_skipped();
        assert!(evt.is_skipped());
    }

    #[test]
    fn keys_report_type_names() {
        let mut evt = Event::new();
        evt.put_keyed(1.5f64, "energy").unwrap();
        let keys = evt.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].type_name(), "f64");
        assert_eq!(keys[0].key(), Some("energy"));
        assert!(keys[0].src().is_none());
    }
}
