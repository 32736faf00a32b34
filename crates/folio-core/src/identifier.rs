//! Identifiers for declared names.
//!
//! An [`Id`] is a cheaply clonable, reference-counted name. Identifiers are
//! owned by the document that declared them; there is no process-wide table,
//! so documents can be parsed on separate threads without coordination.

use std::{borrow::Borrow, fmt, sync::Arc};

use serde::Serialize;

/// Name of a declared entity (type, field, node, cluster, ...).
///
/// # Examples
///
/// ```
/// use folio_core::identifier::Id;
///
/// let point = Id::new("Point");
/// let nested = Id::new("Shape").create_nested(&Id::new("CIRCLE"));
///
/// assert_eq!(point, "Point");
/// assert_eq!(nested, "Shape::CIRCLE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(Arc<str>);

impl Id {
    /// Creates an `Id` from a name.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Creates a nested ID by joining `self` and `child_id` with `::`.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::identifier::Id;
    ///
    /// let parent = Id::new("Status");
    /// let nested = parent.create_nested(&Id::new("ACTIVE"));
    /// assert_eq!(nested, "Status::ACTIVE");
    /// ```
    pub fn create_nested(&self, child_id: &Id) -> Self {
        Self(Arc::from(format!("{}::{}", self.0, child_id.0)))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("Rectangle");
        let id2 = Id::new("Rectangle");
        let id3 = Id::new("Oval");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Rectangle");
    }

    #[test]
    fn test_create_nested() {
        let parent = Id::new("Status");
        let nested1 = parent.create_nested(&Id::new("ACTIVE"));
        let nested2 = parent.create_nested(&Id::new("RETIRED"));

        assert_ne!(nested1, nested2);
        assert_eq!(nested1, "Status::ACTIVE");
        assert_eq!(nested2, "Status::RETIRED");
    }

    #[test]
    fn test_display_trait() {
        let id = Id::new("display_test");
        assert_eq!(format!("{id}"), "display_test");
    }

    #[test]
    fn test_hash_lookup_by_str() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Id::new("key1"), "value1");
        map.insert(Id::new("key2"), "value2");

        assert_eq!(map.get("key1"), Some(&"value1"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_ordering_is_lexical() {
        let mut ids = vec![Id::new("b"), Id::new("a"), Id::new("c")];
        ids.sort();
        assert_eq!(ids, vec![Id::new("a"), Id::new("b"), Id::new("c")]);
    }

    #[test]
    fn test_ids_cross_threads() {
        let id = Id::new("shared");
        let handle = std::thread::spawn({
            let id = id.clone();
            move || id.to_string()
        });
        assert_eq!(handle.join().unwrap(), "shared");
        assert_eq!(id, "shared");
    }
}
