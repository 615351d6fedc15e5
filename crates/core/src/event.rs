//! Change events
//!
//! Every mutation produces one `ChangeEvent` carrying a deep copy of the
//! value after the mutation. Subscribers own their copies outright; nothing
//! they do to an event can reach back into a store.

use crate::types::ValueKind;
use std::collections::HashMap;

/// Deep, independent copy of a stored value at the moment of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSnapshot {
    /// String scalar.
    String(String),
    /// List elements in order.
    List(Vec<String>),
    /// Set members, order unspecified.
    Set(Vec<String>),
    /// Hash fields.
    Hash(HashMap<String, String>),
}

/// Immutable record describing one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Which typed store the mutated key belongs to.
    pub kind: ValueKind,
    /// The mutated key.
    pub key: String,
    /// The mutated field, for hash field operations.
    pub field: Option<String>,
    /// Value after the mutation; `None` means the key was deleted.
    pub value: Option<ValueSnapshot>,
}

impl ChangeEvent {
    /// Event for a whole-value mutation (set, rpush, sadd, ...).
    pub fn mutation(kind: ValueKind, key: impl Into<String>, value: ValueSnapshot) -> Self {
        ChangeEvent {
            kind,
            key: key.into(),
            field: None,
            value: Some(value),
        }
    }

    /// Event for a hash field mutation, carrying the whole hash after it.
    pub fn field_mutation(
        key: impl Into<String>,
        field: impl Into<String>,
        fields: HashMap<String, String>,
    ) -> Self {
        ChangeEvent {
            kind: ValueKind::Hash,
            key: key.into(),
            field: Some(field.into()),
            value: Some(ValueSnapshot::Hash(fields)),
        }
    }

    /// Event for a key deletion.
    pub fn deletion(kind: ValueKind, key: impl Into<String>) -> Self {
        ChangeEvent {
            kind,
            key: key.into(),
            field: None,
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_event_shape() {
        let event = ChangeEvent::mutation(
            ValueKind::String,
            "counter",
            ValueSnapshot::String("1".into()),
        );
        assert_eq!(event.kind, ValueKind::String);
        assert_eq!(event.key, "counter");
        assert_eq!(event.field, None);
        assert_eq!(event.value, Some(ValueSnapshot::String("1".into())));
    }

    #[test]
    fn test_field_mutation_carries_field_and_hash() {
        let mut fields = HashMap::new();
        fields.insert("f".to_string(), "v".to_string());
        let event = ChangeEvent::field_mutation("h", "f", fields.clone());
        assert_eq!(event.kind, ValueKind::Hash);
        assert_eq!(event.field.as_deref(), Some("f"));
        assert_eq!(event.value, Some(ValueSnapshot::Hash(fields)));
    }

    #[test]
    fn test_deletion_event_has_no_value() {
        let event = ChangeEvent::deletion(ValueKind::List, "gone");
        assert_eq!(event.value, None);
        assert_eq!(event.field, None);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut fields = HashMap::new();
        fields.insert("f".to_string(), "v".to_string());
        let event = ChangeEvent::field_mutation("h", "f", fields.clone());

        // Mutating the map the event was built from must not change the event.
        fields.insert("f".to_string(), "other".to_string());
        match event.value {
            Some(ValueSnapshot::Hash(h)) => assert_eq!(h.get("f").map(String::as_str), Some("v")),
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }
}
