use super::field::FieldMap;

/// Removes every undefined entry in place. Explicit nulls are kept so the
/// storage layer can treat them as clears or `IS NULL` predicates.
pub fn remove_undefined_values(fields: &mut FieldMap) {
    fields.retain(|_, value| !value.is_undefined());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::field::Field;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("id".into(), Field::Value(json!(5)));
        fields.insert("email".into(), Field::Undefined);
        fields.insert("address2".into(), Field::Null);
        fields.insert("state".into(), Field::Value(json!(["NSW", "VIC"])));
        fields
    }

    #[test]
    fn test_removes_only_undefined() {
        let mut fields = sample();
        remove_undefined_values(&mut fields);

        assert!(!fields.contains_key("email"));
        assert_eq!(fields.get("address2"), Some(&Field::Null));
        assert_eq!(fields.get("id"), Some(&Field::Value(json!(5))));
        assert_eq!(fields.get("state"), Some(&Field::Value(json!(["NSW", "VIC"]))));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let mut once = sample();
        remove_undefined_values(&mut once);
        let mut twice = once.clone();
        remove_undefined_values(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_map() {
        let mut fields = FieldMap::new();
        remove_undefined_values(&mut fields);
        assert!(fields.is_empty());
    }
}
