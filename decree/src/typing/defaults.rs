//! Default values as the command line shows them

use serde_json::Value;

use super::hint::{value_token, TypeHint};

/// Convert a parameter default into the literal the command line displays
///
/// Enum members given by name become their value; collections convert
/// element by element; dates and times are already ISO strings.
pub fn convert_default(hint: &TypeHint, default: &Value) -> Value {
    match (hint.base(), default) {
        (TypeHint::Enum(e), Value::String(name)) => e
            .members
            .iter()
            .find(|m| &m.name == name)
            .map(|m| m.value.clone())
            .unwrap_or_else(|| default.clone()),
        (TypeHint::Union(members), _) => members
            .iter()
            .filter(|m| **m != TypeHint::None)
            .map(|m| convert_default(m, default))
            .find(|converted| converted != default)
            .unwrap_or_else(|| default.clone()),
        (TypeHint::Tuple(members), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| match members.get(i) {
                    Some(member) => convert_default(member, item),
                    None => item.clone(),
                })
                .collect(),
        ),
        (TypeHint::Collection(..), Value::Array(items)) => {
            let element = hint.collection_element().unwrap_or(TypeHint::Any);
            Value::Array(items.iter().map(|item| convert_default(&element, item)).collect())
        }
        _ => default.clone(),
    }
}

/// Render a converted default for `[default: ...]`
pub fn default_label(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(default_label).collect::<Vec<_>>().join(", "),
        other => value_token(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::hint::EnumType;
    use serde_json::json;

    #[test]
    fn test_enum_member_names_become_values() {
        let level = TypeHint::Enum(
            EnumType::from_values("Level", Vec::<Value>::new()).with_member("LOW", 1).with_member("HIGH", 9),
        );
        assert_eq!(convert_default(&level, &json!("HIGH")), json!(9));
        assert_eq!(convert_default(&level, &json!(1)), json!(1));
        assert_eq!(
            convert_default(&TypeHint::optional(level.clone()), &json!("LOW")),
            json!(1)
        );
        assert_eq!(
            convert_default(&TypeHint::list(level), &json!(["LOW", "HIGH"])),
            json!([1, 9])
        );
    }

    #[test]
    fn test_other_values_pass_through() {
        assert_eq!(convert_default(&TypeHint::Date, &json!("2024-01-01")), json!("2024-01-01"));
        assert_eq!(convert_default(&TypeHint::Int, &json!(3)), json!(3));
    }

    #[test]
    fn test_default_label() {
        assert_eq!(default_label(&json!("x")), "x");
        assert_eq!(default_label(&json!(1.5)), "1.5");
        assert_eq!(default_label(&json!([1, 2])), "1, 2");
        assert_eq!(default_label(&json!(true)), "true");
    }
}
