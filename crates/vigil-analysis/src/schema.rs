//! Recursive schema inference by folding a join over observed values.
//!
//! The join widens primitive types along `null < bool < integer < number <
//! string`, unions object properties (a property stays required only if
//! every sample carries it), recurses into array items, and keeps an `enum`
//! while the observed leaf domain stays small.

use std::collections::BTreeMap;

use serde_json::Value;

use vigil_types::{InferredSchema, SchemaType};

/// Largest observed leaf domain that is still recorded as an enum.
const MAX_ENUM_VALUES: usize = 12;

/// Infer a schema from a set of observed values.
///
/// Returns `None` when there are no samples.
pub fn infer_schema(samples: &[Value]) -> Option<InferredSchema> {
    let mut schemas = samples.iter().map(schema_of);
    let first = schemas.next()?;
    let mut joined = schemas.fold(first, join);
    prune_enums(&mut joined);
    Some(joined)
}

/// The schema of a single value.
fn schema_of(value: &Value) -> InferredSchema {
    match value {
        Value::Null => InferredSchema::of_type(SchemaType::Null),
        Value::Bool(_) => leaf_with_enum(SchemaType::Boolean, None),
        Value::Number(_) => leaf_with_enum(SchemaType::of(value), Some(value.clone())),
        Value::String(_) => leaf_with_enum(SchemaType::String, Some(value.clone())),
        Value::Array(items) => {
            let item_schema = items
                .iter()
                .map(schema_of)
                .reduce(join)
                .map(Box::new);
            InferredSchema {
                items: item_schema,
                ..InferredSchema::of_type(SchemaType::Array)
            }
        }
        Value::Object(map) => {
            let properties: BTreeMap<String, InferredSchema> = map
                .iter()
                .map(|(k, v)| (k.clone(), schema_of(v)))
                .collect();
            let required: Vec<String> = properties.keys().cloned().collect();
            InferredSchema {
                properties: Some(properties),
                required: Some(required),
                ..InferredSchema::of_type(SchemaType::Object)
            }
        }
    }
}

fn leaf_with_enum(kind: SchemaType, value: Option<Value>) -> InferredSchema {
    InferredSchema {
        enum_values: value.map(|v| vec![v]),
        ..InferredSchema::of_type(kind)
    }
}

/// Join two schemas into the narrowest schema covering both.
pub fn join(a: InferredSchema, b: InferredSchema) -> InferredSchema {
    // Null joins anything by marking it nullable.
    if a.kind == SchemaType::Null && b.kind != SchemaType::Null {
        return nullable(b);
    }
    if b.kind == SchemaType::Null && a.kind != SchemaType::Null {
        return nullable(a);
    }

    if a.kind == b.kind {
        return join_same_kind(a, b);
    }

    // Primitive widening along the lattice; incompatible composites widen
    // all the way to string.
    let widened = if is_primitive(a.kind) && is_primitive(b.kind) {
        a.kind.max(b.kind)
    } else {
        SchemaType::String
    };
    InferredSchema {
        nullable: merge_nullable(a.nullable, b.nullable),
        enum_values: merge_enums(a.enum_values, b.enum_values),
        ..InferredSchema::of_type(widened)
    }
}

fn join_same_kind(a: InferredSchema, b: InferredSchema) -> InferredSchema {
    match a.kind {
        SchemaType::Object => {
            let a_props = a.properties.unwrap_or_default();
            let mut b_props = b.properties.unwrap_or_default();

            // Required = present in every sample = intersection.
            let a_req = a.required.unwrap_or_default();
            let b_req = b.required.unwrap_or_default();
            let required: Vec<String> = a_req
                .iter()
                .filter(|k| b_req.contains(k))
                .cloned()
                .collect();

            let mut properties = BTreeMap::new();
            for (key, a_child) in a_props {
                match b_props.remove(&key) {
                    Some(b_child) => {
                        properties.insert(key, join(a_child, b_child));
                    }
                    None => {
                        properties.insert(key, a_child);
                    }
                }
            }
            properties.extend(b_props);

            InferredSchema {
                properties: Some(properties),
                required: Some(required),
                nullable: merge_nullable(a.nullable, b.nullable),
                ..InferredSchema::of_type(SchemaType::Object)
            }
        }
        SchemaType::Array => {
            let items = match (a.items, b.items) {
                (Some(a_items), Some(b_items)) => Some(Box::new(join(*a_items, *b_items))),
                (Some(items), None) | (None, Some(items)) => Some(items),
                (None, None) => None,
            };
            InferredSchema {
                items,
                nullable: merge_nullable(a.nullable, b.nullable),
                ..InferredSchema::of_type(SchemaType::Array)
            }
        }
        _ => InferredSchema {
            nullable: merge_nullable(a.nullable, b.nullable),
            enum_values: merge_enums(a.enum_values, b.enum_values),
            ..InferredSchema::of_type(a.kind)
        },
    }
}

fn nullable(schema: InferredSchema) -> InferredSchema {
    InferredSchema {
        nullable: Some(true),
        ..schema
    }
}

fn is_primitive(kind: SchemaType) -> bool {
    matches!(
        kind,
        SchemaType::Null
            | SchemaType::Boolean
            | SchemaType::Integer
            | SchemaType::Number
            | SchemaType::String
    )
}

fn merge_nullable(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
    }
}

/// Union of observed leaf values; `None` once either side overflowed.
fn merge_enums(a: Option<Vec<Value>>, b: Option<Vec<Value>>) -> Option<Vec<Value>> {
    let (Some(a), Some(b)) = (a, b) else {
        return None;
    };
    let mut merged = a;
    for value in b {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    if merged.len() > MAX_ENUM_VALUES {
        return None;
    }
    Some(merged)
}

/// Drop enum lists that overflowed the domain cap anywhere in the tree.
fn prune_enums(schema: &mut InferredSchema) {
    if schema
        .enum_values
        .as_ref()
        .is_some_and(|values| values.len() > MAX_ENUM_VALUES)
    {
        schema.enum_values = None;
    }
    if let Some(items) = schema.items.as_mut() {
        prune_enums(items);
    }
    if let Some(properties) = schema.properties.as_mut() {
        for child in properties.values_mut() {
            prune_enums(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_samples_yield_none() {
        assert!(infer_schema(&[]).is_none());
    }

    #[test]
    fn uniform_objects_keep_everything_required() {
        let schema = infer_schema(&[
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b"}),
        ])
        .unwrap();
        assert_eq!(schema.kind, SchemaType::Object);
        let mut required = schema.required.unwrap();
        required.sort();
        assert_eq!(required, vec!["id", "name"]);
    }

    #[test]
    fn missing_property_becomes_optional() {
        let schema = infer_schema(&[
            json!({"id": 1, "nickname": "a"}),
            json!({"id": 2}),
        ])
        .unwrap();
        let required = schema.required.unwrap();
        assert_eq!(required, vec!["id"]);
        assert!(schema.properties.unwrap().contains_key("nickname"));
    }

    #[test]
    fn null_alongside_type_marks_nullable() {
        let schema = infer_schema(&[json!("x"), json!(null)]).unwrap();
        assert_eq!(schema.kind, SchemaType::String);
        assert_eq!(schema.nullable, Some(true));
    }

    #[test]
    fn integer_widens_to_number() {
        let schema = infer_schema(&[json!(1), json!(2.5)]).unwrap();
        assert_eq!(schema.kind, SchemaType::Number);
    }

    #[test]
    fn incompatible_composites_widen_to_string() {
        let schema = infer_schema(&[json!([1]), json!({"a": 1})]).unwrap();
        assert_eq!(schema.kind, SchemaType::String);
    }

    #[test]
    fn array_items_join_recursively() {
        let schema = infer_schema(&[json!([{"id": 1}]), json!([{"id": 2, "x": true}])]).unwrap();
        let items = schema.items.unwrap();
        assert_eq!(items.kind, SchemaType::Object);
        assert_eq!(items.required.as_ref().unwrap(), &vec!["id".to_string()]);
    }

    #[test]
    fn enum_kept_at_twelve_distinct_values() {
        let samples: Vec<Value> = (0..12).map(|i| json!(format!("v{i}"))).collect();
        let schema = infer_schema(&samples).unwrap();
        assert_eq!(schema.enum_values.unwrap().len(), 12);
    }

    #[test]
    fn enum_dropped_at_thirteen_distinct_values() {
        let samples: Vec<Value> = (0..13).map(|i| json!(format!("v{i}"))).collect();
        let schema = infer_schema(&samples).unwrap();
        assert!(schema.enum_values.is_none());
    }

    #[test]
    fn repeated_values_count_once_toward_enum_cap() {
        let samples: Vec<Value> = (0..50).map(|i| json!(format!("v{}", i % 3))).collect();
        let schema = infer_schema(&samples).unwrap();
        assert_eq!(schema.enum_values.unwrap().len(), 3);
    }

    #[test]
    fn booleans_do_not_collect_enums() {
        let schema = infer_schema(&[json!(true), json!(false)]).unwrap();
        assert_eq!(schema.kind, SchemaType::Boolean);
        assert!(schema.enum_values.is_none());
    }
}
