//! Value-rewriting operations and the pipeline that folds them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::functions::FunctionRegistry;
use crate::schema::deserialize_present;
use crate::value::{
    format_number, is_empty_value, is_truthy, js_string, number_value, parse_number,
};

fn default_random_min() -> i64 {
    1
}

fn default_random_max() -> i64 {
    2_147_483_647
}

/// A single operation of a rule's transform pipeline.
///
/// Serialized with an `op` tag, e.g. `{"op": "default", "value": 1024}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Transform {
    /// Boolean negation of the value's truthiness
    Not,
    /// Look up the stringified value in `map`, falling back to `default`
    EnumMap {
        map: Map<String, Value>,
        #[serde(
            default,
            deserialize_with = "deserialize_present",
            skip_serializing_if = "Option::is_none"
        )]
        default: Option<Value>,
    },
    /// First non-empty element of an array
    Coalesce,
    /// Uniform random integer in `[min, max]`
    RandomInt {
        #[serde(default = "default_random_min")]
        min: i64,
        #[serde(default = "default_random_max")]
        max: i64,
    },
    /// Wrap a scalar in a single-element array
    Array,
    ToNumber,
    ToString,
    /// Select one array element
    Pick {
        #[serde(default)]
        index: i64,
    },
    Trim,
    Lowercase,
    Uppercase,
    /// Array slice with negative indices counting from the end
    Slice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<i64>,
    },
    /// Substitute `value` when the current value is empty
    Default {
        #[serde(default)]
        value: Value,
    },
    /// Apply a function from the registry
    CustomFn {
        #[serde(rename = "fn")]
        name: String,
    },
}

/// Discriminant of [`Transform`], used to dispatch to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Not,
    EnumMap,
    Coalesce,
    RandomInt,
    Array,
    ToNumber,
    ToString,
    Pick,
    Trim,
    Lowercase,
    Uppercase,
    Slice,
    Default,
    CustomFn,
}

/// Everything a handler may consult besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub functions: &'a FunctionRegistry,
}

impl<'a> TransformContext<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }
}

pub type TransformHandler = fn(Option<Value>, &Transform, &TransformContext<'_>) -> Option<Value>;

impl TransformKind {
    pub fn handler(self) -> TransformHandler {
        match self {
            TransformKind::Not => negate,
            TransformKind::EnumMap => enum_map,
            TransformKind::Coalesce => coalesce,
            TransformKind::RandomInt => random_int,
            TransformKind::Array => to_array,
            TransformKind::ToNumber => to_number,
            TransformKind::ToString => to_js_string,
            TransformKind::Pick => pick,
            TransformKind::Trim => trim,
            TransformKind::Lowercase => lowercase,
            TransformKind::Uppercase => uppercase,
            TransformKind::Slice => slice,
            TransformKind::Default => substitute_default,
            TransformKind::CustomFn => custom_fn,
        }
    }
}

impl Transform {
    pub fn kind(&self) -> TransformKind {
        match self {
            Transform::Not => TransformKind::Not,
            Transform::EnumMap { .. } => TransformKind::EnumMap,
            Transform::Coalesce => TransformKind::Coalesce,
            Transform::RandomInt { .. } => TransformKind::RandomInt,
            Transform::Array => TransformKind::Array,
            Transform::ToNumber => TransformKind::ToNumber,
            Transform::ToString => TransformKind::ToString,
            Transform::Pick { .. } => TransformKind::Pick,
            Transform::Trim => TransformKind::Trim,
            Transform::Lowercase => TransformKind::Lowercase,
            Transform::Uppercase => TransformKind::Uppercase,
            Transform::Slice { .. } => TransformKind::Slice,
            Transform::Default { .. } => TransformKind::Default,
            Transform::CustomFn { .. } => TransformKind::CustomFn,
        }
    }

    pub fn apply(&self, value: Option<Value>, ctx: &TransformContext<'_>) -> Option<Value> {
        (self.kind().handler())(value, self, ctx)
    }

    pub fn default_value(value: impl Into<Value>) -> Self {
        Transform::Default {
            value: value.into(),
        }
    }

    pub fn custom_fn(name: impl Into<String>) -> Self {
        Transform::CustomFn { name: name.into() }
    }
}

/// Fold `transforms` left to right over `value`.
pub fn apply_transforms(
    value: Option<Value>,
    transforms: &[Transform],
    ctx: &TransformContext<'_>,
) -> Option<Value> {
    transforms
        .iter()
        .fold(value, |current, transform| transform.apply(current, ctx))
}

fn negate(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    Some(Value::Bool(!is_truthy(value.as_ref())))
}

fn enum_map(value: Option<Value>, op: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    let Transform::EnumMap { map, default } = op else {
        return value;
    };
    map.get(&js_string(value.as_ref()))
        .cloned()
        .or_else(|| default.clone())
}

fn coalesce(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .find(|item| !is_empty_value(Some(item))),
        other => other,
    }
}

fn random_int(_: Option<Value>, op: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    let (min, max) = match op {
        Transform::RandomInt { min, max } => (*min, *max),
        _ => (default_random_min(), default_random_max()),
    };
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    Some(Value::from(rand::thread_rng().gen_range(low..=high)))
}

fn to_array(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    match value {
        None => Some(Value::Array(Vec::new())),
        Some(Value::Array(items)) => Some(Value::Array(items)),
        Some(other) => Some(Value::Array(vec![other])),
    }
}

fn to_number(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    match value? {
        Value::Bool(b) => Some(Value::from(u8::from(b))),
        Value::Number(n) if n.is_f64() => n.as_f64().and_then(number_value),
        Value::Number(n) => Some(Value::Number(n)),
        Value::String(s) => parse_number(&s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn to_js_string(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    let rendered = match value? {
        Value::Null => return Some(Value::Null),
        Value::String(s) => s,
        Value::Number(n) => format_number(&n),
        Value::Object(map) => Value::Object(map).to_string(),
        other => js_string(Some(&other)),
    };
    Some(Value::String(rendered))
}

fn pick(value: Option<Value>, op: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    let index = match op {
        Transform::Pick { index } => *index,
        _ => 0,
    };
    match value {
        Some(Value::Array(items)) => usize::try_from(index)
            .ok()
            .and_then(|i| items.into_iter().nth(i)),
        other => other,
    }
}

fn map_string(value: Option<Value>, f: impl FnOnce(&str) -> String) -> Option<Value> {
    match value {
        Some(Value::String(s)) => Some(Value::String(f(&s))),
        other => other,
    }
}

fn trim(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    map_string(value, |s| s.trim().to_string())
}

fn lowercase(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    map_string(value, str::to_lowercase)
}

fn uppercase(value: Option<Value>, _: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    map_string(value, str::to_uppercase)
}

/// Resolve a possibly negative slice bound against `len`.
fn slice_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if bound < 0 { len + bound } else { bound };
    resolved.clamp(0, len) as usize
}

fn slice(value: Option<Value>, op: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    let Transform::Slice { start, end } = op else {
        return value;
    };
    match value {
        Some(Value::Array(items)) => {
            let len = items.len();
            let from = start.map_or(0, |s| slice_bound(s, len));
            let to = end.map_or(len, |e| slice_bound(e, len));
            let picked = if from < to {
                items[from..to].to_vec()
            } else {
                Vec::new()
            };
            Some(Value::Array(picked))
        }
        other => other,
    }
}

fn substitute_default(value: Option<Value>, op: &Transform, _: &TransformContext<'_>) -> Option<Value> {
    match op {
        Transform::Default { value: fallback } if is_empty_value(value.as_ref()) => {
            Some(fallback.clone())
        }
        _ => value,
    }
}

fn custom_fn(value: Option<Value>, op: &Transform, ctx: &TransformContext<'_>) -> Option<Value> {
    let Transform::CustomFn { name } = op else {
        return value;
    };
    let Some(func) = ctx.functions.get(name) else {
        tracing::warn!(function = %name, "Unknown custom mapping function, passing value through");
        return value;
    };
    match func(value.as_ref()) {
        Ok(mapped) => mapped,
        Err(e) => {
            tracing::warn!(function = %name, error = %e, "Custom mapping function failed, passing value through");
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CustomFnError;
    use serde_json::json;

    fn run(value: Option<Value>, transforms: &[Transform]) -> Option<Value> {
        let functions = FunctionRegistry::with_builtins();
        apply_transforms(value, transforms, &TransformContext::new(&functions))
    }

    fn ops(raw: Value) -> Vec<Transform> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_deserialize_ops() {
        let parsed = ops(json!([
            {"op": "toNumber"},
            {"op": "default", "value": 1024},
            {"op": "enumMap", "map": {"square": "1:1"}, "default": null},
            {"op": "randomInt"},
            {"op": "customFn", "fn": "splitLines"}
        ]));
        assert_eq!(parsed[0], Transform::ToNumber);
        assert_eq!(parsed[1], Transform::default_value(1024));
        assert_eq!(
            parsed[2],
            Transform::EnumMap {
                map: json!({"square": "1:1"}).as_object().unwrap().clone(),
                default: Some(Value::Null),
            }
        );
        assert_eq!(
            parsed[3],
            Transform::RandomInt {
                min: 1,
                max: 2_147_483_647
            }
        );
        assert_eq!(parsed[4], Transform::custom_fn("splitLines"));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let parsed: Result<Vec<Transform>, _> = serde_json::from_value(json!([{"op": "explode"}]));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_to_number_never_yields_nan() {
        for raw in [json!(""), json!("   "), json!("abc"), Value::Null, json!({})] {
            assert_eq!(run(Some(raw.clone()), &[Transform::ToNumber]), None, "{raw}");
        }
        assert_eq!(run(None, &[Transform::ToNumber]), None);
        assert_eq!(run(Some(json!("512")), &[Transform::ToNumber]), Some(json!(512)));
        assert_eq!(run(Some(json!("7.5")), &[Transform::ToNumber]), Some(json!(7.5)));
        assert_eq!(run(Some(json!(true)), &[Transform::ToNumber]), Some(json!(1)));
        assert_eq!(run(Some(json!(4.0)), &[Transform::ToNumber]), Some(json!(4)));
    }

    #[test]
    fn test_enum_map() {
        let pipeline = ops(json!([{"op": "enumMap", "map": {"square": "square_hd", "16:9": "landscape_16_9", "true": "yes"}, "default": "square"}]));
        assert_eq!(run(Some(json!("16:9")), &pipeline), Some(json!("landscape_16_9")));
        assert_eq!(run(Some(json!(true)), &pipeline), Some(json!("yes")));
        assert_eq!(run(Some(json!("weird")), &pipeline), Some(json!("square")));

        let no_default = ops(json!([{"op": "enumMap", "map": {"a": 1}}]));
        assert_eq!(run(Some(json!("b")), &no_default), None);
    }

    #[test]
    fn test_coalesce() {
        let value = Some(json!([null, "  ", [], "v", "w"]));
        assert_eq!(run(value, &[Transform::Coalesce]), Some(json!("v")));
        assert_eq!(run(Some(json!([null, ""])), &[Transform::Coalesce]), None);
        assert_eq!(run(Some(json!("solo")), &[Transform::Coalesce]), Some(json!("solo")));
    }

    #[test]
    fn test_random_int_bounds() {
        let pipeline = [Transform::RandomInt { min: 3, max: 5 }];
        for _ in 0..50 {
            let n = run(None, &pipeline).and_then(|v| v.as_i64()).unwrap();
            assert!((3..=5).contains(&n));
        }
        let fixed = [Transform::RandomInt { min: 9, max: 9 }];
        assert_eq!(run(Some(json!("seed")), &fixed), Some(json!(9)));

        let reversed = [Transform::RandomInt { min: 5, max: 3 }];
        let n = run(None, &reversed).and_then(|v| v.as_i64()).unwrap();
        assert!((3..=5).contains(&n));
    }

    #[test]
    fn test_array_wrapping() {
        assert_eq!(run(None, &[Transform::Array]), Some(json!([])));
        assert_eq!(run(Some(json!([1, 2])), &[Transform::Array]), Some(json!([1, 2])));
        assert_eq!(run(Some(json!("url")), &[Transform::Array]), Some(json!(["url"])));
        assert_eq!(run(Some(Value::Null), &[Transform::Array]), Some(json!([null])));
    }

    #[test]
    fn test_to_string() {
        assert_eq!(run(Some(json!(512)), &[Transform::ToString]), Some(json!("512")));
        assert_eq!(run(Some(json!(false)), &[Transform::ToString]), Some(json!("false")));
        assert_eq!(run(Some(json!(["a", 1])), &[Transform::ToString]), Some(json!("a,1")));
        assert_eq!(run(Some(json!({"k": 1})), &[Transform::ToString]), Some(json!(r#"{"k":1}"#)));
        assert_eq!(run(None, &[Transform::ToString]), None);
    }

    #[test]
    fn test_pick_and_slice() {
        let items = Some(json!(["a", "b", "c", "d"]));
        assert_eq!(run(items.clone(), &[Transform::Pick { index: 0 }]), Some(json!("a")));
        assert_eq!(run(items.clone(), &[Transform::Pick { index: 9 }]), None);
        assert_eq!(run(Some(json!("a")), &[Transform::Pick { index: 0 }]), Some(json!("a")));

        let tail = ops(json!([{"op": "slice", "start": -2}]));
        assert_eq!(run(items.clone(), &tail), Some(json!(["c", "d"])));

        let head = ops(json!([{"op": "slice", "end": 1}]));
        assert_eq!(run(items.clone(), &head), Some(json!(["a"])));

        let inverted = ops(json!([{"op": "slice", "start": 3, "end": 1}]));
        assert_eq!(run(items, &inverted), Some(json!([])));
    }

    #[test]
    fn test_string_ops_ignore_non_strings() {
        assert_eq!(run(Some(json!("  Cat ")), &[Transform::Trim, Transform::Uppercase]), Some(json!("CAT")));
        assert_eq!(run(Some(json!("MiXeD")), &[Transform::Lowercase]), Some(json!("mixed")));
        assert_eq!(run(Some(json!(5)), &[Transform::Trim, Transform::Lowercase]), Some(json!(5)));
        assert_eq!(run(None, &[Transform::Uppercase]), None);
    }

    #[test]
    fn test_default_substitution() {
        let pipeline = [Transform::default_value("fallback")];
        assert_eq!(run(None, &pipeline), Some(json!("fallback")));
        assert_eq!(run(Some(Value::Null), &pipeline), Some(json!("fallback")));
        assert_eq!(run(Some(json!(" ")), &pipeline), Some(json!("fallback")));
        assert_eq!(run(Some(json!([])), &pipeline), Some(json!("fallback")));
        assert_eq!(run(Some(json!(0)), &pipeline), Some(json!(0)));
        assert_eq!(run(Some(json!(false)), &pipeline), Some(json!(false)));
    }

    #[test]
    fn test_not() {
        assert_eq!(run(Some(json!(true)), &[Transform::Not]), Some(json!(false)));
        assert_eq!(run(None, &[Transform::Not]), Some(json!(true)));
        assert_eq!(run(Some(json!("x")), &[Transform::Not, Transform::Not]), Some(json!(true)));
    }

    #[test]
    fn test_custom_fn_fallbacks() {
        fn failing(_: Option<&Value>) -> Result<Option<Value>, CustomFnError> {
            Err(CustomFnError::new("boom"))
        }

        let mut functions = FunctionRegistry::new();
        functions.register("failing", failing);
        let ctx = TransformContext::new(&functions);

        let unknown = [Transform::custom_fn("doesNotExist")];
        assert_eq!(apply_transforms(Some(json!("raw")), &unknown, &ctx), Some(json!("raw")));

        let failing = [Transform::custom_fn("failing")];
        assert_eq!(apply_transforms(Some(json!("raw")), &failing, &ctx), Some(json!("raw")));
    }

    #[test]
    fn test_coalesce_to_number_default_chain() {
        let pipeline = ops(json!([
            {"op": "coalesce"},
            {"op": "toNumber"},
            {"op": "default", "value": 4}
        ]));
        assert_eq!(run(Some(json!([null, "", "abc"])), &pipeline), Some(json!(4)));
        assert_eq!(run(Some(json!([null, "2"])), &pipeline), Some(json!(2)));
    }

    #[test]
    fn test_kind_dispatch_covers_variants() {
        assert_eq!(Transform::Trim.kind(), TransformKind::Trim);
        assert_eq!(Transform::custom_fn("x").kind(), TransformKind::CustomFn);
        assert_eq!(Transform::Slice { start: None, end: None }.kind(), TransformKind::Slice);
    }
}
