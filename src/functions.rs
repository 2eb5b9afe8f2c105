//! Template function library registered into every composed template.
//!
//! These extend the host template language with capabilities it lacks
//! natively: ranged sequence generation, indexed enumeration, absolute
//! value across numeric kinds, ad hoc string template evaluation and its
//! sequence-mapping form. All take Tera's named-argument convention.

use std::collections::HashMap;

use serde_json::{Value, json};
use tera::{Context, Tera};

use crate::range::NumRange;

/// Registers the full library on a Tera instance.
pub fn register_all(tera: &mut Tera) {
    tera.register_function("seq", seq);
    tera.register_function("enumerate", enumerate);
    tera.register_function("abs", abs);
    tera.register_function("tpl", tpl);
    tera.register_function("tplMap", tpl_map);
}

/// Builds the Tera context an arbitrary data value renders against.
///
/// Objects become the context directly; null (or absent) data renders with
/// an empty context; any other value is bound to the name `value`.
pub(crate) fn context_for(data: &Value) -> tera::Result<Context> {
    match data {
        Value::Null => Ok(Context::new()),
        Value::Object(_) => Context::from_value(data.clone()),
        other => {
            let mut context = Context::new();
            context.insert("value", other);
            Ok(context)
        }
    }
}

/// Renders `template` as an independent one-shot template against `data`.
pub(crate) fn render_one_off(template: &str, data: &Value) -> tera::Result<String> {
    let context = context_for(data)?;
    Tera::one_off(template, &context, false)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn missing(fn_name: &str, arg: &str) -> tera::Error {
    tera::Error::msg(format!("{fn_name}: missing required argument `{arg}`"))
}

fn bad_type(fn_name: &str, arg: &str, value: &Value, wanted: &str) -> tera::Error {
    tera::Error::msg(format!(
        "{fn_name}: bad type for `{arg}`: got {}, wanted {wanted}",
        type_name(value)
    ))
}

/// Accepts any integral JSON number, including integral floats produced by
/// template arithmetic.
fn as_int(value: &Value) -> Option<i64> {
    let number = value.as_number()?;
    if let Some(i) = number.as_i64() {
        return Some(i);
    }
    if let Some(u) = number.as_u64() {
        return i64::try_from(u).ok();
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Some(f as i64)
        }
        _ => None,
    }
}

fn opt_int_arg(
    args: &HashMap<String, Value>,
    fn_name: &str,
    arg: &str,
) -> tera::Result<Option<i64>> {
    match args.get(arg) {
        None => Ok(None),
        Some(value) => as_int(value)
            .map(Some)
            .ok_or_else(|| bad_type(fn_name, arg, value, "integer")),
    }
}

fn str_arg(args: &HashMap<String, Value>, fn_name: &str, arg: &str) -> tera::Result<String> {
    let value = args.get(arg).ok_or_else(|| missing(fn_name, arg))?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| bad_type(fn_name, arg, value, "string"))
}

/// `seq(to=…)`, `seq(from=…, to=…)` or `seq(from=…, to=…, step=…)`.
///
/// Generates the inclusive integer sequence. `to` alone counts up from 0
/// in steps of 1 (empty for a negative `to`); with `from` given the
/// direction is inferred from the endpoints; an explicit step is taken as
/// given (zero is rejected).
fn seq(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let to = opt_int_arg(args, "seq", "to")?.ok_or_else(|| missing("seq", "to"))?;
    let from = opt_int_arg(args, "seq", "from")?;
    let range = match (from, opt_int_arg(args, "seq", "step")?) {
        (None, None) => NumRange { from: 0, to, step: 1 },
        (Some(from), None) => NumRange::new(from, to),
        (_, Some(0)) => return Err(tera::Error::msg("seq: step must not be zero")),
        (from, Some(step)) => NumRange {
            from: from.unwrap_or(0),
            to,
            step,
        },
    };
    Ok(Value::from(range.iter().collect::<Vec<i64>>()))
}

/// `enumerate(items=…)`: array of `{index, value}` objects, index from 0.
fn enumerate(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let items = args.get("items").ok_or_else(|| missing("enumerate", "items"))?;
    let array = items
        .as_array()
        .ok_or_else(|| bad_type("enumerate", "items", items, "array"))?;
    let enumerated: Vec<Value> = array
        .iter()
        .enumerate()
        .map(|(index, value)| json!({ "index": index, "value": value }))
        .collect();
    Ok(Value::Array(enumerated))
}

/// `abs(value=…)`: absolute value across integer and float kinds.
fn abs(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let value = args.get("value").ok_or_else(|| missing("abs", "value"))?;
    let number = value
        .as_number()
        .ok_or_else(|| bad_type("abs", "value", value, "number"))?;
    if let Some(i) = number.as_i64() {
        let absolute = i
            .checked_abs()
            .ok_or_else(|| tera::Error::msg("abs: integer overflow"))?;
        return Ok(Value::from(absolute));
    }
    if let Some(u) = number.as_u64() {
        return Ok(Value::from(u));
    }
    match number.as_f64() {
        Some(f) if f < 0.0 => Ok(Value::from(-f)),
        Some(f) => Ok(Value::from(f)),
        None => Err(bad_type("abs", "value", value, "number")),
    }
}

/// `tpl(template=…, data=…)`: parses and renders an ad hoc template.
fn tpl(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let template = str_arg(args, "tpl", "template")?;
    let data = args.get("data").cloned().unwrap_or(Value::Null);
    render_one_off(&template, &data).map(Value::String)
}

/// `tplMap(template=…, items=…)`: applies `tpl` to every element in order.
///
/// The first render error aborts and propagates, discarding partial
/// results.
fn tpl_map(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let template = str_arg(args, "tplMap", "template")?;
    let items = args.get("items").ok_or_else(|| missing("tplMap", "items"))?;
    let array = items
        .as_array()
        .ok_or_else(|| bad_type("tplMap", "items", items, "array"))?;
    let mut rendered = Vec::with_capacity(array.len());
    for item in array {
        rendered.push(Value::String(render_one_off(&template, item)?));
    }
    Ok(Value::Array(rendered))
}
