//! Argument extraction for calendar functions
//!
//! Ids and iterations arrive as integers (or numeric text from loosely typed
//! callers). An error value passed in as an argument is returned unchanged.

use almanac_core::{ErrorReport, Value};

use crate::ArgMeta;

/// Check arity against the function's argument metadata
pub fn check_arity(func: &str, args: &[Value], meta: &[ArgMeta]) -> Result<(), ErrorReport> {
    let required = ArgMeta::required_count(meta);
    if args.len() < required || args.len() > meta.len() {
        let expected = if args.len() < required { required } else { meta.len() };
        return Err(ErrorReport::arg_count(func, expected, args.len()));
    }
    Ok(())
}

/// Extract an integer argument
pub fn extract_int(func: &str, args: &[Value], index: usize, name: &str) -> Result<i64, ErrorReport> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| ErrorReport::arg_type(func, name, "Int", "Text")),
        Some(Value::Error(e)) => Err(e.clone()),
        Some(other) => Err(ErrorReport::arg_type(func, name, "Int", other.type_name())),
        None => Err(ErrorReport::arg_type(func, name, "Int", "nothing")),
    }
}

/// Extract an id argument of any id type
pub fn extract_id<T: From<u64>>(func: &str, args: &[Value], index: usize, name: &str) -> Result<T, ErrorReport> {
    let raw = extract_int(func, args, index, name)?;
    u64::try_from(raw)
        .map(T::from)
        .map_err(|_| ErrorReport::arg_type(func, name, "id", "negative Int"))
}

/// Extract an optional id; `Null` and a missing trailing argument both mean none
pub fn extract_optional_id<T: From<u64>>(
    func: &str,
    args: &[Value],
    index: usize,
    name: &str,
) -> Result<Option<T>, ErrorReport> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => extract_id(func, args, index, name).map(Some),
    }
}

pub fn extract_text<'a>(func: &str, args: &'a [Value], index: usize, name: &str) -> Result<&'a str, ErrorReport> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s),
        Some(Value::Error(e)) => Err(e.clone()),
        Some(other) => Err(ErrorReport::arg_type(func, name, "Text", other.type_name())),
        None => Err(ErrorReport::arg_type(func, name, "Text", "nothing")),
    }
}

pub fn extract_optional_bool(func: &str, args: &[Value], index: usize, name: &str) -> Result<bool, ErrorReport> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Error(e)) => Err(e.clone()),
        Some(other) => Err(ErrorReport::arg_type(func, name, "Bool", other.type_name())),
    }
}

/// Extract a list of integers, accepting a single integer as a one-item list
pub fn extract_int_list(func: &str, args: &[Value], index: usize, name: &str) -> Result<Vec<i64>, ErrorReport> {
    match args.get(index) {
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::Int(n) => Ok(*n),
                Value::Error(e) => Err(e.clone()),
                other => Err(ErrorReport::arg_type(func, name, "List of Int", other.type_name())),
            })
            .collect(),
        Some(Value::Int(n)) => Ok(vec![*n]),
        Some(Value::Error(e)) => Err(e.clone()),
        Some(other) => Err(ErrorReport::arg_type(func, name, "List", other.type_name())),
        None => Err(ErrorReport::arg_type(func, name, "List", "nothing")),
    }
}
