//! Format string compilation
//!
//! A format string is literal text ("fluff") interleaved with codes of the
//! shape `{parent_id-sub_id-display}`. Compiling splits it into slots and
//! fluff: there is always exactly one more fluff segment than slots, so
//! `"{2-1-i}/{3-3-i}"` has fluff `["", "/", ""]`.
//!
//! A brace pair that does not parse as a code still occupies a slot. It
//! renders as a placeholder and makes the format unreadable in reverse.

use almanac_core::{CalendarError, TimeUnitId};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// How a code renders its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    /// 1-based position as a number
    Iteration,
    /// Instance name from the parent unit
    Name,
}

impl DisplayKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "i" | "iter" | "iteration" => Some(Self::Iteration),
            "n" | "name" => Some(Self::Name),
            _ => None,
        }
    }
}

/// A `{parent-sub-display}` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub parent: TimeUnitId,
    pub sub: TimeUnitId,
    pub display: DisplayKind,
}

impl Code {
    /// `parent == sub`: an unscaled iteration, not a position inside a container
    pub fn is_absolute(&self) -> bool {
        self.parent == self.sub
    }
}

impl FromStr for Code {
    type Err = CalendarError;

    /// Parses the text between the braces
    fn from_str(inner: &str) -> Result<Self, Self::Err> {
        let malformed = || CalendarError::MalformedCode(format!("{{{}}}", inner));
        let parts: Vec<&str> = inner.split('-').map(str::trim).collect();
        let [parent, sub, display] = parts.as_slice() else {
            return Err(malformed());
        };
        Ok(Code {
            parent: parent.parse().map_err(|_| malformed())?,
            sub: sub.parse().map_err(|_| malformed())?,
            display: DisplayKind::parse(display).ok_or_else(malformed)?,
        })
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display = match self.display {
            DisplayKind::Iteration => "i",
            DisplayKind::Name => "n",
        };
        write!(f, "{{{}-{}-{}}}", self.parent, self.sub, display)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Code(Code),
    /// The raw brace text of a code that did not parse
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormat {
    fluff: Vec<String>,
    slots: Vec<Slot>,
}

impl CompiledFormat {
    pub fn compile(format_string: &str) -> Result<Self, CalendarError> {
        let mut fluff = Vec::new();
        let mut slots = Vec::new();
        let mut last = 0;
        for m in cached_regex(r"\{[^{}]*\}")?.find_iter(format_string) {
            fluff.push(format_string[last..m.start()].to_string());
            let raw = m.as_str();
            slots.push(match raw[1..raw.len() - 1].parse::<Code>() {
                Ok(code) => Slot::Code(code),
                Err(_) => Slot::Malformed(raw.to_string()),
            });
            last = m.end();
        }
        fluff.push(format_string[last..].to_string());
        Ok(Self { fluff, slots })
    }

    pub fn fluff(&self) -> &[String] {
        &self.fluff
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn codes(&self) -> impl Iterator<Item = &Code> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Code(code) => Some(code),
            Slot::Malformed(_) => None,
        })
    }

    pub fn malformed(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Malformed(raw) => Some(raw.as_str()),
            Slot::Code(_) => None,
        })
    }

    /// Non-empty fluff segments; more literal text means a more specific format
    pub fn specificity(&self) -> usize {
        self.fluff.iter().filter(|f| !f.is_empty()).count()
    }

    /// Splice one rendered value per slot back between the fluff
    pub(crate) fn assemble(&self, values: &[String]) -> String {
        let mut out = String::new();
        for (i, fluff) in self.fluff.iter().enumerate() {
            out.push_str(fluff);
            if let Some(value) = values.get(i) {
                out.push_str(value);
            }
        }
        out
    }

    /// Anchored pattern with each slot wildcarded, captured when `capture` is set
    fn pattern(&self, capture: bool) -> String {
        let wildcard = if capture { "(.+?)" } else { ".+" };
        let mut pattern = String::from("^");
        for (i, fluff) in self.fluff.iter().enumerate() {
            if i > 0 {
                pattern.push_str(wildcard);
            }
            pattern.push_str(&regex::escape(fluff));
        }
        pattern.push('$');
        pattern
    }

    /// Whether this format could have produced `date`, judged by its fluff alone
    pub fn could_produce(&self, date: &str) -> Result<bool, CalendarError> {
        Ok(cached_regex(&self.pattern(false))?.is_match(date))
    }

    /// Split `date` on the fluff, one substring per slot
    pub fn values_of(&self, date: &str) -> Result<Vec<String>, CalendarError> {
        let re = cached_regex(&self.pattern(true))?;
        let caps = re
            .captures(date)
            .ok_or_else(|| CalendarError::unparseable(date, "literal text does not match the format"))?;
        Ok(caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect())
    }

    /// Walk every way of splitting `date` on the fluff until `visit` breaks
    ///
    /// Values are never empty. Splits come shortest-first per slot, so the
    /// first one is the split `values_of` returns. Fluff can reappear inside
    /// a value (`"Month 4"` under `"{3-2-n} {2-1-i}"`), which is why a reader
    /// may need more than the first split.
    pub fn find_split<T, F>(&self, date: &str, mut visit: F) -> Option<T>
    where
        F: FnMut(&[&str]) -> ControlFlow<T>,
    {
        let (first, rest) = self.fluff.split_first()?;
        let body = date.strip_prefix(first.as_str())?;
        let mut values = Vec::with_capacity(self.slots.len());
        match split_rest(body, rest, &mut values, &mut visit) {
            ControlFlow::Break(found) => Some(found),
            ControlFlow::Continue(()) => None,
        }
    }

    /// Fluff differs from every other format's fluff
    ///
    /// Only literal text is compared; two formats whose codes could never
    /// produce overlapping values still count as indistinguishable.
    pub fn is_differentiable<'a, I>(&self, others: I) -> bool
    where
        I: IntoIterator<Item = &'a CompiledFormat>,
    {
        others.into_iter().all(|other| other.fluff != self.fluff)
    }
}

/// Each remaining fluff segment follows one value
fn split_rest<'d, T, F>(rest: &'d str, fluff: &[String], values: &mut Vec<&'d str>, visit: &mut F) -> ControlFlow<T>
where
    F: FnMut(&[&str]) -> ControlFlow<T>,
{
    let Some((next, after)) = fluff.split_first() else {
        return if rest.is_empty() { visit(values) } else { ControlFlow::Continue(()) };
    };
    for end in (1..=rest.len()).filter(|&end| rest.is_char_boundary(end)) {
        let Some(tail) = rest[end..].strip_prefix(next.as_str()) else {
            continue;
        };
        values.push(&rest[..end]);
        let flow = split_rest(tail, after, values, visit);
        values.pop();
        if flow.is_break() {
            return flow;
        }
    }
    ControlFlow::Continue(())
}

// ========== Regex Cache ==========

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, Regex>> {
    REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Get or compile a pattern; format patterns repeat across calls
fn cached_regex(pattern: &str) -> Result<Regex, CalendarError> {
    if let Ok(read_guard) = get_cache().read() {
        if let Some(re) = read_guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let re = Regex::new(pattern)
        .map_err(|e| CalendarError::MalformedCode(format!("pattern '{}': {}", pattern, e)))?;

    if let Ok(mut write_guard) = get_cache().write() {
        write_guard.insert(pattern.to_string(), re.clone());
    }
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(parent: u64, sub: u64, display: DisplayKind) -> Slot {
        Slot::Code(Code {
            parent: TimeUnitId::new(parent),
            sub: TimeUnitId::new(sub),
            display,
        })
    }

    #[test]
    fn test_compile_splits_fluff_and_codes() {
        let f = CompiledFormat::compile("{3-2-n} {2-1-iter}, {3-3-iteration}").unwrap();
        assert_eq!(f.fluff(), &["", " ", ", ", ""]);
        assert_eq!(
            f.slots(),
            &[
                code(3, 2, DisplayKind::Name),
                code(2, 1, DisplayKind::Iteration),
                code(3, 3, DisplayKind::Iteration),
            ]
        );
        assert_eq!(f.specificity(), 2);
    }

    #[test]
    fn test_compile_without_codes() {
        let f = CompiledFormat::compile("Midwinter").unwrap();
        assert_eq!(f.fluff(), &["Midwinter"]);
        assert!(f.slots().is_empty());
        assert!(f.could_produce("Midwinter").unwrap());
        assert_eq!(f.values_of("Midwinter").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_malformed_codes_keep_their_slot() {
        let f = CompiledFormat::compile("{2-1}/{x-1-i}/{2-1-q}/{3-3-n}").unwrap();
        assert_eq!(f.slots().len(), 4);
        assert_eq!(f.malformed().collect::<Vec<_>>(), vec!["{2-1}", "{x-1-i}", "{2-1-q}"]);
        assert_eq!(f.codes().count(), 1);
        assert_eq!(f.fluff(), &["", "/", "/", "/", ""]);
    }

    #[test]
    fn test_stray_braces_are_fluff() {
        let f = CompiledFormat::compile("{ {2-1-i} }").unwrap();
        assert_eq!(f.fluff(), &["{ ", " }"]);
        assert_eq!(f.codes().count(), 1);
    }

    #[test]
    fn test_code_display_round_trip() {
        let code: Code = "3-2-name".parse().unwrap();
        assert_eq!(code.to_string(), "{3-2-n}");
        assert!(!code.is_absolute());
        assert!("3-3-i".parse::<Code>().unwrap().is_absolute());
        assert_eq!(
            "3-2".parse::<Code>(),
            Err(CalendarError::MalformedCode("{3-2}".to_string()))
        );
    }

    #[test]
    fn test_assemble_with_empty_edges() {
        let f = CompiledFormat::compile("{2-1-i}{3-3-i}").unwrap();
        assert_eq!(f.fluff(), &["", "", ""]);
        assert_eq!(f.assemble(&["4".to_string(), "1".to_string()]), "41");

        let f = CompiledFormat::compile("/{2-1-i}/").unwrap();
        assert_eq!(f.assemble(&["4".to_string()]), "/4/");
    }

    #[test]
    fn test_values_of() {
        let f = CompiledFormat::compile("{3-2-i}/{2-1-i}/{3-3-i}").unwrap();
        assert_eq!(f.values_of("4/10/1").unwrap(), vec!["4", "10", "1"]);
        let f = CompiledFormat::compile("/{3-2-n}/{2-1-i}/{3-3-i}/").unwrap();
        assert_eq!(f.values_of("/April/10/1/").unwrap(), vec!["April", "10", "1"]);
        assert!(matches!(
            f.values_of("April/10/1"),
            Err(CalendarError::UnparseableDate { .. })
        ));
    }

    #[test]
    fn test_fluff_with_regex_metacharacters() {
        let f = CompiledFormat::compile("({2-1-i}.{3-3-i})*").unwrap();
        assert!(f.could_produce("(4.1)*").unwrap());
        assert!(!f.could_produce("(4x1)*").unwrap());
        assert_eq!(f.values_of("(4.1)*").unwrap(), vec!["4", "1"]);
    }

    fn all_splits(f: &CompiledFormat, date: &str) -> Vec<Vec<String>> {
        let mut splits = Vec::new();
        f.find_split(date, |values| {
            splits.push(values.iter().map(|v| v.to_string()).collect());
            ControlFlow::<()>::Continue(())
        });
        splits
    }

    #[test]
    fn test_splits_where_fluff_repeats_inside_values() {
        let f = CompiledFormat::compile("{3-2-n} {2-1-i}, {3-3-i}").unwrap();
        assert_eq!(
            all_splits(&f, "Month 4 10, 1"),
            vec![vec!["Month", "4 10", "1"], vec!["Month 4", "10", "1"]]
        );
        assert_eq!(all_splits(&f, "April 10, 1"), vec![vec!["April", "10", "1"]]);
        assert_eq!(f.values_of("Month 4 10, 1").unwrap(), all_splits(&f, "Month 4 10, 1")[0]);
    }

    #[test]
    fn test_find_split_stops_early() {
        let f = CompiledFormat::compile("{3-2-n} {2-1-i}, {3-3-i}").unwrap();
        let day = f.find_split("Month 4 10, 1", |values| match values[1].parse::<i64>() {
            Ok(day) => ControlFlow::Break(day),
            Err(_) => ControlFlow::Continue(()),
        });
        assert_eq!(day, Some(10));
    }

    #[test]
    fn test_no_split_without_matching_fluff() {
        let f = CompiledFormat::compile("/{2-1-i}/{3-3-i}/").unwrap();
        assert!(all_splits(&f, "4/1").is_empty());
        assert!(all_splits(&f, "//1/").is_empty());
        assert_eq!(all_splits(&f, "/4/1/"), vec![vec!["4", "1"]]);

        let f = CompiledFormat::compile("Midwinter").unwrap();
        assert_eq!(all_splits(&f, "Midwinter"), vec![Vec::<String>::new()]);
        assert!(all_splits(&f, "Midwinter!").is_empty());
    }

    #[test]
    fn test_is_differentiable() {
        let slashes = CompiledFormat::compile("{3-2-i}/{2-1-i}/{3-3-i}").unwrap();
        let swapped = CompiledFormat::compile("{2-1-i}/{3-2-i}/{3-3-i}").unwrap();
        let dashes = CompiledFormat::compile("{2-1-i}-{3-2-i}-{3-3-i}").unwrap();
        assert!(slashes.is_differentiable([&dashes]));
        assert!(!slashes.is_differentiable([&swapped]));
        assert!(!slashes.is_differentiable([&dashes, &swapped]));
        assert!(slashes.is_differentiable(std::iter::empty()));
    }
}
