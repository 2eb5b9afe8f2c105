//! Direction-aware inclusive numeric ranges parsed from `from..to` specs.
//!
//! A range drives repeated template execution: one pass per in-range value,
//! with the value injected into the value tree at a configured path before
//! each pass. The all-zero range is the distinguished "undefined" state,
//! meaning exactly one execution with no loop variable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::values::{self, ValueTree};

static NUM_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?[0-9]+)\.\.(-?[0-9]+)$").expect("valid range regex"));

/// Inclusive integer iteration bound with a stepping direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumRange {
    pub from: i64,
    pub to: i64,
    pub step: i64,
}

impl NumRange {
    /// Creates a range from `from` to `to` inclusive, inferring the step
    /// direction from the endpoints.
    pub fn new(from: i64, to: i64) -> Self {
        let step = if to < from { -1 } else { 1 };
        Self { from, to, step }
    }

    /// Parses the textual form `<int>..<int>`, integers optionally signed.
    ///
    /// An empty spec yields the undefined range. Anything else that does
    /// not match fails with [`Error::InvalidNumberRange`], echoing the
    /// offending input.
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.is_empty() {
            return Ok(Self::default());
        }
        let caps = NUM_RANGE_RE
            .captures(spec)
            .ok_or_else(|| Error::InvalidNumberRange(spec.to_string()))?;
        let from: i64 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidNumberRange(spec.to_string()))?;
        let to: i64 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidNumberRange(spec.to_string()))?;
        Ok(Self::new(from, to))
    }

    /// True for the distinguished no-iteration state
    pub fn undefined(&self) -> bool {
        self.from == 0 && self.to == 0 && self.step == 0
    }

    /// Membership test; both endpoints are inclusive
    pub fn in_range(&self, n: i64) -> bool {
        if self.step < 0 {
            self.to <= n && n <= self.from
        } else {
            self.from <= n && n <= self.to
        }
    }

    /// Iterates from `from` by `step` while values stay in range.
    ///
    /// The undefined range yields nothing. An overflowing step terminates
    /// iteration.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let range = *self;
        let mut next = if range.step == 0 { None } else { Some(range.from) };
        std::iter::from_fn(move || {
            let n = next?;
            if !range.in_range(n) {
                next = None;
                return None;
            }
            next = n.checked_add(range.step);
            Some(n)
        })
    }
}

/// A parsed `variablePath=from..to` iteration request
#[derive(Debug, Clone, Default)]
pub struct RangeSpec {
    pub var_path: String,
    pub range: NumRange,
}

impl RangeSpec {
    /// Parses a `variablePath=from..to` spec, split on the first `=`.
    ///
    /// An empty spec means no iteration. A spec without `=`, or with an
    /// empty variable path in front of a defined range, is invalid.
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.is_empty() {
            return Ok(Self::default());
        }
        let (var_path, range_spec) = spec
            .split_once('=')
            .ok_or_else(|| Error::InvalidNumberRange(spec.to_string()))?;
        let range = NumRange::parse(range_spec)?;
        if var_path.is_empty() && !range.undefined() {
            return Err(Error::InvalidNumberRange(spec.to_string()));
        }
        Ok(Self {
            var_path: var_path.to_string(),
            range,
        })
    }

    /// Drives `body` once per range value, injecting the value into `tree`
    /// at the variable path before each call.
    ///
    /// With an undefined range, `body` runs exactly once and the tree is
    /// left untouched. The first error from `body` stops iteration and
    /// propagates immediately.
    pub fn drive<F>(&self, tree: &mut ValueTree, mut body: F) -> Result<()>
    where
        F: FnMut(&ValueTree) -> Result<()>,
    {
        if self.range.undefined() {
            return body(tree);
        }
        for n in self.range.iter() {
            values::insert_path(&self.var_path, Value::from(n), tree)?;
            body(tree)?;
        }
        Ok(())
    }
}
