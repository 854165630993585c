//! Validation engine
//!
//! Generated data types implement [`Validate`] by walking their fields in
//! declaration order and calling the `check_*` helpers below. The
//! [`ValidationContext`] tracks the path of the field currently being checked
//! so that the first failure can be reported as a single string such as
//! `others.1.theField.2: value not in (100, 200)`.
//!
//! Validation stops at the first failure: every helper returns `false` after
//! recording the failure and generated code returns immediately.
//!
//! # Example
//!
//! ```
//! use trellis_common::validation::{check_int_range, validate_field, Validate, ValidationContext};
//!
//! struct Params {
//!     the_field: i32,
//! }
//!
//! impl Validate for Params {
//!     fn validate(&self, vc: &mut ValidationContext) -> bool {
//!         validate_field(vc, "theField", |vc| check_int_range(vc, self.the_field, Some(100), Some(999)))
//!     }
//! }
//!
//! let mut vc = ValidationContext::new();
//! assert!(!Params { the_field: 1000 }.validate(&mut vc));
//! assert_eq!(vc.error_details(), "theField: value > 999");
//! ```

use std::fmt::{Debug, Display};
use std::ops::Bound;
use std::sync::OnceLock;

use fancy_regex::Regex;

/// Implemented by every generated data type.
pub trait Validate {
    /// Returns `false` and records the failure in `vc` if any constraint fails.
    fn validate(&self, vc: &mut ValidationContext) -> bool;
}

/// Optional hook for semantic checks that cannot be declared in the schema.
///
/// Generated `validate` bodies call it last, only after every structural
/// check passed.
pub trait FurtherValidate {
    fn further_validate(&self, vc: &mut ValidationContext) -> bool;
}

impl Validate for () {
    fn validate(&self, _vc: &mut ValidationContext) -> bool {
        true
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        match self {
            Some(value) => value.validate(vc),
            None => true,
        }
    }
}

impl<T: Validate> Validate for Box<T> {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        (**self).validate(vc)
    }
}

/// Path-tracking accumulator for one top-level validation.
#[derive(Debug, Default)]
pub struct ValidationContext {
    path: Vec<String>,
    error_details: String,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a field name or element index onto the path.
    pub fn enter(&mut self, component: impl Into<String>) {
        self.path.push(component.into());
    }

    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// Records `details` prefixed with the current dot-joined path.
    pub fn set_error_details(&mut self, details: impl AsRef<str>) {
        let details = details.as_ref();
        self.error_details = if self.path.is_empty() {
            details.to_owned()
        } else {
            format!("{}: {}", self.path.join("."), details)
        };
    }

    pub fn error_details(&self) -> &str {
        &self.error_details
    }
}

/// Runs `check` with `name` pushed onto the path.
pub fn validate_field<F>(vc: &mut ValidationContext, name: &str, check: F) -> bool
where
    F: FnOnce(&mut ValidationContext) -> bool,
{
    vc.enter(name);
    if !check(vc) {
        return false;
    }
    vc.leave();
    true
}

/// Runs `check` on every element with its zero-based index pushed onto the path.
pub fn validate_each<T, F>(vc: &mut ValidationContext, items: &[T], mut check: F) -> bool
where
    F: FnMut(&mut ValidationContext, &T) -> bool,
{
    for (i, item) in items.iter().enumerate() {
        vc.enter(i.to_string());
        if !check(vc, item) {
            return false;
        }
        vc.leave();
    }
    true
}

/// Closed-interval check for integers.
pub fn check_int_range<T>(vc: &mut ValidationContext, value: T, min: Option<T>, max: Option<T>) -> bool
where
    T: PartialOrd + Display + Copy,
{
    if let Some(min) = min {
        if value < min {
            vc.set_error_details(format!("value < {}", min));
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            vc.set_error_details(format!("value > {}", max));
            return false;
        }
    }
    true
}

/// Range check for floats. `Included` bounds are closed, `Excluded` bounds are open.
pub fn check_float_range(vc: &mut ValidationContext, value: f64, min: Bound<f64>, max: Bound<f64>) -> bool {
    match min {
        Bound::Included(min) if value < min => {
            vc.set_error_details(format!("value < {}", min));
            return false;
        }
        Bound::Excluded(min) if value <= min => {
            vc.set_error_details(format!("value <= {}", min));
            return false;
        }
        _ => {}
    }
    match max {
        Bound::Included(max) if value > max => {
            vc.set_error_details(format!("value > {}", max));
            return false;
        }
        Bound::Excluded(max) if value >= max => {
            vc.set_error_details(format!("value >= {}", max));
            return false;
        }
        _ => {}
    }
    true
}

/// String length bounds, counted in bytes.
pub fn check_length(vc: &mut ValidationContext, value: &str, min: usize, max: Option<usize>) -> bool {
    check_len(vc, value.len(), min, max)
}

/// Element count bounds for repeated fields.
pub fn check_count<T>(vc: &mut ValidationContext, items: &[T], min: usize, max: Option<usize>) -> bool {
    check_len(vc, items.len(), min, max)
}

fn check_len(vc: &mut ValidationContext, len: usize, min: usize, max: Option<usize>) -> bool {
    if len < min {
        vc.set_error_details(format!("length < {}", min));
        return false;
    }
    if let Some(max) = max {
        if len > max {
            vc.set_error_details(format!("length > {}", max));
            return false;
        }
    }
    true
}

/// Enum membership. Members are rendered with `Debug`, so string members are quoted.
pub fn check_one_of<T>(vc: &mut ValidationContext, value: &T, allowed: &[T]) -> bool
where
    T: PartialEq + Debug,
{
    if allowed.contains(value) {
        return true;
    }
    let members = allowed
        .iter()
        .map(|member| format!("{:?}", member))
        .collect::<Vec<_>>()
        .join(", ");
    vc.set_error_details(format!("value not in ({})", members));
    false
}

/// Regular-expression match against the whole value.
pub fn check_pattern(vc: &mut ValidationContext, value: &str, pattern: &Pattern) -> bool {
    if pattern.is_match(value) {
        return true;
    }
    vc.set_error_details(format!("value not matched to {:?}", pattern.as_str()));
    false
}

/// A lazily compiled pattern, declared as a `static` by generated code.
///
/// The pattern must match the entire value.
pub struct Pattern {
    source: &'static str,
    regex: OnceLock<Option<Regex>>,
}

impl Pattern {
    pub const fn new(source: &'static str) -> Self {
        Self {
            source,
            regex: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        let regex = self.regex.get_or_init(|| {
            match Regex::new(&format!("^(?:{})$", self.source)) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    tracing::error!(pattern = self.source, error = %err, "invalid validation pattern");
                    None
                }
            }
        });
        match regex {
            Some(regex) => regex.is_match(value).unwrap_or(false),
            None => false,
        }
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}
