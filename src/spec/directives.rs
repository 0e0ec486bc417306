//! Inheritable directives (`x-specgate-controller`, `x-specgate-around`).
//!
//! Each scope of the document (root, path item, operation) may carry a
//! directive. A scope either leaves it alone, sets it, or clears it:
//!
//! | JSON at this scope      | Meaning               |
//! |-------------------------|-----------------------|
//! | key absent              | inherit from parent   |
//! | `null` or `""`          | clear (becomes unset) |
//! | non-empty string        | set                   |
//!
//! The effective value is computed root, then path item, then operation.

use serde_json::Value;

pub const CONTROLLER_KEY: &str = "x-specgate-controller";
pub const AROUND_KEY: &str = "x-specgate-around";

/// A directive as written at one scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Directive {
    #[default]
    Inherit,
    Clear,
    Set(String),
}

impl Directive {
    /// Read `key` from a scope object.
    ///
    /// Returns `Err` with a description when the value has an unusable type.
    pub fn read(scope: &Value, key: &str) -> Result<Self, String> {
        match scope.get(key) {
            None => Ok(Directive::Inherit),
            Some(Value::Null) => Ok(Directive::Clear),
            Some(Value::String(s)) if s.is_empty() => Ok(Directive::Clear),
            Some(Value::String(s)) => Ok(Directive::Set(s.clone())),
            Some(other) => Err(format!("{key} must be a string or null, got {other}")),
        }
    }

    /// Apply this scope's directive on top of the enclosing effective value.
    pub fn apply(&self, inherited: Option<String>) -> Option<String> {
        match self {
            Directive::Inherit => inherited,
            Directive::Clear => None,
            Directive::Set(v) => Some(v.clone()),
        }
    }
}

/// Effective directives for one scope after inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directives {
    pub controller: Option<String>,
    pub around: Option<String>,
}

impl Directives {
    /// Resolve the directives of `scope` on top of `self` (the parent scope).
    pub fn descend(&self, scope: &Value) -> Result<Directives, String> {
        let controller = Directive::read(scope, CONTROLLER_KEY)?;
        let around = Directive::read(scope, AROUND_KEY)?;
        Ok(Directives {
            controller: controller.apply(self.controller.clone()),
            around: around.apply(self.around.clone()),
        })
    }
}

/// Resolve the effective directives for an operation from its ancestry.
pub fn resolve(root: &Value, path_item: &Value, operation: &Value) -> Result<Directives, String> {
    Directives::default()
        .descend(root)?
        .descend(path_item)?
        .descend(operation)
}
