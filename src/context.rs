//! Template contexts – the named variables a template is bound against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RenderError;
use crate::flatten::{flatten, flatten_with_ancestors, Flatten};

/// Variable name → value mapping handed to the template engine.
///
/// Keys are kept sorted so that serialising a context is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialise `value` and bind it to `name`, replacing any previous value.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), RenderError> {
        let value = serde_json::to_value(value)?;
        self.vars.insert(name.into(), value);
        Ok(())
    }

    /// Bind an already-converted value. Returns the previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every binding of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: Context) {
        self.vars.extend(other.vars);
    }

    /// The context as a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.vars.into_iter().collect())
    }

    /// Parse a context from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn to_tera(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        for (name, value) in &self.vars {
            ctx.insert(name.as_str(), value);
        }
        ctx
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(vars: BTreeMap<String, Value>) -> Self {
        Self { vars }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Context {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

/// Fluent construction of a [`Context`].
///
/// Serialisation failures are held until [`ContextBuilder::build`], so a
/// chain of `var` calls needs a single `?`.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    context: Context,
    error: Option<serde_json::Error>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Self {
        if self.error.is_none() {
            match serde_json::to_value(value) {
                Ok(value) => {
                    self.context.set(name, value);
                }
                Err(e) => {
                    log::warn!("Context variable '{name}' could not be serialised: {e}");
                    self.error = Some(e);
                }
            }
        }
        self
    }

    /// Bind every declared field of `value` as a top-level variable.
    pub fn fields_of<T: Flatten + ?Sized>(mut self, value: &T) -> Self {
        self.context.merge(flatten(value));
        self
    }

    /// Like [`fields_of`](Self::fields_of), including inherited fields.
    pub fn all_fields_of<T: Flatten + ?Sized>(mut self, value: &T) -> Self {
        self.context.merge(flatten_with_ancestors(value));
        self
    }

    pub fn merge(mut self, context: Context) -> Self {
        self.context.merge(context);
        self
    }

    pub fn build(self) -> Result<Context, RenderError> {
        match self.error {
            Some(e) => Err(e.into()),
            None => Ok(self.context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_is_last_write_wins() {
        let mut a = Context::new();
        a.set("titulo", "A");
        a.set("periodo", "Enero");
        let mut b = Context::new();
        b.set("titulo", "B");
        a.merge(b);
        assert_eq!(a.get("titulo"), Some(&json!("B")));
        assert_eq!(a.get("periodo"), Some(&json!("Enero")));
    }

    #[test]
    fn names_are_sorted() {
        let ctx: Context = [("b".to_string(), json!(1)), ("a".to_string(), json!(2))]
            .into_iter()
            .collect();
        assert_eq!(ctx.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn builder_defers_serialisation_errors() {
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], 1);
        let err = ContextBuilder::new()
            .var("ok", &1)
            .var("bad", &bad)
            .build()
            .unwrap_err();
        assert!(matches!(err, RenderError::Context(_)));
    }

    #[test]
    fn from_json_requires_an_object() {
        let ctx = Context::from_json(r#"{"periodo": "Enero 2024", "ventas": []}"#).unwrap();
        assert_eq!(ctx.len(), 2);
        assert!(Context::from_json("[1, 2]").is_err());
    }
}
