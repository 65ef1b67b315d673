//! Evaluation contexts: the field name to value bindings an expression is evaluated against.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Separator between a namespace (or relationship) and a field name in flattened keys.
pub const KEY_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("context section '{0}' must be a JSON object")]
    SectionNotAnObject(String),
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Flat mapping from field name to value. Missing keys evaluate to `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    fields: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Builder-style [`Context::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    /// Builds a context from a JSON object. Nested arrays and objects become JSON text.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ContextError> {
        match json {
            serde_json::Value::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(ContextError::NotAnObject(json_kind(other))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.fields
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

type Visibility<'a> = Box<dyn Fn(&str) -> bool + 'a>;

/// Assembles a [`Context`] from a record plus its surrounding namespaces.
///
/// Record fields land at the top level. `prior`, `user` and `env` entries are flattened as
/// `prior__<field>`, `user__<field>` and `env__<field>`. Extra fields are applied last and
/// override anything else. When a visibility predicate is set, hidden record and extra fields
/// are dropped.
#[derive(Default)]
pub struct ContextBuilder<'a> {
    record: Vec<(String, Value)>,
    prior: Vec<(String, Value)>,
    user: Vec<(String, Value)>,
    env: Vec<(String, Value)>,
    extra: Vec<(String, Value)>,
    visible: Option<Visibility<'a>>,
}

fn collect_pairs<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Vec<(String, Value)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl<'a> ContextBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record<K: Into<String>, V: Into<Value>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.record.extend(collect_pairs(fields));
        self
    }

    #[must_use]
    pub fn prior<K: Into<String>, V: Into<Value>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.prior.extend(collect_pairs(fields));
        self
    }

    #[must_use]
    pub fn user<K: Into<String>, V: Into<Value>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.user.extend(collect_pairs(fields));
        self
    }

    #[must_use]
    pub fn env<K: Into<String>, V: Into<Value>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.env.extend(collect_pairs(fields));
        self
    }

    #[must_use]
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Field-level security check. Fields for which `visible` returns false are not exposed.
    #[must_use]
    pub fn visibility(mut self, visible: impl Fn(&str) -> bool + 'a) -> Self {
        self.visible = Some(Box::new(visible));
        self
    }

    /// Reads the `{"record": {..}, "prior": {..}, "user": {..}, "env": {..}, ...}` envelope.
    ///
    /// Any other top-level key is an extra field.
    pub fn from_envelope_json(json: &serde_json::Value) -> Result<Self, ContextError> {
        let serde_json::Value::Object(map) = json else {
            return Err(ContextError::NotAnObject(json_kind(json)));
        };

        let section = |name: &str, value: &serde_json::Value| match value {
            serde_json::Value::Object(fields) => Ok(fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect::<Vec<_>>()),
            serde_json::Value::Null => Ok(Vec::new()),
            _ => Err(ContextError::SectionNotAnObject(name.to_string())),
        };

        let mut builder = Self::new();
        for (key, value) in map {
            match key.as_str() {
                "record" => builder.record = section(key.as_str(), value)?,
                "prior" => builder.prior = section(key.as_str(), value)?,
                "user" => builder.user = section(key.as_str(), value)?,
                "env" => builder.env = section(key.as_str(), value)?,
                _ => builder.extra.push((key.clone(), Value::from_json(value))),
            }
        }
        Ok(builder)
    }

    pub fn build(self) -> Context {
        let is_visible = |name: &str| self.visible.as_ref().map_or(true, |f| f(name));
        let mut ctx = Context::new();

        for (name, value) in &self.record {
            if is_visible(name.as_str()) {
                ctx.insert(name.clone(), value.clone());
            }
        }
        for (namespace, fields) in [("prior", &self.prior), ("user", &self.user), ("env", &self.env)]
        {
            for (name, value) in fields {
                ctx.insert(format!("{namespace}{KEY_SEPARATOR}{name}"), value.clone());
            }
        }
        for (name, value) in &self.extra {
            if is_visible(name.as_str()) {
                ctx.insert(name.clone(), value.clone());
            }
        }
        ctx
    }
}
