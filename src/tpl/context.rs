use crate::error::{Result, TemplateError};
use crate::serializer::to_value;
use crate::value::Value;
use chrono::Local;
use indexmap::IndexMap;
use indexmap::map::Iter;
use serde::Serialize;

pub const TIMESTAMP_KEY: &str = "timestamp";
pub const DATE_KEY: &str = "date";
pub const ISO_DATE_KEY: &str = "iso_date";

/// Ordered mapping of names to values that a template renders against.
///
/// A `Context` is created once per top-level render and passed by `&mut`
/// through every include of that render, so values added while rendering one
/// include are visible to the next one. It is never copied at an include
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    values: IndexMap<String, Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context seeded with `timestamp`, `date` and `iso_date`.
    pub fn new() -> Self {
        let mut ctx = Self {
            values: IndexMap::new(),
        };
        ctx.refresh_clock();
        ctx
    }

    /// Creates a context from any serializable record.
    pub fn from_serialize<T: ?Sized + Serialize>(data: &T) -> Result<Self> {
        let mut ctx = Self::new();
        ctx.merge_serialize(data)?;
        Ok(ctx)
    }

    /// Rewrites the temporal fields with the current local time.
    pub fn refresh_clock(&mut self) {
        let now = Local::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1e6;
        self.values
            .insert(TIMESTAMP_KEY.to_string(), Value::Float(timestamp));
        self.values.insert(
            DATE_KEY.to_string(),
            Value::Str(now.format("%Y%m%d").to_string()),
        );
        self.values.insert(
            ISO_DATE_KEY.to_string(),
            Value::Str(now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        );
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Writes every key of `other` into `self`; `other` wins on collision.
    ///
    /// Keys already present keep their position, new keys are appended.
    pub fn update(&mut self, other: &Context) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merges the fields of a serializable record, skipping null fields.
    pub fn merge_serialize<T: ?Sized + Serialize>(&mut self, data: &T) -> Result<()> {
        match to_value(data)? {
            Value::Map(fields) => {
                for (key, value) in fields {
                    if !value.is_null() {
                        self.values.insert(key, value);
                    }
                }
                Ok(())
            }
            Value::Null => Ok(()),
            other => Err(TemplateError::Value(format!(
                "context data must be a record, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
