use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Flat name → value mapping owned by one conversation session.
///
/// Keys are stored verbatim. Reads go through [`VariableStore::lookup`],
/// which also understands dotted paths such as `lead.status` or
/// `items[0].name` so that structured values (webhook responses, payloads)
/// can be addressed from templates and conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let key = key.into();
        let value = value.into();
        tracing::debug!(key = %key, value = %value, "set variable");
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Copies every entry of `defaults` whose key is not already present.
    pub fn merge_defaults(&mut self, defaults: &HashMap<String, Value>) {
        for (key, value) in defaults {
            self.values
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.values
    }

    /// Resolves `path` against the store.
    ///
    /// An exact key match always wins. Otherwise the path is split on `.`
    /// and each segment descends into objects, with optional `[n]` array
    /// indices (`users[0].name`, `matrix[1][2]`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if let Some(value) = self.values.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let (base, indices) = split_indices(segments.next()?);
        let mut current = descend_indices(self.values.get(base)?, indices)?;

        for segment in segments {
            let (key, indices) = split_indices(segment);
            if !key.is_empty() {
                current = current.get(key)?;
            }
            current = descend_indices(current, indices)?;
        }
        Some(current)
    }

    /// String form of the value at `path`, see [`display_value`].
    pub fn lookup_string(&self, path: &str) -> Option<String> {
        self.lookup(path).map(display_value)
    }
}

impl From<HashMap<String, Value>> for VariableStore {
    fn from(values: HashMap<String, Value>) -> Self {
        Self::from_map(values)
    }
}

impl FromIterator<(String, Value)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// String form used by interpolation and by `==`/`!=` comparisons.
///
/// Strings are returned raw, scalars through their display form, and
/// arrays/objects as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn split_indices(segment: &str) -> (&str, &str) {
    match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    }
}

fn descend_indices<'a>(mut value: &'a Value, mut rest: &str) -> Option<&'a Value> {
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped.find(']')?;
        let index: usize = stripped[..end].trim().parse().ok()?;
        value = value.as_array()?.get(index)?;
        rest = &stripped[end + 1..];
    }
    rest.is_empty().then_some(value)
}
