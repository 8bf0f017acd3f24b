//! Query keys and invalidation targets.

use convene_api::Procedure;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of one cached query: the procedure plus its input.
///
/// The input is kept as canonical JSON (object keys sorted, `null` read as
/// `{}`), so two inputs that mean the same thing share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    pub procedure: Procedure,
    pub input: String,
}

impl QueryKey {
    pub fn new<I: Serialize + ?Sized>(
        procedure: Procedure,
        input: &I,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(input)?;
        Ok(Self::from_value(procedure, &value))
    }

    pub fn from_value(procedure: Procedure, input: &Value) -> Self {
        let input = match input {
            Value::Null => String::from("{}"),
            other => canonical_json(other),
        };
        Self { procedure, input }
    }

    /// Decode the stored input back into JSON.
    pub fn input_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.input)
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// What a mutation marks as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// Every cached input of a procedure.
    Procedure(Procedure),
    /// One exact query.
    Exact(QueryKey),
}

impl InvalidationTarget {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            InvalidationTarget::Procedure(procedure) => key.procedure == *procedure,
            InvalidationTarget::Exact(exact) => key == exact,
        }
    }
}
