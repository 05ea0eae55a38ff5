use serde::de::DeserializeOwned;
use serde_json::Value;

use catalog_sync::RemoteError;

/// Decoded response body.
///
/// Most endpoints wrap their payload as `{ "Data": ..., "Pagination": { "TotalResults": n } }`.
/// Bodies without a `Data` key are taken as the payload itself.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub data: Value,
    pub total_results: Option<u64>,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, RemoteError> {
        let raw: Value = serde_json::from_str(body)
            .map_err(|e| RemoteError::Payload(format!("invalid JSON response: {e}")))?;

        if raw.get("OK") == Some(&Value::Bool(false)) {
            return Err(RemoteError::Payload(rejection_message(&raw)));
        }

        let total_results = raw
            .get("Pagination")
            .and_then(|p| p.get("TotalResults"))
            .and_then(lenient_count);

        let data = match raw {
            Value::Object(mut map) => match map.remove("Data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            other => other,
        };

        Ok(Self {
            data,
            total_results,
        })
    }

    /// Elements of an array payload. Elements that do not decode are
    /// dropped; a payload that is not an array is an error.
    pub fn items<T: DeserializeOwned>(self) -> Result<Vec<T>, RemoteError> {
        match self.data {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            other => Err(RemoteError::Payload(format!(
                "expected a list, got {}",
                shape(&other)
            ))),
        }
    }

    /// The payload as a single record, or `None` when it is null.
    pub fn record<T: DeserializeOwned>(self) -> Result<Option<T>, RemoteError> {
        if self.data.is_null() {
            return Ok(None);
        }

        serde_json::from_value(self.data)
            .map(Some)
            .map_err(|e| RemoteError::Payload(format!("unexpected record shape: {e}")))
    }
}

fn shape(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "a boolean".into(),
        Value::Number(_) => "a number".into(),
        Value::String(_) => "a string".into(),
        Value::Array(_) => "a list".into(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(5).collect();
            format!("an object with keys [{}]", keys.join(", "))
        }
    }
}

fn lenient_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn rejection_message(raw: &Value) -> String {
    let messages: Vec<&str> = raw
        .get("Messages")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|m| m.get("Content").and_then(Value::as_str).or_else(|| m.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        "request rejected".to_owned()
    } else {
        format!("request rejected: {}", messages.join("; "))
    }
}
