use std::io::{self, Write};
use std::path::PathBuf;
use std::str;

use serde_json::{json, Map, Value};

use crate::types::{KeyRecord, RdbValue, Snapshot};

/// JSON adapter over the decoded snapshot tree.
pub struct Json {
    out: Box<dyn Write>,
    pretty: bool,
    simple: bool,
}

impl Json {
    /// Write to the given path, or to stdout when `None`.
    pub fn new(file_path: Option<PathBuf>, pretty: bool, simple: bool) -> io::Result<Json> {
        let out: Box<dyn Write> = match file_path {
            Some(path) => Box::new(std::fs::File::create(path)?),
            None => Box::new(io::stdout()),
        };

        Ok(Json {
            out,
            pretty,
            simple,
        })
    }

    pub fn emit(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let document = if self.simple {
            simple_document(snapshot)
        } else {
            full_document(snapshot)
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, &document)?;
        } else {
            serde_json::to_writer(&mut self.out, &document)?;
        }
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Each key mapped directly to its value, nothing else.
fn simple_document(snapshot: &Snapshot) -> Value {
    let mut keys = Map::new();
    for record in &snapshot.keys {
        keys.insert(text(&record.key), value_to_json(&record.value));
    }
    Value::Object(keys)
}

fn full_document(snapshot: &Snapshot) -> Value {
    let mut aux = Map::new();
    for (key, value) in &snapshot.aux {
        aux.insert(text(key), Value::String(text(value)));
    }

    let keys: Vec<Value> = snapshot.keys.iter().map(record_to_json).collect();

    let mut document = Map::new();
    document.insert("rdb_version".to_string(), json!(snapshot.version));
    document.insert("aux".to_string(), Value::Object(aux));
    document.insert("keys".to_string(), Value::Array(keys));

    if !snapshot.warnings.is_empty() {
        let warnings: Vec<Value> = snapshot
            .warnings
            .iter()
            .map(|w| {
                json!({
                    "kind": w.kind.to_string(),
                    "message": w.message,
                    "position": w.position,
                })
            })
            .collect();
        document.insert("warnings".to_string(), Value::Array(warnings));
    }

    Value::Object(document)
}

fn record_to_json(record: &KeyRecord) -> Value {
    let mut entry = Map::new();
    entry.insert("key".to_string(), Value::String(text(&record.key)));
    entry.insert("db".to_string(), json!(record.db_index));
    entry.insert(
        "type".to_string(),
        Value::String(record.value.type_name().to_string()),
    );
    entry.insert("value".to_string(), value_to_json(&record.value));

    if let Some(expiry) = record.expiry_ms {
        entry.insert("expiry_ms".to_string(), json!(expiry));
    }
    if let Some(idle) = record.idle_seconds {
        entry.insert("idle".to_string(), json!(idle));
    }
    if let Some(freq) = record.freq {
        entry.insert("freq".to_string(), json!(freq));
    }

    Value::Object(entry)
}

fn value_to_json(value: &RdbValue) -> Value {
    match value {
        RdbValue::String(bytes) => Value::String(text(bytes)),
        RdbValue::List(items) | RdbValue::Set(items) => {
            Value::Array(items.iter().map(|item| Value::String(text(item))).collect())
        }
        RdbValue::SortedSet(pairs) => Value::Array(
            pairs
                .iter()
                .map(|(member, score)| {
                    json!({ "member": text(member), "score": score_to_json(*score) })
                })
                .collect(),
        ),
        RdbValue::Hash(fields) => {
            let mut object = Map::new();
            for (field, value) in fields {
                object.insert(text(field), Value::String(text(value)));
            }
            Value::Object(object)
        }
        RdbValue::Stream { summary, .. } => Value::String(summary.clone()),
    }
}

fn score_to_json(score: f64) -> Value {
    match serde_json::Number::from_f64(score) {
        Some(n) => Value::Number(n),
        // JSON has no NaN or infinities
        None => Value::String(score.to_string()),
    }
}

/// Decode bytes as UTF-8, or hex-escape the whole value behind the `\x`
/// sentinel.
fn text(bytes: &[u8]) -> String {
    match str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let mut out = String::with_capacity(2 + bytes.len() * 2);
            out.push_str("\\x");
            for byte in bytes {
                out.push_str(&format!("{:02x}", byte));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_text_passes_utf8_through() {
        assert_eq!("hello", text(b"hello"));
    }

    #[test]
    fn test_text_hex_escapes_binary() {
        assert_eq!("\\xfff00a", text(&[0xFF, 0xF0, 0x0A]));
    }

    #[test]
    fn test_non_finite_scores_become_strings() {
        assert_eq!(Value::String("NaN".to_string()), score_to_json(f64::NAN));
        assert_eq!(Value::String("inf".to_string()), score_to_json(f64::INFINITY));
        assert_eq!(json!(1.5), score_to_json(1.5));
    }

    #[test]
    fn test_simple_document_flattens_records() {
        let snapshot = Snapshot {
            version: 12,
            aux: IndexMap::new(),
            keys: vec![KeyRecord {
                key: b"greeting".to_vec(),
                value: RdbValue::String(b"hello".to_vec()),
                expiry_ms: Some(1700000000000),
                idle_seconds: None,
                freq: None,
                db_index: 0,
            }],
            checksum: vec![0; 8],
            checksum_ok: None,
            warnings: Vec::new(),
        };

        let document = simple_document(&snapshot);
        assert_eq!(json!({"greeting": "hello"}), document);
    }

    #[test]
    fn test_full_document_keeps_metadata() {
        let mut aux = IndexMap::new();
        aux.insert(b"redis-ver".to_vec(), b"7.4.0".to_vec());

        let mut fields = IndexMap::new();
        fields.insert(b"f1".to_vec(), b"v1".to_vec());

        let snapshot = Snapshot {
            version: 12,
            aux,
            keys: vec![KeyRecord {
                key: b"h".to_vec(),
                value: RdbValue::Hash(fields),
                expiry_ms: None,
                idle_seconds: Some(30),
                freq: None,
                db_index: 2,
            }],
            checksum: vec![0; 8],
            checksum_ok: None,
            warnings: Vec::new(),
        };

        let document = full_document(&snapshot);
        assert_eq!(json!(12), document["rdb_version"]);
        assert_eq!(json!("7.4.0"), document["aux"]["redis-ver"]);
        assert_eq!(json!("hash"), document["keys"][0]["type"]);
        assert_eq!(json!(2), document["keys"][0]["db"]);
        assert_eq!(json!({"f1": "v1"}), document["keys"][0]["value"]);
        assert_eq!(json!(30), document["keys"][0]["idle"]);
        assert!(document.get("warnings").is_none());
    }
}
