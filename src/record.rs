use serde_json::Value;

/// How a mapping rule addresses record data. `Tuple` always resolves to an
/// ordered value list consumed by a multi-argument formatter; fallback
/// selection is a formatter concern (`Formatter::FirstNonEmpty`), never a
/// resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSpec {
    Single(&'static str),
    Tuple(&'static [&'static str]),
    Literal(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    One(Value),
    Many(Vec<Value>),
}

/// One record plus the run-scoped context a formatter may consult:
/// document-level fields and the record's 1-based position. The cover
/// pass uses sequence 0 and a null record.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub data: &'a Value,
    pub fields: &'a Value,
    pub sequence: usize,
}

impl<'a> RecordContext<'a> {
    pub fn cover(fields: &'a Value) -> RecordContext<'a> {
        RecordContext {
            data: &Value::Null,
            fields,
            sequence: 0,
        }
    }

    /// Document-level fields win on an exact key; otherwise the path is
    /// walked into the record. Absence is never an error.
    pub fn resolve(&self, path: &str) -> Value {
        if let Some(map) = self.fields.as_object() {
            if let Some(value) = map.get(path) {
                return value.clone();
            }
        }
        resolve_path(self.data, path).cloned().unwrap_or(Value::Null)
    }

    pub fn resolve_spec(&self, spec: &PathSpec) -> Resolved {
        match spec {
            PathSpec::Single(path) => Resolved::One(self.resolve(path)),
            PathSpec::Tuple(paths) => {
                Resolved::Many(paths.iter().map(|p| self.resolve(p)).collect())
            }
            PathSpec::Literal(text) => Resolved::One(Value::String((*text).to_string())),
        }
    }
}

/// Walks `a.b[0].c` into a nested value. Any absent key, wrong shape, or
/// out-of-range index yields `None`.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        let (key, index) = split_segment(segment)?;
        if !key.is_empty() {
            current = current.as_object()?.get(key)?;
        }
        if let Some(index) = index {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

// "name[3]" -> ("name", Some(3)); "name" -> ("name", None).
fn split_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.find('[') {
        None => Some((segment, None)),
        Some(open) => {
            let rest = &segment[open + 1..];
            let close = rest.find(']')?;
            if close + 1 != rest.len() {
                return None;
            }
            let index = rest[..close].parse::<usize>().ok()?;
            Some((&segment[..open], Some(index)))
        }
    }
}

/// Display coercion for a resolved value when no formatter is declared.
/// Null renders empty; arrays join their non-empty member displays.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(display_value)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(", ")
        }
        Value::Object(_) => String::new(),
    }
}

pub fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
