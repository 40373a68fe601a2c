//! # Record Queries
//!
//! Filters, orders, pages and projects jig records through their JSON form,
//! the shape clients already read. A query body looks like:
//!
//! ```json
//! { "criteria": {"owner": "mh5C..."}, "sort": {"ts": -1}, "skip": 0,
//!   "limit": 10, "project": {"location": 1, "type": 1} }
//! ```
//!
//! Criteria are equality matches; a key may be a dotted path into nested
//! objects. Sort keys apply in the order they are written. Results are
//! filtered, sorted, skipped, limited, then projected.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::serde_as;
use shared_types::JigRecord;

/// Results returned when a query sets no limit (or a limit of zero).
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Direction of one sort key, written `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl TryFrom<i64> for SortOrder {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(format!("sort direction must be 1 or -1, got {other}")),
        }
    }
}

impl From<SortOrder> for i64 {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JigQuery {
    /// Field (or dotted path) to the value it must equal.
    pub criteria: Map<String, Value>,
    /// Fields to keep (`1`) or drop (`0`).
    pub project: Option<Map<String, Value>>,
    pub skip: usize,
    pub limit: Option<usize>,
    #[serde_as(as = "serde_with::Map<_, _>")]
    pub sort: Vec<(String, SortOrder)>,
}

impl JigQuery {
    /// A query matching every field of `criteria` exactly.
    pub fn matching(criteria: Map<String, Value>) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    /// Parse a request body. An empty body is the match-everything query.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.criteria
            .iter()
            .all(|(path, expected)| field(doc, path).unwrap_or(&Value::Null) == expected)
    }

    fn effective_limit(&self) -> usize {
        match self.limit {
            Some(0) | None => DEFAULT_QUERY_LIMIT,
            Some(limit) => limit,
        }
    }

    /// Filter, sort and page `records`, keeping them whole.
    pub fn select(&self, records: Vec<JigRecord>) -> Result<Vec<JigRecord>, serde_json::Error> {
        Ok(self.select_docs(records)?.into_iter().map(|(record, _)| record).collect())
    }

    /// Filter, sort, page and project `records` as JSON documents.
    pub fn run(&self, records: Vec<JigRecord>) -> Result<Vec<Value>, serde_json::Error> {
        Ok(self
            .select_docs(records)?
            .into_iter()
            .map(|(_, doc)| self.project(doc))
            .collect())
    }

    fn select_docs(
        &self,
        records: Vec<JigRecord>,
    ) -> Result<Vec<(JigRecord, Value)>, serde_json::Error> {
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            let doc = serde_json::to_value(&record)?;
            if self.matches(&doc) {
                docs.push((record, doc));
            }
        }
        if !self.sort.is_empty() {
            docs.sort_by(|(_, a), (_, b)| self.compare(a, b));
        }
        Ok(docs
            .into_iter()
            .skip(self.skip)
            .take(self.effective_limit())
            .collect())
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (path, order) in &self.sort {
            let ordering = compare_values(field(a, path), field(b, path));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn project(&self, doc: Value) -> Value {
        let Some(project) = self.project.as_ref().filter(|project| !project.is_empty()) else {
            return doc;
        };
        let mut fields = match doc {
            Value::Object(fields) => fields,
            other => return other,
        };
        if project.values().any(truthy) {
            let kept = project
                .iter()
                .filter(|(_, flag)| truthy(flag))
                .filter_map(|(key, _)| fields.remove_entry(key))
                .collect();
            Value::Object(kept)
        } else {
            for key in project.keys() {
                fields.remove(key);
            }
            Value::Object(fields)
        }
    }
}

fn field<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, key| value.get(key))
}

fn truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Missing and null first, then numbers, strings, objects, arrays, booleans.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
