use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

use super::{Collection, StoredDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters, ordering and limit over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document passes every filter
    ///
    /// A document missing a filtered field never matches.
    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.filters.iter().all(|filter| {
            let Some(actual) = doc.data.get(&filter.field) else {
                return false;
            };
            let Some(ordering) = compare_values(actual, &filter.value) else {
                return false;
            };
            match filter.op {
                FilterOp::Eq => ordering == Ordering::Equal,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Gte => ordering != Ordering::Less,
            }
        })
    }

    /// Filters, sorts and truncates documents given in storage order
    ///
    /// When ordering, documents lacking the order field are left out. The sort is
    /// stable, so ties keep storage order.
    pub fn apply(&self, docs: Vec<StoredDocument>) -> Vec<StoredDocument> {
        let mut docs: Vec<StoredDocument> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order {
            docs.retain(|d| d.data.contains_key(&order.field));
            docs.sort_by(|a, b| {
                let ordering = compare_values(&a.data[&order.field], &b.data[&order.field])
                    .unwrap_or(Ordering::Equal);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }

        docs
    }
}

/// Compares two JSON values of the same kind
///
/// Strings that both parse as RFC 3339 timestamps compare chronologically.
/// Values of different kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc))),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            data: data.as_object().cloned().unwrap(),
        }
    }

    fn ids(docs: &[StoredDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_equality_and_range_filters() {
        let docs = vec![
            doc("a", json!({ "userId": "u1", "startTime": "2026-10-18T08:00:00.000Z" })),
            doc("b", json!({ "userId": "u2", "startTime": "2026-10-18T09:00:00.000Z" })),
            doc("c", json!({ "userId": "u1", "startTime": "2026-10-19T00:00:00.000Z" })),
            doc("d", json!({ "userId": "u1" })),
        ];

        let query = Query::collection(Collection::UserSessions)
            .filter("userId", FilterOp::Eq, "u1")
            .filter("startTime", FilterOp::Gte, "2026-10-18T00:00:00.000Z")
            .filter("startTime", FilterOp::Lte, "2026-10-18T23:59:59.999Z");

        assert_eq!(ids(&query.apply(docs)), vec!["a"]);
    }

    #[test]
    fn test_timestamps_compare_chronologically_across_precision() {
        let a = json!("2026-10-18T09:00:00Z");
        let b = json!("2026-10-18T09:00:00.500Z");
        assert_eq!(compare_values(&a, &b), Some(Ordering::Less));
    }

    #[test]
    fn test_order_desc_is_stable_and_limited() {
        let docs = vec![
            doc("a", json!({ "votes": 3 })),
            doc("b", json!({ "votes": 7 })),
            doc("c", json!({ "votes": 3 })),
            doc("d", json!({ "title": "no votes" })),
            doc("e", json!({ "votes": 1 })),
        ];

        let query = Query::collection(Collection::Movies)
            .order_by("votes", Direction::Desc)
            .limit(3);

        assert_eq!(ids(&query.apply(docs)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_mixed_types_never_match() {
        let docs = vec![doc("a", json!({ "votes": "3" }))];
        let query = Query::collection(Collection::Movies).filter("votes", FilterOp::Eq, 3);
        assert!(query.apply(docs).is_empty());
    }

    #[test]
    fn test_order_asc_by_name() {
        let docs = vec![
            doc("1", json!({ "name": "Zoe" })),
            doc("2", json!({ "name": "Ada" })),
            doc("3", json!({ "name": "Mia" })),
        ];
        let query = Query::collection(Collection::Users).order_by("name", Direction::Asc);
        assert_eq!(ids(&query.apply(docs)), vec!["2", "3", "1"]);
    }
}
