//! Document matching, ordering and mutation helpers shared by the memory
//! backend and the transaction handle. Keeping one implementation means a
//! transactional read can never disagree with a plain one.

use super::error::{RepositoryError, RepositoryResult};
use super::types::{Comparison, Cursor, Document, FieldMap, Filter, Page};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

pub(crate) fn get_field<'a>(document: &'a Document, field: &str) -> &'a Value {
    document.get(field).unwrap_or(&Value::Null)
}

pub(crate) fn is_deleted(document: &Document) -> bool {
    get_field(document, "deleted").as_bool().unwrap_or(false)
}

fn compare_values(stored: &Value, op: Comparison, target: &Value) -> bool {
    match op {
        Comparison::Eq => stored == target,
        Comparison::Ne => stored != target,
        Comparison::Lt | Comparison::Lte | Comparison::Gt | Comparison::Gte => {
            let ordering = if let (Some(a), Some(b)) = (stored.as_i64(), target.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (stored.as_str(), target.as_str()) {
                a.cmp(b)
            } else {
                return false;
            };
            matches!(
                (op, ordering),
                (Comparison::Lt, Ordering::Less)
                    | (Comparison::Lte, Ordering::Less | Ordering::Equal)
                    | (Comparison::Gt, Ordering::Greater)
                    | (Comparison::Gte, Ordering::Greater | Ordering::Equal)
            )
        }
    }
}

/// Whether a document satisfies every condition of the filter.
pub(crate) fn matches_filter(document: &Document, filter: &Filter) -> bool {
    if !filter.include_deleted && is_deleted(document) {
        return false;
    }
    filter.conditions.iter().all(|condition| {
        compare_values(
            get_field(document, &condition.field),
            condition.op,
            &condition.value.to_json(),
        )
    })
}

/// Orders documents newest-first by (`created_date`, `object_id`).
pub(crate) fn sort_newest_first(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        let created_a = get_field(a, "created_date").as_i64().unwrap_or(0);
        let created_b = get_field(b, "created_date").as_i64().unwrap_or(0);
        created_b.cmp(&created_a).then_with(|| {
            let id_a = get_field(a, "object_id").as_str().unwrap_or("");
            let id_b = get_field(b, "object_id").as_str().unwrap_or("");
            id_b.cmp(id_a)
        })
    });
}

/// Cuts one page out of an already-sorted document list.
pub(crate) fn paginate(documents: Vec<Document>, cursor: &Cursor) -> Page {
    let start = match cursor.after {
        Some(after) => {
            let after = after.to_string();
            documents
                .iter()
                .position(|doc| get_field(doc, "object_id").as_str() == Some(after.as_str()))
                .map(|idx| idx + 1)
                .unwrap_or(0)
        }
        None => 0,
    };

    let remaining = documents.len().saturating_sub(start);
    let take = cursor.limit.min(remaining);
    let page: Vec<Document> = documents.into_iter().skip(start).take(take).collect();
    let next_cursor = if take < remaining {
        page.last()
            .and_then(|doc| get_field(doc, "object_id").as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    } else {
        None
    };

    Page {
        documents: page,
        next_cursor,
    }
}

/// Applies a partial update in place, bumping `last_updated` unless the
/// map sets it explicitly.
pub(crate) fn apply_update_map(document: &mut Document, updates: &FieldMap, now: i64) {
    for (field, value) in updates.iter() {
        document[field.as_str()] = value.to_json();
    }
    if !updates.contains("last_updated") {
        document["last_updated"] = Value::from(now);
    }
}

/// Applies numeric increments in place. Missing fields start at zero;
/// non-numeric stored values are an error.
pub(crate) fn apply_increment_map(
    document: &mut Document,
    increments: &FieldMap,
    now: i64,
) -> RepositoryResult<()> {
    for (field, value) in increments.iter() {
        let delta = value.as_i64().ok_or_else(|| {
            RepositoryError::InvalidFilter(format!("increment for `{}` must be numeric", field))
        })?;
        let current = match get_field(document, field) {
            Value::Null => 0,
            stored => stored.as_i64().ok_or_else(|| {
                RepositoryError::InvalidFilter(format!("field `{}` is not numeric", field))
            })?,
        };
        document[field.as_str()] = Value::from(current + delta);
    }
    document["last_updated"] = Value::from(now);
    Ok(())
}
