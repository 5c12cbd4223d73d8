/// Page/limit query handling and the paginated response envelope.
///
/// List endpoints label their collection and total with endpoint-specific
/// keys (e.g. `users`/`totalUsers`), so the envelope is assembled from a
/// dynamic key map rather than a fixed struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: None,
            limit: None,
        }
    }
}

/// Builds the paginated envelope:
/// `{<items_label>: [...], <total_label>: n, page, limit, totalPages,
/// hasNextPage, hasPrevPage}`.
pub fn page_envelope<T: Serialize>(
    items_label: &str,
    total_label: &str,
    items: Vec<T>,
    total: i64,
    query: &PageQuery,
) -> Result<Value, AppError> {
    let limit = query.limit();
    let page = query.page();
    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

    let items =
        serde_json::to_value(items).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut envelope = serde_json::Map::new();
    envelope.insert(items_label.to_string(), items);
    envelope.insert(total_label.to_string(), Value::from(total));
    envelope.insert("page".to_string(), Value::from(page));
    envelope.insert("limit".to_string(), Value::from(limit));
    envelope.insert("totalPages".to_string(), Value::from(total_pages));
    envelope.insert("hasNextPage".to_string(), Value::from(page < total_pages));
    envelope.insert("hasPrevPage".to_string(), Value::from(page > 1));

    Ok(Value::Object(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let q = PageQuery { page: None, limit: None };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);

        let q = PageQuery { page: Some(0), limit: Some(0) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 1);

        let q = PageQuery { page: Some(3), limit: Some(500) };
        assert_eq!(q.limit(), 100);
        assert_eq!(q.offset(), 200);
    }

    #[test]
    fn envelope_math() {
        let q = PageQuery { page: Some(2), limit: Some(10) };
        let envelope = page_envelope("users", "totalUsers", vec![1, 2, 3], 23, &q).unwrap();

        assert_eq!(envelope["totalUsers"], 23);
        assert_eq!(envelope["page"], 2);
        assert_eq!(envelope["totalPages"], 3);
        assert_eq!(envelope["hasNextPage"], true);
        assert_eq!(envelope["hasPrevPage"], true);
        assert_eq!(envelope["users"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn envelope_for_empty_set() {
        let q = PageQuery { page: None, limit: None };
        let envelope =
            page_envelope::<i64>("stores", "totalStores", Vec::new(), 0, &q).unwrap();

        assert_eq!(envelope["totalStores"], 0);
        assert_eq!(envelope["totalPages"], 0);
        assert_eq!(envelope["hasNextPage"], false);
        assert_eq!(envelope["hasPrevPage"], false);
    }
}
