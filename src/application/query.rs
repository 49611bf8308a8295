//! Read-only lookups against the published snapshot.

use std::sync::Arc;

use crate::domain::DiseaseMap;
use crate::ports::SnapshotStore;

/// Errors surfaced to callers of [`QueryService::query`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Missing 'district' query parameter")]
    BadRequest,

    #[error("No data found for district '{0}'")]
    NotFound(String),

    #[error("Snapshot unavailable: {0}")]
    Unavailable(String),
}

/// Serves district lookups from whatever was last published.
///
/// Never waits on a running rebuild.
pub struct QueryService<P: SnapshotStore> {
    store: Arc<P>,
}

impl<P: SnapshotStore> QueryService<P> {
    pub fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    /// Per-disease breakdown for one district.
    ///
    /// # Errors
    /// - `BadRequest` if no district is given
    /// - `NotFound` if the snapshot has no such district
    /// - `Unavailable` if nothing is published yet or the artifact is unreadable
    pub fn query(&self, district: Option<&str>) -> Result<DiseaseMap, QueryError> {
        let district = match district {
            Some(d) if !d.trim().is_empty() => d,
            _ => return Err(QueryError::BadRequest),
        };

        let summary = self
            .store
            .load()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?
            .ok_or_else(|| QueryError::Unavailable("no snapshot published yet".to_string()))?;

        summary
            .get(district)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(district.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySnapshotStore;
    use crate::domain::DistrictSummary;

    fn service_with(summary: Option<DistrictSummary>) -> QueryService<MemorySnapshotStore> {
        let store = MemorySnapshotStore::new();
        if let Some(summary) = summary {
            store.publish(&summary).expect("Should publish");
        }
        QueryService::new(Arc::new(store))
    }

    #[test]
    fn test_query_found_and_not_found() {
        let mut summary = DistrictSummary::new();
        summary.districts.insert("Wayanad".to_string(), DiseaseMap::new());
        let service = service_with(Some(summary));

        assert_eq!(service.query(Some("Wayanad")), Ok(DiseaseMap::new()));
        assert_eq!(
            service.query(Some("Thrissur")),
            Err(QueryError::NotFound("Thrissur".to_string()))
        );
    }

    #[test]
    fn test_query_missing_parameter() {
        let service = service_with(Some(DistrictSummary::new()));
        assert_eq!(service.query(None), Err(QueryError::BadRequest));
        assert_eq!(service.query(Some("  ")), Err(QueryError::BadRequest));
    }

    #[test]
    fn test_query_before_publish() {
        let service = service_with(None);
        assert!(matches!(service.query(Some("Kollam")), Err(QueryError::Unavailable(_))));
    }
}
