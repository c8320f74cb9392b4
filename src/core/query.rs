//! Query parameters and pagination utilities

use serde::Deserialize;

/// Pagination parameters for `GET /events`
///
/// # Example
/// ```text
/// GET /events
/// GET /events?limit=10&offset=20
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsFilter {
    /// Number of events to return (1 to 100)
    pub limit: usize,

    /// Number of events to skip
    pub offset: usize,
}

impl Default for EventsFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

impl EventsFilter {
    /// Get limit, clamped to 1..=100
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filter: EventsFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.limit(), 20);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        let filter = EventsFilter {
            limit: 0,
            offset: 0,
        };
        assert_eq!(filter.limit(), 1);

        let filter = EventsFilter {
            limit: 5000,
            offset: 3,
        };
        assert_eq!(filter.limit(), 100);
        assert_eq!(filter.offset(), 3);
    }
}
