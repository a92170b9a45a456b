//! Row window to OFFSET/LIMIT.

use super::request::GridRequest;
use super::scope::QueryScope;

/// Half-open row window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    pub start: u64,
    pub end: u64,
}

impl PaginationWindow {
    /// Window carried by a request; both bounds must be present.
    pub fn from_request(request: &GridRequest) -> Option<Self> {
        match (request.start_row, request.end_row) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    /// Page size; an inverted window yields zero rows.
    pub fn limit(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn apply(&self, scope: &mut QueryScope) {
        scope.offset(self.offset()).limit(self.limit());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sea_query::PostgresQueryBuilder;

    #[test]
    fn window_needs_both_bounds() {
        let request = GridRequest {
            start_row: Some(10),
            ..Default::default()
        };
        assert!(PaginationWindow::from_request(&request).is_none());
    }

    #[test]
    fn offset_and_limit() {
        let request = GridRequest {
            start_row: Some(100),
            end_row: Some(150),
            ..Default::default()
        };
        let window = PaginationWindow::from_request(&request).unwrap();
        assert_eq!(window.offset(), 100);
        assert_eq!(window.limit(), 50);

        let mut scope = QueryScope::new("flamingos", "id", None);
        window.apply(&mut scope);
        let sql = scope.freeze().select_statement().to_string(PostgresQueryBuilder);
        assert!(sql.ends_with("LIMIT 50 OFFSET 100"), "{sql}");
    }

    #[test]
    fn inverted_window_is_empty() {
        let window = PaginationWindow { start: 20, end: 10 };
        assert_eq!(window.limit(), 0);
    }
}
