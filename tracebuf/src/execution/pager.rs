//! Result Pager
//!
//! Read-only view over the registry: slices a record's buffer by
//! offset/limit while its runner may still be appending.

use std::sync::Arc;
use tracebuf_common::{GetResultResponse, ResultPage};

use super::registry::ExecutionRegistry;
use crate::domain::{ExecutionError, ExecutionId};

#[derive(Debug, Clone)]
pub struct ResultPager {
    registry: Arc<ExecutionRegistry>,
}

impl ResultPager {
    #[must_use]
    pub fn new(registry: Arc<ExecutionRegistry>) -> Self {
        Self { registry }
    }

    /// Page `[offset, offset + limit)` of a record's lines
    ///
    /// Negative `offset`/`limit` are clamped to 0. An offset past the end
    /// yields an empty page with `has_more == false`.
    ///
    /// # Errors
    /// [`ExecutionError::NotFound`] if `id` is not registered
    pub fn fetch(&self, id: &str, offset: i64, limit: i64) -> Result<ResultPage, ExecutionError> {
        let record = self
            .registry
            .lookup(id)
            .ok_or_else(|| ExecutionError::NotFound(ExecutionId::from(id)))?;

        let slice = record.page(clamp_to_usize(offset), clamp_to_usize(limit));
        Ok(ResultPage {
            execution_id: record.id().to_string(),
            status: slice.status,
            lines_total: slice.lines_total,
            lines_returned: slice.output.len(),
            output: slice.output,
            has_more: slice.has_more,
            error_message: slice.error_message,
            duration: slice.duration.map(|d| d.as_secs_f64()),
        })
    }

    /// [`fetch`](Self::fetch) in its wire shape; unknown ids become the
    /// not-found response rather than an error.
    #[must_use]
    pub fn get_result(&self, id: &str, offset: i64, limit: i64) -> GetResultResponse {
        match self.fetch(id, offset, limit) {
            Ok(page) => GetResultResponse::Page(page),
            Err(_) => GetResultResponse::not_found(id),
        }
    }
}

fn clamp_to_usize(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::record::RecordWriter;
    use proptest::prelude::*;
    use tracebuf_common::ExecutionStatus;

    fn pager_with_lines(count: usize) -> (ResultPager, String, RecordWriter) {
        let registry = Arc::new(ExecutionRegistry::new());
        let (record, mut writer) = registry.register(10_000);
        for i in 0..count {
            writer.push_line(format!("line {i}"));
        }
        (ResultPager::new(registry), record.id().to_string(), writer)
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let pager = ResultPager::new(Arc::new(ExecutionRegistry::new()));
        let missing = pager.fetch("exec_nope", 0, 10);
        assert!(matches!(missing, Err(ExecutionError::NotFound(_))));
        assert_eq!(
            pager.get_result("exec_nope", 0, 10),
            GetResultResponse::not_found("exec_nope")
        );
    }

    #[test]
    fn test_first_page_of_running_record() {
        let (pager, id, _writer) = pager_with_lines(5);
        let page = pager.fetch(&id, 0, 2).unwrap();
        assert_eq!(page.status, ExecutionStatus::Running);
        assert_eq!(page.output, vec!["line 0", "line 1"]);
        assert_eq!(page.lines_returned, 2);
        assert_eq!(page.lines_total, 5);
        assert!(page.has_more);
        assert!(page.duration.is_none());
    }

    #[test]
    fn test_last_partial_page() {
        let (pager, id, _writer) = pager_with_lines(5);
        let page = pager.fetch(&id, 4, 10).unwrap();
        assert_eq!(page.output, vec!["line 4"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let (pager, id, _writer) = pager_with_lines(3);
        let page = pager.fetch(&id, 50, 10).unwrap();
        assert!(page.output.is_empty());
        assert_eq!(page.lines_returned, 0);
        assert!(!page.has_more);
    }

    #[test]
    fn test_negative_values_are_clamped() {
        let (pager, id, _writer) = pager_with_lines(3);
        let page = pager.fetch(&id, -5, 2).unwrap();
        assert_eq!(page.output, vec!["line 0", "line 1"]);

        let page = pager.fetch(&id, 0, -1).unwrap();
        assert!(page.output.is_empty());
        assert!(page.has_more);
    }

    #[test]
    fn test_terminal_record_reports_duration_and_error() {
        let (pager, id, mut writer) = pager_with_lines(1);
        writer.fail("Timeout");
        let page = pager.fetch(&id, 0, 10).unwrap();
        assert_eq!(page.status, ExecutionStatus::Failed);
        assert_eq!(page.error_message.as_deref(), Some("Timeout"));
        assert!(page.duration.is_some_and(|d| d >= 0.0));
    }

    #[test]
    fn test_reads_see_lines_appended_later() {
        let (pager, id, mut writer) = pager_with_lines(1);
        assert_eq!(pager.fetch(&id, 0, 100).unwrap().lines_total, 1);
        writer.push_line("late");
        let page = pager.fetch(&id, 1, 100).unwrap();
        assert_eq!(page.output, vec!["late"]);
    }

    proptest! {
        #[test]
        fn prop_paging_law(total in 0usize..40, offset in -10i64..60, limit in -10i64..60) {
            let (pager, id, _writer) = pager_with_lines(total);
            let page = pager.fetch(&id, offset, limit).unwrap();

            let off = usize::try_from(offset.max(0)).unwrap();
            let lim = usize::try_from(limit.max(0)).unwrap();
            let expected = lim.min(total.saturating_sub(off));
            prop_assert_eq!(page.lines_returned, expected);
            prop_assert_eq!(page.output.len(), expected);
            prop_assert_eq!(page.has_more, off + page.lines_returned < total);
            if expected > 0 {
                prop_assert_eq!(&page.output[0], &format!("line {off}"));
            }
        }
    }
}
