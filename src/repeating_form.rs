use super::*;

/// A repeating form that owns its row counter instead of keeping it as
/// text in a hidden field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingForm {
    template_id: String,
    span_target_id: String,
    next: u64,
}

impl RepeatingForm {
    /// `next` is the suffix the first added row receives; usually the number
    /// of rows already rendered.
    pub fn new(
        template_id: impl Into<String>,
        span_target_id: impl Into<String>,
        next: u64,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            span_target_id: span_target_id.into(),
            next,
        }
    }

    pub fn next(&self) -> u64 {
        self.next
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Adds one row to `page` and returns its root. The counter only moves
    /// when the row was added.
    pub fn add_row(&mut self, page: &mut Page) -> Result<NodeId> {
        let row =
            page.duplicate_with_counter(&self.template_id, self.next, &self.span_target_id)?;
        self.next += 1;
        Ok(row)
    }
}
