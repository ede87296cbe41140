use super::*;
use crate::duplicator::{Duplicate, ElementDuplicator, FocusController, InsertPosition};

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Default)]
struct FocusState {
    active_element: Option<NodeId>,
}

impl FocusController for FocusState {
    fn focus(&mut self, node: NodeId) -> Result<()> {
        self.active_element = Some(node);
        Ok(())
    }
}

#[derive(Debug)]
struct TraceState {
    enabled: bool,
    to_stderr: bool,
    logs: Vec<String>,
    log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            to_stderr: true,
            logs: Vec::new(),
            log_limit: 10_000,
        }
    }
}

/// A live document with a focus owner, the surface a repeating form's
/// "add another" button acts on.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    focus: FocusState,
    duplicator: ElementDuplicator,
    trace: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = html::parse_html(html)?;
        Ok(Self {
            dom,
            focus: FocusState::default(),
            duplicator: ElementDuplicator::default(),
            trace: TraceState::default(),
        })
    }

    pub fn set_separator(&mut self, separator: char) {
        self.duplicator.options_mut().separator = separator;
    }

    pub fn set_insert_position(&mut self, position: InsertPosition) {
        self.duplicator.options_mut().insert_position = position;
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidTree(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace.log_limit = max_entries;
        while self.trace.logs.len() > self.trace.log_limit {
            self.trace.logs.remove(0);
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace.logs)
    }

    /// Adds a row: copies `template_id` numbered with the value of
    /// `counter_id`, bumps the counter and the `rowspan` of
    /// `span_target_id`, and focuses the first text field of the copy.
    pub fn duplicate(
        &mut self,
        template_id: &str,
        counter_id: &str,
        span_target_id: &str,
    ) -> Result<()> {
        let outcome = self.duplicator.duplicate(
            &mut self.dom,
            &mut self.focus,
            template_id,
            counter_id,
            span_target_id,
        );
        match outcome {
            Ok(done) => {
                self.trace_duplicate(template_id, &done);
                Ok(())
            }
            Err(err) => {
                self.trace_line(format!("[duplicate] #{template_id} failed: {err}"));
                Err(err)
            }
        }
    }

    /// Adds a row numbered `n` without reading or writing a counter holder.
    pub fn duplicate_with_counter(
        &mut self,
        template_id: &str,
        n: u64,
        span_target_id: &str,
    ) -> Result<NodeId> {
        let outcome = self.duplicator.duplicate_with_counter(
            &mut self.dom,
            &mut self.focus,
            template_id,
            n,
            span_target_id,
        );
        match outcome {
            Ok(done) => {
                self.trace_duplicate(template_id, &done);
                Ok(done.clone)
            }
            Err(err) => {
                self.trace_line(format!("[duplicate] #{template_id} failed: {err}"));
                Err(err)
            }
        }
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_value(target, text)
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.focus.focus(target)?;
        let label = self.dom.node_label(target);
        self.trace_line(format!("[focus] {label}"));
        Ok(())
    }

    pub fn blur(&mut self) {
        if let Some(current) = self.focus.active_element.take() {
            let label = self.dom.node_label(current);
            self.trace_line(format!("[focus] blur {label}"));
        }
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.focus.active_element
    }

    /// Id of the focused element; `Some("")` for a focused element without one.
    pub fn focused_id(&self) -> Option<String> {
        self.focus
            .active_element
            .map(|node| self.dom.attr(node, "id").unwrap_or_default())
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn set_attr(&mut self, selector: &str, name: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_attr(target, name, value)
    }

    pub fn remove_attr(&mut self, selector: &str, name: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.remove_attr(target, name)
    }

    /// The `rowspan` of the element, `None` when absent or not a number.
    pub fn row_span(&self, selector: &str) -> Result<Option<u64>> {
        let target = self.select_one(selector)?;
        Ok(self
            .dom
            .attr(target, "rowspan")
            .and_then(|raw| raw.trim().parse::<u64>().ok()))
    }

    /// Ids of the element children of `selector`, in order; `""` for children without one.
    pub fn child_ids(&self, selector: &str) -> Result<Vec<String>> {
        let target = self.select_one(selector)?;
        Ok(self
            .dom
            .children(target)
            .iter()
            .filter(|child| self.dom.element(**child).is_some())
            .map(|child| self.dom.attr(*child, "id").unwrap_or_default())
            .collect())
    }

    /// Attribute values of a node and its descendants, in pre-order.
    pub fn attr_values_in(&self, node: NodeId, name: &str) -> Vec<Option<String>> {
        if !self.dom.is_valid_node(node) {
            return Vec::new();
        }
        self.dom
            .elements_in(node)
            .into_iter()
            .map(|node| self.dom.attr(node, name))
            .collect()
    }

    pub fn node_value(&self, node: NodeId) -> Result<String> {
        self.dom.value(node)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn dump_node(&self, node: NodeId) -> Result<String> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::InvalidTree(format!("unknown node-{}", node.0)));
        }
        Ok(self.dom.dump_node(node))
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                target: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != Some(expected) {
            return Err(Error::AssertionFailed {
                target: format!("{selector}[{name}]"),
                expected: expected.to_string(),
                actual: actual.unwrap_or_else(|| "<absent>".into()),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.focus.active_element != Some(target) {
            let actual = self
                .focus
                .active_element
                .map(|node| self.dom.node_label(node))
                .unwrap_or_else(|| "<none>".into());
            return Err(Error::AssertionFailed {
                target: "active element".into(),
                expected: selector.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        let id = selector
            .trim()
            .strip_prefix('#')
            .filter(|id| !id.is_empty() && !id.contains(char::is_whitespace))
            .ok_or_else(|| Error::UnsupportedSelector(selector.to_string()))?;
        self.dom
            .by_id(id)
            .ok_or_else(|| Error::Lookup(id.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        let markup = self.dom.dump_node(node_id);
        match markup.char_indices().nth(SNIPPET_CHARS) {
            Some((cut, _)) => format!("{}...", &markup[..cut]),
            None => markup,
        }
    }

    fn trace_duplicate(&mut self, template_id: &str, done: &Duplicate) {
        let clone = self.dom.node_label(done.clone);
        let focused = done
            .focused
            .map(|node| self.dom.node_label(node))
            .unwrap_or_else(|| "<unchanged>".into());
        self.trace_line(format!(
            "[duplicate] #{template_id} -> {clone} counter={} rowspan={} focus={focused}",
            done.counter, done.row_span
        ));
    }

    fn trace_line(&mut self, line: String) {
        if self.trace.enabled {
            if self.trace.to_stderr {
                eprintln!("{line}");
            }
            if self.trace.logs.len() >= self.trace.log_limit {
                self.trace.logs.remove(0);
            }
            self.trace.logs.push(line);
        }
    }
}
