//! Template row duplication for repeating forms.
//!
//! A repeating form renders one template row whose ids and names follow the
//! `prefix_N` convention, a counter holder with the next free `N`, and a cell
//! whose `rowspan` covers every row plus one fixed row. Adding a row clones
//! the template, renumbers the copy, clears its text fields and moves focus
//! into it.

use super::*;

pub const DEFAULT_SEPARATOR: char = '_';

/// Read/write access to the document the duplicator works on.
pub trait DocumentTree {
    fn lookup(&self, id: &str) -> Option<NodeId>;
    fn is_element(&self, node: NodeId) -> bool;
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
    fn children_of(&self, node: NodeId) -> Vec<NodeId>;
    /// Deep copy of `node`, not yet attached anywhere.
    fn clone_subtree(&mut self, node: NodeId) -> Result<NodeId>;
    fn insert_after(&mut self, target: NodeId, node: NodeId) -> Result<()>;
    fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;
    fn value(&self, node: NodeId) -> Result<String>;
    fn set_value(&mut self, node: NodeId, value: &str) -> Result<()>;
    fn is_text_entry(&self, node: NodeId) -> bool;
    fn is_focusable(&self, node: NodeId) -> bool;
}

pub trait FocusController {
    fn focus(&mut self, node: NodeId) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    /// Directly after the template, as its next sibling.
    #[default]
    AfterTemplate,
    /// Last child of the template's parent.
    EndOfParent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatorOptions {
    pub separator: char,
    pub insert_position: InsertPosition,
}

impl Default for DuplicatorOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            insert_position: InsertPosition::default(),
        }
    }
}

/// Outcome of one duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub clone: NodeId,
    /// Counter value after the duplication.
    pub counter: u64,
    pub row_span: u64,
    pub focused: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ElementDuplicator {
    options: DuplicatorOptions,
}

impl ElementDuplicator {
    pub fn new(options: DuplicatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DuplicatorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DuplicatorOptions {
        &mut self.options
    }

    /// Appends a renumbered copy of `template_id`, numbered with the value
    /// held by `counter_id`, then advances that counter and the `rowspan`
    /// of `span_target_id`.
    ///
    /// Every lookup and the counter parse happen before the document is
    /// touched, so an error leaves the page as it was.
    pub fn duplicate<T, F>(
        &self,
        tree: &mut T,
        focus: &mut F,
        template_id: &str,
        counter_id: &str,
        span_target_id: &str,
    ) -> Result<Duplicate>
    where
        T: DocumentTree + ?Sized,
        F: FocusController + ?Sized,
    {
        let template = resolve(tree, template_id)?;
        let counter = resolve(tree, counter_id)?;
        let span_target = resolve(tree, span_target_id)?;

        let raw = tree.value(counter)?;
        let n = parse_counter(counter_id, &raw)?;
        let mut plan = Plan::new(tree, template, counter_id, n, span_target)?;
        plan.counter = Some(counter);

        self.apply(tree, focus, &plan)
    }

    /// Same as [`ElementDuplicator::duplicate`] with the counter value `n`
    /// supplied by the caller instead of read from the document.
    pub fn duplicate_with_counter<T, F>(
        &self,
        tree: &mut T,
        focus: &mut F,
        template_id: &str,
        n: u64,
        span_target_id: &str,
    ) -> Result<Duplicate>
    where
        T: DocumentTree + ?Sized,
        F: FocusController + ?Sized,
    {
        let template = resolve(tree, template_id)?;
        let span_target = resolve(tree, span_target_id)?;
        let plan = Plan::new(tree, template, template_id, n, span_target)?;
        self.apply(tree, focus, &plan)
    }

    fn apply<T, F>(&self, tree: &mut T, focus: &mut F, plan: &Plan) -> Result<Duplicate>
    where
        T: DocumentTree + ?Sized,
        F: FocusController + ?Sized,
    {
        let clone = tree.clone_subtree(plan.template)?;
        self.renumber_subtree(tree, clone, plan.n)?;

        match self.options.insert_position {
            InsertPosition::AfterTemplate => tree.insert_after(plan.template, clone)?,
            InsertPosition::EndOfParent => tree.append_child(plan.parent, clone)?,
        }

        if let Some(counter) = plan.counter {
            tree.set_value(counter, &plan.next.to_string())?;
        }

        tree.set_attribute(plan.span_target, "rowspan", &plan.row_span.to_string())?;

        let focused = first_text_entry(tree, clone).filter(|node| tree.is_focusable(*node));
        if let Some(node) = focused {
            focus.focus(node)?;
        }

        Ok(Duplicate {
            clone,
            counter: plan.next,
            row_span: plan.row_span,
            focused,
        })
    }

    /// Pre-order walk: renumber `id`/`name`, clear text entries, then descend.
    fn renumber_subtree<T>(&self, tree: &mut T, root: NodeId, n: u64) -> Result<()>
    where
        T: DocumentTree + ?Sized,
    {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for name in ["id", "name"] {
                if let Some(current) = tree.attribute(node, name) {
                    let renamed = renumber_suffix(&current, self.options.separator, n);
                    tree.set_attribute(node, name, &renamed)?;
                }
            }
            if tree.is_text_entry(node) {
                tree.set_value(node, "")?;
            }
            stack.extend(tree.children_of(node).into_iter().rev());
        }
        Ok(())
    }
}

/// Everything resolved and validated before the first mutation.
struct Plan {
    template: NodeId,
    parent: NodeId,
    counter: Option<NodeId>,
    span_target: NodeId,
    n: u64,
    next: u64,
    row_span: u64,
}

impl Plan {
    fn new<T>(
        tree: &T,
        template: NodeId,
        counter_label: &str,
        n: u64,
        span_target: NodeId,
    ) -> Result<Self>
    where
        T: DocumentTree + ?Sized,
    {
        let overflow = || Error::CounterParse {
            id: counter_label.to_string(),
            value: n.to_string(),
        };
        let next = n.checked_add(1).ok_or_else(overflow)?;
        // one extra row for the fixed header line
        let row_span = next.checked_add(1).ok_or_else(overflow)?;

        let parent = tree.parent_of(template).ok_or_else(|| {
            Error::InvalidTree("template has no parent to insert the copy into".into())
        })?;
        if !tree.is_element(span_target) {
            return Err(Error::NotAnElement {
                target: "row span target".into(),
                found: "non-element",
            });
        }

        Ok(Self {
            template,
            parent,
            counter: None,
            span_target,
            n,
            next,
            row_span,
        })
    }
}

fn resolve<T>(tree: &T, id: &str) -> Result<NodeId>
where
    T: DocumentTree + ?Sized,
{
    tree.lookup(id).ok_or_else(|| Error::Lookup(id.to_string()))
}

/// First text entry strictly below `root`, in pre-order.
fn first_text_entry<T>(tree: &T, root: NodeId) -> Option<NodeId>
where
    T: DocumentTree + ?Sized,
{
    let mut stack = tree.children_of(root);
    stack.reverse();
    while let Some(node) = stack.pop() {
        if tree.is_text_entry(node) {
            return Some(node);
        }
        stack.extend(tree.children_of(node).into_iter().rev());
    }
    None
}

/// Replaces whatever follows the last `separator` in `value` with `n`.
///
/// A value without the separator becomes the empty string. Pages built on
/// the `prefix_N` convention rely on this to drop ids that must stay unique.
///
/// ```
/// use form_repeater::renumber_suffix;
///
/// assert_eq!(renumber_suffix("author_name_0", '_', 3), "author_name_3");
/// assert_eq!(renumber_suffix("row_", '_', 3), "row_3");
/// assert_eq!(renumber_suffix("staticfield", '_', 3), "");
/// ```
pub fn renumber_suffix(value: &str, separator: char, n: u64) -> String {
    match value.rfind(separator) {
        Some(index) => {
            let prefix = &value[..index + separator.len_utf8()];
            format!("{prefix}{n}")
        }
        None => String::new(),
    }
}

/// Parses the text of a repeat counter holder.
///
/// Surrounding ASCII whitespace is ignored; everything else must be decimal
/// digits that fit in a `u64`.
pub fn parse_counter(id: &str, text: &str) -> Result<u64> {
    let digits = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let invalid = || Error::CounterParse {
        id: id.to_string(),
        value: text.to_string(),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse::<u64>().map_err(|_| invalid())
}

impl DocumentTree for Dom {
    fn lookup(&self, id: &str) -> Option<NodeId> {
        self.by_id(id)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }

    fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node).to_vec()
    }

    fn clone_subtree(&mut self, node: NodeId) -> Result<NodeId> {
        Dom::clone_subtree(self, node)
    }

    fn insert_after(&mut self, target: NodeId, node: NodeId) -> Result<()> {
        Dom::insert_after(self, target, node)
    }

    fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        Dom::append_child(self, parent, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attr(node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.set_attr(node, name, value)
    }

    fn value(&self, node: NodeId) -> Result<String> {
        Dom::value(self, node)
    }

    fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        Dom::set_value(self, node, value)
    }

    fn is_text_entry(&self, node: NodeId) -> bool {
        form_controls::is_text_entry(self, node)
    }

    fn is_focusable(&self, node: NodeId) -> bool {
        self.is_element(node) && !self.disabled(node)
    }
}
