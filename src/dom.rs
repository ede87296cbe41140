use super::*;
use std::collections::BTreeMap;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

const ROOT: NodeId = NodeId(0);

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag: String,
    /// Lowercased names. Ordered so markup dumps are stable.
    pub(crate) attrs: BTreeMap<String, String>,
    /// Live control value, detached from the `value` attribute once edited.
    pub(crate) value: String,
    pub(crate) disabled: bool,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena document. Node 0 is the document node; nodes are never freed, a
/// node that is not reachable from it is simply detached.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        ROOT
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let node = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(node);
        }
        node
    }

    pub(crate) fn add_element(
        &mut self,
        parent: NodeId,
        tag: String,
        attrs: BTreeMap<String, String>,
    ) -> NodeId {
        let element = Element {
            value: attrs.get("value").cloned().unwrap_or_default(),
            disabled: attrs.contains_key("disabled"),
            tag,
            attrs,
        };
        self.push(Some(parent), NodeKind::Element(element))
    }

    pub(crate) fn add_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.push(Some(parent), NodeKind::Text(text))
    }

    pub(crate) fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId, op: &str) -> Result<&mut Element> {
        let found = self.kind_name(node);
        match self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Ok(element),
            _ => Err(Error::NotAnElement {
                target: format!("{op} on node-{}", node.0),
                found,
            }),
        }
    }

    pub(crate) fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| n.children.as_slice())
    }

    pub(crate) fn is_valid_node(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    /// First connected element in document order carrying `id`.
    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.elements_in(ROOT)
            .into_iter()
            .find(|node| self.attr(*node, "id").as_deref() == Some(id))
    }

    /// Elements of the subtree at `node` in pre-order, `node` included.
    pub(crate) fn elements_in(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![node];
        while let Some(next) = pending.pop() {
            if self.element(next).is_some() {
                out.push(next);
            }
            pending.extend(self.children(next).iter().rev());
        }
        out
    }

    pub(crate) fn value(&self, node: NodeId) -> Result<String> {
        match self.element(node) {
            Some(element) => Ok(element.value.clone()),
            None => Err(Error::NotAnElement {
                target: format!("value of node-{}", node.0),
                found: self.kind_name(node),
            }),
        }
    }

    pub(crate) fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.element_mut(node, "set value")?.value = value.to_string();
        Ok(())
    }

    pub(crate) fn disabled(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.disabled)
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?
            .attrs
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub(crate) fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(node, "set attribute")?;
        match name.as_str() {
            "value" => element.value = value.to_string(),
            "disabled" => element.disabled = true,
            _ => {}
        }
        element.attrs.insert(name, value.to_string());
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(node, "remove attribute")?;
        match name.as_str() {
            "value" => element.value.clear(),
            "disabled" => element.disabled = false,
            _ => {}
        }
        element.attrs.remove(&name);
        Ok(())
    }

    /// Deep copy of `source`, left detached.
    pub(crate) fn clone_subtree(&mut self, source: NodeId) -> Result<NodeId> {
        if source == ROOT || !self.is_valid_node(source) {
            return Err(Error::InvalidTree(format!(
                "node-{} cannot be cloned",
                source.0
            )));
        }
        Ok(self.copy_node(source, None))
    }

    fn copy_node(&mut self, source: NodeId, parent: Option<NodeId>) -> NodeId {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let kind = self.nodes[source.0].kind.clone();
            let copy = self.push(parent, kind);
            for child in self.nodes[source.0].children.clone() {
                self.copy_node(child, Some(copy));
            }
            copy
        })
    }

    /// Attaches the detached `node` as the next sibling of `target`.
    pub(crate) fn insert_after(&mut self, target: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(target)
            .ok_or_else(|| Error::InvalidTree(format!("node-{} has no parent", target.0)))?;
        let at = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == target)
            .ok_or_else(|| Error::InvalidTree(format!("node-{} is not indexed", target.0)))?;
        self.attach(parent, at + 1, node)
    }

    /// Attaches the detached `node` as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        let at = self.children(parent).len();
        self.attach(parent, at, node)
    }

    fn attach(&mut self, parent: NodeId, at: usize, node: NodeId) -> Result<()> {
        if !self.is_valid_node(node) || node == ROOT {
            return Err(Error::InvalidTree(format!("node-{} cannot be attached", node.0)));
        }
        if self.parent(node).is_some() {
            return Err(Error::InvalidTree(format!("node-{} is already attached", node.0)));
        }
        if matches!(
            self.nodes.get(parent.0).map(|n| &n.kind),
            None | Some(NodeKind::Text(_))
        ) {
            return Err(Error::InvalidTree(format!(
                "node-{} cannot hold children",
                parent.0
            )));
        }
        if std::iter::successors(Some(parent), |n| self.parent(*n)).any(|n| n == node) {
            return Err(Error::InvalidTree(format!(
                "node-{} would become its own ancestor",
                node.0
            )));
        }
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(at, node);
        Ok(())
    }

    pub(crate) fn node_label(&self, node: NodeId) -> String {
        match (self.attr(node, "id"), self.tag_name(node)) {
            (Some(id), _) if !id.is_empty() => format!("#{id}"),
            (_, Some(tag)) => tag.to_string(),
            _ => format!("node-{}", node.0),
        }
    }

    fn kind_name(&self, node: NodeId) -> &'static str {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Document) => "document",
            Some(NodeKind::Element(_)) => "element",
            Some(NodeKind::Text(_)) => "text",
            None => "missing",
        }
    }

    /// Markup for diagnostics. Form controls show their live value in
    /// place of the `value` attribute.
    pub(crate) fn dump_node(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let element = match &self.nodes[node.0].kind {
                NodeKind::Text(text) => {
                    push_escaped(out, text, false);
                    return;
                }
                NodeKind::Document => None,
                NodeKind::Element(element) => Some(element),
            };
            if let Some(element) = element {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attrs {
                    let value = if name == "value" { &element.value } else { value };
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    push_escaped(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&element.tag) {
                    return;
                }
            }
            for child in &self.nodes[node.0].children {
                self.write_markup(*child, out);
            }
            if let Some(element) = element {
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        })
    }
}

fn push_escaped(out: &mut String, raw: &str, in_attribute: bool) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
