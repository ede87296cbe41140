use super::*;

/// Input types a browser recognises besides `text`. Any other `type`,
/// including a missing, empty or misspelled one, puts an `<input>` in the
/// text state.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "button",
    "checkbox",
    "color",
    "date",
    "datetime-local",
    "email",
    "file",
    "hidden",
    "image",
    "month",
    "number",
    "password",
    "radio",
    "range",
    "reset",
    "search",
    "submit",
    "tel",
    "time",
    "url",
    "week",
];

/// Text-state `<input>` elements and textareas.
pub(super) fn is_text_entry(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };
    match element.tag.as_str() {
        "textarea" => true,
        "input" => element.attrs.get("type").is_none_or(|kind| {
            !NON_TEXT_INPUT_TYPES.contains(&kind.to_ascii_lowercase().as_str())
        }),
        _ => false,
    }
}
