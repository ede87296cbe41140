use super::*;

const CONTACT_ROWS: &str = r#"
    <form id='contacts'>
      <input id='contactCount' type='hidden' value='1'>
      <table id='grid'>
        <tr id='row_0'>
          <td><input id='name_0' name='contact.name_0' type='text' value='Alice'></td>
          <td><textarea id='notes_0' name='contact.notes_0'>first contact</textarea></td>
          <td><input id='primary_0' name='contact.primary_0' type='checkbox' value='yes'></td>
          <td id='addColumn' rowspan='2'><button id='add' type='button'>add</button></td>
        </tr>
      </table>
    </form>
    "#;

#[test]
fn duplicate_renumbers_clears_and_focuses_copy() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.duplicate("row_0", "contactCount", "addColumn")?;

    page.assert_exists("#row_1")?;
    page.assert_value("#name_1", "")?;
    page.assert_attr("#name_1", "name", "contact.name_1")?;
    page.assert_value("#notes_1", "")?;
    page.assert_attr("#notes_1", "name", "contact.notes_1")?;
    page.assert_value("#primary_1", "yes")?;
    page.assert_value("#contactCount", "2")?;
    page.assert_focused("#name_1")?;
    assert_eq!(page.row_span("#addColumn")?, Some(3));
    Ok(())
}

#[test]
fn duplicate_leaves_template_untouched() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.duplicate("row_0", "contactCount", "addColumn")?;

    page.assert_value("#name_0", "Alice")?;
    page.assert_attr("#name_0", "name", "contact.name_0")?;
    page.assert_value("#notes_0", "first contact")?;
    Ok(())
}

#[test]
fn copy_is_inserted_right_after_template() -> Result<()> {
    let html = r#"
        <input id='count' value='1'>
        <table>
          <tbody id='body'>
            <tr id='row_0'><td><input id='a_0'></td><td id='span'></td></tr>
            <tr id='footer'><td>total</td></tr>
          </tbody>
        </table>
        "#;
    let mut page = Page::from_html(html)?;
    page.duplicate("row_0", "count", "span")?;

    assert_eq!(page.child_ids("#body")?, vec!["row_0", "row_1", "footer"]);
    Ok(())
}

#[test]
fn end_of_parent_placement_appends_after_last_child() -> Result<()> {
    let html = r#"
        <input id='count' value='1'>
        <div id='list'>
          <div id='item_0'><input id='a_0'></div>
          <p id='hint'>hint</p>
        </div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.set_insert_position(InsertPosition::EndOfParent);
    page.duplicate("item_0", "count", "span")?;

    assert_eq!(page.child_ids("#list")?, vec!["item_0", "hint", "item_1"]);
    Ok(())
}

#[test]
fn identifiers_without_separator_are_blanked() -> Result<()> {
    let html = r#"
        <input id='count' value='4'>
        <div id='row_0'><input id='staticfield' name='plain' value='X'><label id='tag_0'>t</label></div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.duplicate("row_0", "count", "span")?;

    let copy = page
        .node_by_id("row_4")
        .ok_or_else(|| Error::Lookup("row_4".into()))?;
    assert_eq!(
        page.attr_values_in(copy, "id"),
        vec![Some("row_4".into()), Some(String::new()), Some("tag_4".into())]
    );
    assert_eq!(
        page.attr_values_in(copy, "name"),
        vec![None, Some(String::new()), None]
    );
    // the original keeps its id, so lookups still find the template field
    page.assert_value("#staticfield", "X")?;
    Ok(())
}

#[test]
fn only_the_last_separator_is_rewritten() {
    assert_eq!(renumber_suffix("author_first_name_12", '_', 7), "author_first_name_7");
    assert_eq!(renumber_suffix("_", '_', 0), "_0");
    assert_eq!(renumber_suffix("row_abc", '_', 2), "row_2");
    assert_eq!(renumber_suffix("", '_', 2), "");
    assert_eq!(renumber_suffix("row-3", '-', 9), "row-9");
    assert_eq!(renumber_suffix("zeile·3", '·', 9), "zeile·9");
}

#[test]
fn counter_parsing_accepts_digits_only() {
    assert_eq!(parse_counter("c", "0"), Ok(0));
    assert_eq!(parse_counter("c", " 17\n"), Ok(17));
    assert_eq!(parse_counter("c", "007"), Ok(7));
    for bad in ["", " ", "abc", "-1", "+1", "1.5", "1e3", "99999999999999999999999"] {
        assert_eq!(
            parse_counter("c", bad),
            Err(Error::CounterParse {
                id: "c".into(),
                value: bad.into()
            }),
            "input {bad:?}"
        );
    }
}

#[test]
fn non_numeric_counter_fails_without_mutation() -> Result<()> {
    let html = r#"
        <input id='count' value='abc'>
        <div id='rows'><div id='row_0'><input id='a_0' value='keep'></div></div>
        <span id='span' rowspan='9'></span>
        "#;
    let mut page = Page::from_html(html)?;
    let before = page.dump_dom("#rows")?;

    let err = page
        .duplicate("row_0", "count", "span")
        .expect_err("counter text is not a number");
    assert_eq!(
        err,
        Error::CounterParse {
            id: "count".into(),
            value: "abc".into()
        }
    );
    assert_eq!(page.dump_dom("#rows")?, before);
    page.assert_value("#count", "abc")?;
    assert_eq!(page.row_span("#span")?, Some(9));
    assert_eq!(page.active_element(), None);
    Ok(())
}

#[test]
fn missing_ids_fail_with_lookup_error() -> Result<()> {
    let html = r#"
        <input id='count' value='1'>
        <div id='rows'><div id='row_0'><input id='a_0'></div></div>
        <span id='span' rowspan='2'></span>
        "#;
    let mut page = Page::from_html(html)?;

    for (template, counter, span, missing) in [
        ("nope", "count", "span", "nope"),
        ("row_0", "nope", "span", "nope"),
        ("row_0", "count", "nope", "nope"),
    ] {
        let err = page
            .duplicate(template, counter, span)
            .expect_err("lookup must fail");
        assert_eq!(err, Error::Lookup(missing.into()));
    }
    page.assert_value("#count", "1")?;
    assert_eq!(page.row_span("#span")?, Some(2));
    assert_eq!(page.child_ids("#rows")?, vec!["row_0"]);
    Ok(())
}

#[test]
fn counter_at_limit_is_rejected_before_mutation() -> Result<()> {
    let html = format!(
        "<input id='count' value='{}'><div id='rows'><div id='row_0'></div></div><span id='span'></span>",
        u64::MAX
    );
    let mut page = Page::from_html(&html)?;
    let err = page
        .duplicate("row_0", "count", "span")
        .expect_err("counter cannot advance");
    assert!(matches!(err, Error::CounterParse { .. }));
    assert_eq!(page.child_ids("#rows")?, vec!["row_0"]);
    Ok(())
}

#[test]
fn focus_is_unchanged_when_copy_has_no_text_entry() -> Result<()> {
    let html = r#"
        <input id='search' value=''>
        <input id='count' value='1'>
        <div id='row_0'><input id='flag_0' type='checkbox'><select id='kind_0'></select></div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.focus("#search")?;
    page.duplicate("row_0", "count", "span")?;

    page.assert_focused("#search")?;
    page.assert_exists("#flag_1")?;
    Ok(())
}

#[test]
fn focus_skips_non_text_inputs_and_takes_first_in_pre_order() -> Result<()> {
    let html = r#"
        <input id='count' value='2'>
        <div id='row_0'>
          <input id='when_0' type='date'>
          <div><textarea id='body_0'>x</textarea></div>
          <input id='title_0'>
        </div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.duplicate("row_0", "count", "span")?;

    page.assert_focused("#body_2")?;
    page.assert_value("#title_2", "")?;
    Ok(())
}

#[test]
fn disabled_first_text_entry_leaves_focus_alone() -> Result<()> {
    let html = r#"
        <input id='count' value='1'>
        <div id='row_0'><input id='a_0' disabled><input id='b_0'></div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.duplicate("row_0", "count", "span")?;

    assert_eq!(page.active_element(), None);
    Ok(())
}

#[test]
fn repeated_duplication_keeps_counting() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.type_text("#name_0", "Alice")?;
    for _ in 0..3 {
        page.duplicate("row_0", "contactCount", "addColumn")?;
    }

    page.assert_value("#contactCount", "4")?;
    assert_eq!(page.row_span("#addColumn")?, Some(5));
    assert_eq!(
        page.child_ids("#grid")?,
        vec!["row_0", "row_3", "row_2", "row_1"]
    );
    page.assert_focused("#name_3")?;
    Ok(())
}

#[test]
fn typed_values_in_template_do_not_leak_into_copy() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.type_text("#name_0", "Bob")?;
    page.type_text("#notes_0", "typed")?;
    page.duplicate("row_0", "contactCount", "addColumn")?;

    page.assert_value("#name_0", "Bob")?;
    page.assert_value("#name_1", "")?;
    page.assert_value("#notes_1", "")?;
    Ok(())
}

#[test]
fn custom_separator_is_used_for_renumbering() -> Result<()> {
    let html = r#"
        <input id='count' value='5'>
        <div id='row-0'><input id='city-0' name='addr_city-0'></div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.set_separator('-');
    page.duplicate("row-0", "count", "span")?;

    page.assert_attr("#city-5", "name", "addr_city-5")?;
    Ok(())
}

#[test]
fn repeating_form_owns_its_counter() -> Result<()> {
    let html = r#"
        <ul id='list'><li id='entry_0'><input id='label_0' value='one'></li></ul>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    let mut form = RepeatingForm::new("entry_0", "span", 1);

    let first = form.add_row(&mut page)?;
    let second = form.add_row(&mut page)?;

    assert_eq!(form.next(), 3);
    assert_ne!(first, second);
    page.assert_value("#label_2", "")?;
    page.assert_focused("#label_2")?;
    assert_eq!(page.row_span("#span")?, Some(4));
    assert_eq!(page.child_ids("#list")?, vec!["entry_0", "entry_2", "entry_1"]);
    Ok(())
}

#[test]
fn repeating_form_counter_stays_on_failure() -> Result<()> {
    let mut page = Page::from_html("<div><div id='row_0'></div></div>")?;
    let mut form = RepeatingForm::new("row_0", "missing", 3);

    let err = form.add_row(&mut page).expect_err("span target is missing");
    assert_eq!(err, Error::Lookup("missing".into()));
    assert_eq!(form.next(), 3);
    Ok(())
}

#[test]
fn html_parser_builds_form_controls() -> Result<()> {
    let dom = html::parse_html(
        "<!DOCTYPE html><!-- c --><div id='a' class=x><textarea id='t'>\nfish &amp; chips</textarea><input id='i' value=\"a&lt;b\" disabled><br></div>",
    )?;
    let t = dom.by_id("t").ok_or_else(|| Error::Lookup("t".into()))?;
    let i = dom.by_id("i").ok_or_else(|| Error::Lookup("i".into()))?;
    assert_eq!(dom.value(t)?, "fish & chips");
    assert_eq!(dom.value(i)?, "a<b");
    assert!(dom.disabled(i));
    assert_eq!(dom.attr(i, "ID"), Some("i".into()));
    assert!(form_controls::is_text_entry(&dom, t));
    assert!(form_controls::is_text_entry(&dom, i));
    Ok(())
}

#[test]
fn html_parser_reports_unclosed_constructs() {
    assert!(matches!(
        html::parse_html("<div><!-- open"),
        Err(Error::HtmlParse { .. })
    ));
    assert!(matches!(
        html::parse_html("<input id='a"),
        Err(Error::HtmlParse { .. })
    ));
    assert!(matches!(
        html::parse_html("<textarea>abc"),
        Err(Error::HtmlParse { .. })
    ));
}

#[test]
fn duplicate_ids_resolve_to_first_in_document_order() -> Result<()> {
    let mut page = Page::from_html(
        "<input id='count' value='0'><div id='row_0'><input id='x_0' value='a'></div><span id='span'></span>",
    )?;
    page.duplicate("row_0", "count", "span")?;
    // the copy reuses suffix 0, so both rows carry the same ids
    page.assert_value("#x_0", "a")?;
    page.assert_value("#count", "1")?;
    assert_eq!(page.row_span("#span")?, Some(2));
    Ok(())
}

#[test]
fn text_entry_classification_follows_input_type() -> Result<()> {
    let dom = html::parse_html(
        "<input id='a'><input id='b' type='TEXT'><input id='c' type='hidden'><input id='d' type='password'><textarea id='e'></textarea><select id='f'></select><input id='g' type='tel2'><input id='h' type='Email'><input id='i' type=''>",
    )?;
    let kinds = ["a", "b", "c", "d", "e", "f", "g", "h", "i"]
        .into_iter()
        .map(|id| {
            dom.by_id(id)
                .map(|node| form_controls::is_text_entry(&dom, node))
                .ok_or_else(|| Error::Lookup(id.into()))
        })
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(
        kinds,
        vec![true, true, false, false, true, false, true, false, true]
    );
    Ok(())
}

#[test]
fn trace_logs_capture_duplication_when_enabled() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    page.duplicate("row_0", "contactCount", "addColumn")?;
    let _ = page.duplicate("nope", "contactCount", "addColumn");

    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].starts_with("[duplicate] #row_0 -> #row_1"));
    assert!(logs[0].contains("counter=2 rowspan=3 focus=#name_1"));
    assert!(logs[1].contains("failed: element not found: #nope"));
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_logs_are_empty_when_trace_is_disabled() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.duplicate("row_0", "contactCount", "addColumn")?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_drops_oldest_lines() -> Result<()> {
    let mut page = Page::from_html(CONTACT_ROWS)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    assert!(page.set_trace_log_limit(0).is_err());
    page.set_trace_log_limit(1)?;
    page.focus("#name_0")?;
    page.duplicate("row_0", "contactCount", "addColumn")?;

    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("[duplicate]"));
    Ok(())
}

#[test]
fn selectors_other_than_ids_are_rejected() -> Result<()> {
    let page = Page::from_html(CONTACT_ROWS)?;
    assert_eq!(
        page.value("input.name"),
        Err(Error::UnsupportedSelector("input.name".into()))
    );
    assert_eq!(page.value("#missing"), Err(Error::Lookup("missing".into())));
    Ok(())
}

#[test]
fn assertion_failures_carry_a_dom_snippet() -> Result<()> {
    let page = Page::from_html(CONTACT_ROWS)?;
    match page.assert_value("#name_0", "Bob") {
        Err(Error::AssertionFailed {
            target,
            expected,
            actual,
            dom_snippet,
        }) => {
            assert_eq!(target, "#name_0");
            assert_eq!(expected, "Bob");
            assert_eq!(actual, "Alice");
            assert!(dom_snippet.starts_with("<input "));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn dump_dom_reports_current_values() -> Result<()> {
    let mut page = Page::from_html(
        "<input id='count' value='1'><div id='row_0'><input id='n_0' type='text' value='v'></div><span id='span'></span>",
    )?;
    page.duplicate("row_0", "count", "span")?;
    assert_eq!(
        page.dump_dom("#row_1")?,
        "<div id=\"row_1\"><input id=\"n_1\" type=\"text\" value=\"\"></div>"
    );
    assert_eq!(page.dump_dom("#span")?, "<span id=\"span\" rowspan=\"3\"></span>");
    Ok(())
}

#[test]
fn page_attribute_and_focus_helpers() -> Result<()> {
    let mut page = Page::from_html(
        "<input id='count' value='1'><div id='row_0'><input id='a_0' value='v'></div><span id='span'></span>",
    )?;
    page.set_attr("#a_0", "disabled", "")?;
    page.focus("#a_0")?;
    assert_eq!(page.focused_id(), None);

    page.remove_attr("#a_0", "disabled")?;
    page.focus("#a_0")?;
    assert_eq!(page.focused_id(), Some("a_0".into()));
    page.blur();
    assert_eq!(page.active_element(), None);

    page.set_attr("#a_0", "ID", "renamed_0")?;
    assert_eq!(page.node_by_id("a_0"), None);
    let node = page
        .node_by_id("renamed_0")
        .ok_or_else(|| Error::Lookup("renamed_0".into()))?;
    assert_eq!(page.node_value(node)?, "v");
    assert_eq!(page.attr("#renamed_0", "value")?, Some("v".into()));
    Ok(())
}

#[test]
fn unrecognised_input_type_is_cleared_and_focused_like_text() -> Result<()> {
    let html = r#"
        <input id='count' value='1'>
        <div id='row_0'><input id='phone_0' type='tel2' value='keep'></div>
        <span id='span'></span>
        "#;
    let mut page = Page::from_html(html)?;
    page.duplicate("row_0", "count", "span")?;

    page.assert_value("#phone_1", "")?;
    page.assert_focused("#phone_1")?;
    page.assert_value("#phone_0", "keep")?;
    Ok(())
}

#[test]
fn dump_escapes_markup_in_values_and_text() -> Result<()> {
    let mut page = Page::from_html(
        "<div id='box'><input id='q' value='a&quot;b'><p id='t'>1 &lt; 2 &amp; 3</p></div>",
    )?;
    page.type_text("#q", "x<y & \"z\"")?;
    assert_eq!(
        page.dump_dom("#box")?,
        "<div id=\"box\"><input id=\"q\" value=\"x&lt;y &amp; &quot;z&quot;\"><p id=\"t\">1 &lt; 2 &amp; 3</p></div>"
    );
    Ok(())
}

#[test]
fn deep_templates_clone_and_dump_without_overflow() -> Result<()> {
    let depth = 20_000;
    let mut html = String::from("<input id='count' value='1'><div id='rows'><div id='row_0'>");
    html.push_str(&"<div>".repeat(depth));
    html.push_str("<input id='leaf_0'>");
    html.push_str(&"</div>".repeat(depth));
    html.push_str("</div></div><span id='span'></span>");

    let mut page = Page::from_html(&html)?;
    page.duplicate("row_0", "count", "span")?;

    page.assert_focused("#leaf_1")?;
    let dump = page.dump_dom("#row_1")?;
    assert!(dump.starts_with("<div id=\"row_1\"><div><div>"));
    assert!(dump.contains("<input id=\"leaf_1\">"));
    Ok(())
}

#[test]
fn html_parser_keeps_stray_angle_brackets_as_text() -> Result<()> {
    let dom = html::parse_html("<p id='p'>a < b</p><textarea id='t'>\r\n<b>raw</b></TEXTAREA><input id='u' value=x/>")?;
    let p = dom.by_id("p").ok_or_else(|| Error::Lookup("p".into()))?;
    let t = dom.by_id("t").ok_or_else(|| Error::Lookup("t".into()))?;
    let u = dom.by_id("u").ok_or_else(|| Error::Lookup("u".into()))?;
    assert_eq!(dom.dump_node(p), "<p id=\"p\">a &lt; b</p>");
    assert_eq!(dom.value(t)?, "<b>raw</b>");
    assert_eq!(dom.value(u)?, "x");
    assert_eq!(dom.children(t).len(), 1);
    Ok(())
}

#[test]
fn html_parse_errors_report_the_byte_offset() {
    match html::parse_html("<div>ok</div><input id=\"a") {
        Err(Error::HtmlParse { offset, .. }) => assert_eq!(offset, 24),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn only_textarea_bodies_are_read_as_raw_text() -> Result<()> {
    let dom = html::parse_html("<script id='s'>a<b id='inner'></b></script><pre id='p'>\nx</pre>")?;
    let inner = dom.by_id("inner").ok_or_else(|| Error::Lookup("inner".into()))?;
    let pre = dom.by_id("p").ok_or_else(|| Error::Lookup("p".into()))?;
    assert_eq!(dom.tag_name(inner), Some("b"));
    assert_eq!(dom.dump_node(pre), "<pre id=\"p\">\nx</pre>");
    Ok(())
}
