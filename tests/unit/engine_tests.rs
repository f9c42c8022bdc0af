/*!
 * Tests for live RTL marking through a page session
 */

use std::time::{Duration, Instant};

use dynrtl::content::{InputEvent, PageSession, RTL_ATTR, RTL_INPUT_CLASS, STYLE_ELEMENT_ID};
use dynrtl::dom::parse_html;

use crate::common::{PERSIAN_PARAGRAPH, by_id, mixed_page};

fn is_marked(session: &PageSession, id: &str) -> bool {
    let doc = session.document().lock();
    doc.attr(by_id(&doc, id), RTL_ATTR) == Some("true")
}

#[test]
fn test_start_should_mark_persian_and_inject_style() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));

    assert_eq!(session.start(true), 1);
    assert!(is_marked(&session, "fa"));
    assert!(!is_marked(&session, "en"));
    assert!(session.document().lock().get_element_by_id(STYLE_ELEMENT_ID).is_some());
}

#[test]
fn test_start_on_persian_page_should_stay_idle() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("fa-IR")));

    assert!(session.is_idle());
    assert_eq!(session.start(true), 0);
    assert!(!is_marked(&session, "fa"));
    assert!(session.document().lock().get_element_by_id(STYLE_ELEMENT_ID).is_none());
}

#[test]
fn test_added_persian_node_should_be_marked_live() {
    let session = PageSession::with_defaults(parse_html("<html><body><div id=\"feed\"></div></body></html>"));
    session.start(true);

    session.mutate(Instant::now(), |doc| {
        let feed = by_id(doc, "feed");
        let item = doc.create_element_with_attrs("p", &[("id", "item")]);
        let text = doc.create_text(PERSIAN_PARAGRAPH);
        doc.append_child(item, text);
        doc.append_child(feed, item);
    });

    assert!(is_marked(&session, "item"));
    assert!(!is_marked(&session, "feed"));
}

#[test]
fn test_text_change_should_add_and_clear_marker() {
    let session = PageSession::with_defaults(parse_html("<html><body><p id=\"msg\">hello</p></body></html>"));
    session.start(true);
    let text = {
        let doc = session.document().lock();
        doc.children(by_id(&doc, "msg"))[0]
    };

    session.mutate(Instant::now(), |doc| doc.set_text(text, PERSIAN_PARAGRAPH));
    assert!(is_marked(&session, "msg"));

    session.mutate(Instant::now(), |doc| doc.set_text(text, "back to English"));
    assert!(!is_marked(&session, "msg"));
}

#[test]
fn test_disabled_session_should_ignore_mutations() {
    let session = PageSession::with_defaults(parse_html("<html><body><div id=\"feed\"></div></body></html>"));
    session.start(false);

    session.mutate(Instant::now(), |doc| {
        let feed = by_id(doc, "feed");
        let text = doc.create_text(PERSIAN_PARAGRAPH);
        doc.append_child(feed, text);
    });

    assert!(!is_marked(&session, "feed"));
}

#[test]
fn test_input_events_should_toggle_field_direction() {
    let session = PageSession::with_defaults(parse_html(
        "<html><body><input id=\"q\" type=\"text\"></body></html>",
    ));
    session.start(true);
    let field = {
        let doc = session.document().lock();
        by_id(&doc, "q")
    };
    let has_class = |session: &PageSession| session.document().lock().has_class(field, RTL_INPUT_CLASS);

    session.document().lock().set_value(field, "سلام دنیا");
    session.handle_input_event(field, InputEvent::Input, Instant::now());
    assert!(has_class(&session));
    assert!(is_marked(&session, "q"));

    session.document().lock().set_value(field, "hello");
    session.handle_input_event(field, InputEvent::Input, Instant::now());
    assert!(!has_class(&session));
    assert!(!is_marked(&session, "q"));
}

#[test]
fn test_paste_should_be_evaluated_on_tick() {
    let session = PageSession::with_defaults(parse_html(
        "<html><body><textarea id=\"t\"></textarea></body></html>",
    ));
    session.start(true);
    let field = {
        let doc = session.document().lock();
        by_id(&doc, "t")
    };

    let now = Instant::now();
    session.handle_input_event(field, InputEvent::Paste, now);
    session.document().lock().set_value(field, PERSIAN_PARAGRAPH);
    assert!(!is_marked(&session, "t"));

    assert!(session.tick(now + Duration::from_millis(1)) >= 1);
    assert!(is_marked(&session, "t"));
}

#[test]
fn test_disable_then_enable_should_restore_markers() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    session.start(true);

    assert_eq!(session.set_enabled(false), 1);
    assert!(!is_marked(&session, "fa"));
    assert!(session.document().lock().get_element_by_id(STYLE_ELEMENT_ID).is_none());

    assert_eq!(session.set_enabled(true), 1);
    assert!(is_marked(&session, "fa"));
}
