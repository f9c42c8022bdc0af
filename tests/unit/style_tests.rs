/*!
 * Tests for style element injection
 */

use dynrtl::content::{FontConfig, StyleInjector, STYLE_ELEMENT_ID};
use dynrtl::dom::{Document, parse_html, to_html};

fn style_elements(doc: &Document) -> usize {
    doc.find_elements(|doc, id| doc.attr(id, "id") == Some(STYLE_ELEMENT_ID))
        .len()
}

#[test]
fn test_repeated_apply_should_keep_one_element_and_same_output() {
    let mut doc = parse_html("<html><head></head><body><p>سلام</p></body></html>");
    let font = FontConfig::default();

    let first = StyleInjector::apply(&mut doc, &font);
    let html_after_first = to_html(&doc).unwrap();
    for _ in 0..3 {
        assert_eq!(StyleInjector::apply(&mut doc, &font), first);
    }

    assert_eq!(style_elements(&doc), 1);
    assert_eq!(to_html(&doc).unwrap(), html_after_first);
}

#[test]
fn test_font_switch_should_update_in_place() {
    let mut doc = parse_html("<html><body></body></html>");
    let bundled = StyleInjector::apply(&mut doc, &FontConfig::default());
    let custom = StyleInjector::apply(
        &mut doc,
        &FontConfig::embedded("My Font", "data:font/ttf;base64,AAEC"),
    );

    assert_eq!(bundled, custom);
    assert_eq!(style_elements(&doc), 1);
    let css = doc.text_content(custom);
    assert!(css.contains("format('truetype')"));
    assert!(css.contains("'My Font'"));
}

#[test]
fn test_remove_should_be_idempotent() {
    let mut doc = parse_html("<html><body></body></html>");
    StyleInjector::apply(&mut doc, &FontConfig::default());
    assert!(StyleInjector::remove(&mut doc));
    assert!(!StyleInjector::remove(&mut doc));
    assert_eq!(style_elements(&doc), 0);
}
