/*!
 * Tests for Persian/Arabic script detection
 */

use dynrtl::detector::{classify, is_rtl_script, should_be_rtl, starts_with_rtl_script};

#[test]
fn test_is_rtl_script_should_cover_all_arabic_blocks() {
    // Arabic, Supplement, Extended-A, Presentation Forms A and B
    for sample in ["\u{0628}", "\u{0750}", "\u{08A0}", "\u{FB50}", "\u{FE70}", "۱۲۳"] {
        assert!(is_rtl_script(sample), "{:?} should be RTL script", sample);
    }
    assert!(!is_rtl_script(""));
    assert!(!is_rtl_script("Hello, world 123"));
    assert!(!is_rtl_script("שלום"));
}

#[test]
fn test_starts_with_rtl_script_should_look_at_first_word() {
    assert!(starts_with_rtl_script("سلام world"));
    assert!(starts_with_rtl_script("   سلام"));
    assert!(!starts_with_rtl_script("Hello سلام"));
    assert!(!starts_with_rtl_script("   "));
}

#[test]
fn test_should_be_rtl_should_apply_dominance_ratio() {
    // Starts Latin but RTL characters outnumber Latin letters by more than 1.5x
    assert!(should_be_rtl("ok این متن کاملا فارسی است"));
    // Starts Latin and RTL is not dominant
    assert!(!should_be_rtl("Hello world, this is mostly English با کمی"));
    // Exactly 1.5x is not enough: 2 Latin letters, 3 RTL characters
    assert!(!should_be_rtl("ab سلا"));
    assert!(should_be_rtl("ab سلام"));
    assert!(!should_be_rtl(""));
}

#[test]
fn test_classify_should_combine_both_flags() {
    let mixed = classify("Title: عنوان");
    assert!(mixed.is_rtl_script);
    assert!(!mixed.starts_with_rtl_script);

    let persian = classify("عنوان صفحه");
    assert!(persian.is_rtl_script);
    assert!(persian.starts_with_rtl_script);

    assert_eq!(classify("plain"), Default::default());
}
