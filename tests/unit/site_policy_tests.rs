/*!
 * Tests for site enablement resolution
 */

use dynrtl::settings::Settings;
use dynrtl::site_policy::SitePolicy;

#[test]
fn test_enablement_should_follow_default_mode_and_lists() {
    let cases = [
        (true, vec!["a.com"], vec![], "a.com", false),
        (true, vec!["a.com"], vec![], "b.com", true),
        (true, vec![], vec!["a.com"], "a.com", true),
        (false, vec![], vec!["a.com"], "a.com", true),
        (false, vec![], vec!["a.com"], "b.com", false),
        (false, vec!["a.com"], vec![], "a.com", false),
    ];

    for (default_enabled, disabled, enabled, host, expected) in cases {
        let policy = SitePolicy {
            default_enabled,
            disabled_sites: disabled.iter().map(|s| s.to_string()).collect(),
            enabled_sites: enabled.iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(
            policy.is_enabled_for(host),
            expected,
            "default_enabled={} host={}",
            default_enabled,
            host
        );
    }
}

#[test]
fn test_toggle_round_trip_through_settings_should_restore_state() {
    let settings = Settings::in_memory();
    settings.initialize_defaults().unwrap();

    let mut policy = settings.site_policy().unwrap();
    policy.set_site_enabled("example.com", false);
    settings.save_site_policy(&policy).unwrap();
    assert!(!settings.site_policy().unwrap().is_enabled_for("example.com"));

    let mut policy = settings.site_policy().unwrap();
    policy.set_site_enabled("example.com", true);
    settings.save_site_policy(&policy).unwrap();

    let policy = settings.site_policy().unwrap();
    assert!(policy.is_enabled_for("example.com"));
    assert!(policy.disabled_sites.is_empty());
}

#[test]
fn test_switching_mode_should_not_touch_the_other_list() {
    let mut policy = SitePolicy::default();
    policy.set_site_enabled("off.example", false);
    policy.default_enabled = false;
    policy.set_site_enabled("on.example", true);

    assert_eq!(policy.disabled_sites, vec!["off.example"]);
    assert_eq!(policy.enabled_sites, vec!["on.example"]);
    assert!(policy.is_enabled_for("on.example"));
    assert!(!policy.is_enabled_for("off.example"));
}
