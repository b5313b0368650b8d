use informe::runtime::logging::{log_event, LogLevel, Notices};

#[test]
fn only_warnings_and_errors_are_kept_for_the_user() {
    let mut notices = Notices::new();
    log_event(&mut notices, LogLevel::Debug, "scanning");
    log_event(&mut notices, LogLevel::Info, "indexed 3 subjects");
    assert!(notices.is_empty());

    log_event(&mut notices, LogLevel::Warn, "Failed to index a.xml");
    log_event(&mut notices, LogLevel::Error, "cache unwritable");

    let levels: Vec<LogLevel> = notices.items().iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
    assert_eq!(notices.items()[0].message, "Failed to index a.xml");
}

#[test]
fn notices_serialize_with_lowercase_levels() {
    let mut notices = Notices::new();
    notices.push(LogLevel::Warn, "x");
    let json = serde_json::to_value(&notices).unwrap();
    assert_eq!(json["items"][0]["level"], "warn");
    assert_eq!(json["items"][0]["message"], "x");
}
