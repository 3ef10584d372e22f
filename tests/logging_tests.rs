//! 日志配置功能测试
use mistwar::infrastructure::config::Logging;
use mistwar::infrastructure::logging::level_directive;

#[test]
fn test_log_level_parsing() {
    // 测试日志级别解析
    for (level, directive) in [
        ("DEBUG", "debug"),
        ("INFO", "info"),
        ("WARN", "warn"),
        ("ERROR", "error"),
        ("debug", "debug"),
        ("Info", "info"),
    ] {
        assert_eq!(level_directive(level), directive);
    }
}

#[test]
fn test_unknown_level_falls_back_to_warn() {
    assert_eq!(level_directive("TRACE!"), "warn");
    assert_eq!(level_directive(""), "warn");
}

#[test]
fn test_log_level_default() {
    // 测试默认日志级别
    let logging = Logging::default();

    assert!(logging.enable);
    assert_eq!(logging.path, None);
    assert_eq!(level_directive(&logging.level), "warn");
}
