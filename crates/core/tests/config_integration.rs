//! ironaudit.toml 통합 설정 테스트
//!
//! - ironaudit.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use ironaudit_core::config::IronauditConfig;
use ironaudit_core::error::{ConfigError, IronauditError};

// =============================================================================
// ironaudit.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../ironaudit.toml.example");
    let config = IronauditConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.vuln_db.path, "/var/lib/ironaudit/vuln-db");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../ironaudit.toml.example");
    let config = IronauditConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_scan_defaults() {
    let content = include_str!("../../../ironaudit.toml.example");
    let config = IronauditConfig::parse(content).expect("should parse");

    assert!(config.scan.enable_dependency_audit);
    assert!(config.scan.enable_vuln_db_query);
    assert!(!config.scan.enable_proxy_scanner_a);
    assert!(!config.scan.enable_proxy_scanner_b);
    assert!(config.scan.enable_workflow_analysis);
    assert!(config.scan.enable_container_scan);
    assert!(config.scan.enable_code_analysis);
    assert!(config.scan.scan_dependencies);
    assert!(config.scan.scan_code);
    assert!(config.scan.scan_containers);
}

#[test]
fn example_config_matches_engine_defaults() {
    let content = include_str!("../../../ironaudit.toml.example");
    let config = IronauditConfig::parse(content).expect("should parse");
    let defaults = IronauditConfig::default();

    assert_eq!(
        config.engine.vuln_db_chunk_size,
        defaults.engine.vuln_db_chunk_size
    );
    assert_eq!(
        config.engine.vuln_db_max_dependencies,
        defaults.engine.vuln_db_max_dependencies
    );
    assert_eq!(config.engine.rate_limit_ms, defaults.engine.rate_limit_ms);
    assert_eq!(config.engine.max_file_size, defaults.engine.max_file_size);
    assert_eq!(config.engine.proxy_a_scan_path, "/api/scan/snyk");
    assert_eq!(config.engine.proxy_b_scan_path, "/api/scan/trivy");
    assert!(!config.engine.retry_terminal_write);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn only_engine_section_keeps_other_defaults() {
    let toml = r#"
[engine]
vuln_db_chunk_size = 25
rate_limit_ms = 0
"#;
    let config = IronauditConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.engine.vuln_db_chunk_size, 25);
    assert_eq!(config.engine.rate_limit_ms, 0);
    assert_eq!(config.engine.max_config_files, 20);
    assert_eq!(config.general.log_level, "info");
    assert!(config.scan.scan_dependencies);
}

#[test]
fn category_gate_can_be_disabled_alone() {
    let toml = r#"
[scan]
scan_code = false
"#;
    let config = IronauditConfig::parse(toml).expect("should parse");
    assert!(!config.scan.scan_code);
    assert!(config.scan.enable_workflow_analysis);
    assert!(config.scan.enable_code_analysis);
}

#[test]
fn partial_config_invalid_value_fails_validation() {
    let toml = r#"
[engine]
max_config_files = 0
"#;
    let config = IronauditConfig::parse(toml).expect("should parse");
    let err = config.validate().expect_err("zero config files must be rejected");
    match err {
        IronauditError::Config(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "engine.max_config_files");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// 환경변수 오버라이드 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "warn"
"#;
    let original = std::env::var("IRONAUDIT_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONAUDIT_GENERAL_LOG_LEVEL", "debug");
    }

    let mut config = IronauditConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONAUDIT_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("IRONAUDIT_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "debug");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("IRONAUDIT_SCAN_SCAN_CONTAINERS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONAUDIT_SCAN_SCAN_CONTAINERS", "false");
    }

    let mut config = IronauditConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.scan.scan_containers;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONAUDIT_SCAN_SCAN_CONTAINERS", val),
            None => std::env::remove_var("IRONAUDIT_SCAN_SCAN_CONTAINERS"),
        }
    }

    assert!(!result);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("IRONAUDIT_ENGINE_RATE_LIMIT_MS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONAUDIT_ENGINE_RATE_LIMIT_MS", "250");
    }

    let mut config = IronauditConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.engine.rate_limit_ms;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONAUDIT_ENGINE_RATE_LIMIT_MS", val),
            None => std::env::remove_var("IRONAUDIT_ENGINE_RATE_LIMIT_MS"),
        }
    }

    assert_eq!(result, 250);
}

#[test]
#[serial_test::serial]
fn env_override_unparsable_value_is_ignored() {
    let original = std::env::var("IRONAUDIT_ENGINE_VULN_DB_CHUNK_SIZE").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONAUDIT_ENGINE_VULN_DB_CHUNK_SIZE", "ten");
    }

    let mut config = IronauditConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.engine.vuln_db_chunk_size;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONAUDIT_ENGINE_VULN_DB_CHUNK_SIZE", val),
            None => std::env::remove_var("IRONAUDIT_ENGINE_VULN_DB_CHUNK_SIZE"),
        }
    }

    assert_eq!(result, 10);
}

#[test]
#[serial_test::serial]
fn env_override_missing_var_keeps_toml_value() {
    let toml = r#"
[vuln_db]
path = "/opt/advisories"
"#;

    // SAFETY: 존재하지 않는 변수를 명시적으로 제거
    unsafe {
        std::env::remove_var("IRONAUDIT_VULN_DB_PATH");
    }

    let mut config = IronauditConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();

    assert_eq!(config.vuln_db.path, "/opt/advisories");
}

// =============================================================================
// 빈 파일 / 잘못된 형식 에러 테스트
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = IronauditConfig::parse("").expect("empty string should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "info");
    assert!(config.scan.enable_dependency_audit);
    assert!(!config.scan.enable_proxy_scanner_b);
}

#[test]
fn comments_only_parses_with_defaults() {
    let toml = r#"
# 주석만 있는 파일
# [engine]
"#;
    let config = IronauditConfig::parse(toml).expect("comments-only should parse");
    config.validate().expect("should validate");
    assert_eq!(config.engine.vuln_db_chunk_size, 10);
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[engine]
vuln_db_chunk_size = "ten"
"#;
    let result = IronauditConfig::parse(toml);
    assert!(matches!(
        result.unwrap_err(),
        IronauditError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.toml");
    let result = IronauditConfig::from_file(&path).await;
    assert!(matches!(
        result.unwrap_err(),
        IronauditError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_or_default_without_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ironaudit.toml");
    let config = IronauditConfig::load_or_default(&path)
        .await
        .expect("defaults should load");
    assert_eq!(config.engine.vuln_db_max_dependencies, 50);
}

#[tokio::test]
#[serial_test::serial]
async fn load_from_disk_applies_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ironaudit.toml");
    tokio::fs::write(&path, "[general]\nlog_format = \"xml\"\n")
        .await
        .expect("write config");

    let result = IronauditConfig::load(&path).await;
    assert!(matches!(
        result.unwrap_err(),
        IronauditError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn example_config_serialize_roundtrip() {
    let content = include_str!("../../../ironaudit.toml.example");
    let config = IronauditConfig::parse(content).expect("should parse");
    let serialized = config.to_toml().expect("should serialize");
    let reparsed = IronauditConfig::parse(&serialized).expect("should reparse");
    reparsed.validate().expect("should validate");

    assert_eq!(config.general.log_level, reparsed.general.log_level);
    assert_eq!(
        config.engine.proxy_b_scan_path,
        reparsed.engine.proxy_b_scan_path
    );
}
