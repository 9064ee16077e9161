/*!
 * Tests for configuration loading and validation
 */

use std::collections::HashMap;
use std::time::Duration;

use subwire::app_config::{Config, LogLevel, PASSWORD_ENV, USERAGENT_ENV, USERNAME_ENV};
use subwire::rpc::RetryPolicy;

use crate::common;

#[test]
fn test_default_shouldBeValid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.language, "en");
    assert_eq!(config.retry.policy(), RetryPolicy::default());
    assert_eq!(config.http_timeout(), Duration::from_secs(30));
    assert!(config.download.atomic);
}

#[test]
fn test_fromFile_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"useragent": "MyPlayer v1", "retry": {"factor": 3.0}, "log_level": "debug"}"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.useragent.as_deref(), Some("MyPlayer v1"));
    assert_eq!(config.retry.factor, 3.0);
    assert_eq!(config.retry.timeout_secs, 15);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.download.name_format, "{upload_filename}");
}

#[test]
fn test_fromFile_withBrokenJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_loadOrDefault_withMissingFile_shouldUseDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let config = Config::load_or_default(Some(dir.path().join("absent.json").as_path())).unwrap();
    assert_eq!(config.api_url, Config::default().api_url);
}

#[test]
fn test_save_thenLoad_shouldPreserveValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let mut config = Config::default();
    config.username = Some("alice".into());
    config.download.name_format = "{media_name}.{lang_2}.{ext}".into();
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.username.as_deref(), Some("alice"));
    assert_eq!(loaded.download, config.download);
}

#[test]
fn test_applyEnv_shouldOnlyFillMissingValues() {
    let env: HashMap<&str, &str> = [
        (USERAGENT_ENV, "EnvAgent v1"),
        (USERNAME_ENV, "env-user"),
        (PASSWORD_ENV, "env-pass"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.username = Some("file-user".into());
    config.password = Some(String::new());
    config.apply_env(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.username.as_deref(), Some("file-user"));
    assert_eq!(config.password.as_deref(), Some("env-pass"));
    assert_eq!(config.useragent.as_deref(), Some("EnvAgent v1"));
}

#[test]
fn test_validate_shouldRejectBadValues() {
    let mut bad_url = Config::default();
    bad_url.api_url = "not a url".into();
    assert!(bad_url.validate().is_err());

    let mut bad_language = Config::default();
    bad_language.language = "eng".into();
    assert!(bad_language.validate().is_err());

    let mut bad_factor = Config::default();
    bad_factor.retry.factor = 0.5;
    assert!(bad_factor.validate().is_err());

    let mut bad_format = Config::default();
    bad_format.download.name_format = "{movie}.srt".into();
    assert!(bad_format.validate().is_err());
}

#[test]
fn test_logLevel_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default(), LogLevel::Info);
}
