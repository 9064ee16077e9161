/*!
 * Session lifecycle and session-less calls through the client
 */

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use subwire::app_config::{Config, PASSWORD_ENV, USERAGENT_ENV, USERNAME_ENV};
use subwire::batch::{BatchLimits, DEV_USERAGENT};
use subwire::client::{AuthClient, Client, Credentials};
use subwire::errors::{ClientError, ErrorKind};
use subwire::language::LanguageConverter;
use subwire::rpc::mock::MockTransport;

use crate::common::{self, TEST_TOKEN, TEST_USERAGENT, ok, status_only};

#[test]
fn test_login_shouldSendCredentialsAndKeepToken() {
    let (client, transport) = common::logged_in_with(|_, _| Ok(status_only("200 OK")));

    assert_eq!(client.token(), Some(TEST_TOKEN));
    assert_eq!(client.limits(), BatchLimits::default());

    let login = &transport.calls_to("LogIn")[0];
    assert_eq!(
        login.params,
        vec![json!("alice"), json!("s3cret"), json!("en"), json!(TEST_USERAGENT)]
    );
}

#[test]
fn test_login_withDevelopmentUseragent_shouldRestrictBatches() {
    let transport = Arc::new(MockTransport::always(Ok(common::login_reply())));
    let credentials = Credentials::new("alice", "s3cret", DEV_USERAGENT);

    let client = AuthClient::login(common::mock_client(&transport), &credentials).unwrap();
    assert_eq!(client.limits(), BatchLimits::restricted());
}

#[test]
fn test_login_withRejectedCredentials_shouldBeAuthError() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("401 Unauthorized"))));

    let error = AuthClient::login(common::mock_client(&transport), &common::test_credentials()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Auth);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_login_withoutToken_shouldBreakContract() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("200 OK"))));

    let error = AuthClient::login(common::mock_client(&transport), &common::test_credentials()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::LibraryContract);
}

#[test]
fn test_logout_shouldSendToken() {
    let (client, transport) = common::logged_in_with(|_, _| Ok(status_only("200 OK")));
    client.logout().unwrap();

    let logout = transport.calls_to("LogOut");
    assert_eq!(logout.len(), 1);
    assert_eq!(logout[0].params, vec![json!(TEST_TOKEN)]);
}

#[test]
fn test_ping_shouldCallNoOperationWithToken() {
    let (client, transport) = common::logged_in_with(|_, _| Ok(status_only("200 OK")));
    client.ping().unwrap();
    assert_eq!(transport.calls_to("NoOperation")[0].params, vec![json!(TEST_TOKEN)]);
}

#[test]
fn test_userInfo_shouldParseAccount() {
    let (client, _) = common::logged_in_with(|method, _| match method {
        "GetUserInfo" => Ok(ok(json!({
            "IDUser": "6", "UserNickName": "alice", "UserRank": "trusted",
            "UploadCnt": "3", "DownloadCnt": "99",
            "UserPreferedLanguages": "ger,eng", "UserWebLanguage": "en"
        }))),
        _ => Ok(status_only("200 OK")),
    });

    let user = client.user_info().unwrap();
    assert_eq!(user.nickname, "alice");
    assert_eq!(user.preferred_languages, vec!["ger", "eng"]);
}

#[test]
fn test_credentialsResolve_shouldFallBackToLookup() {
    let env: HashMap<&str, &str> = [(USERNAME_ENV, "env-user"), (PASSWORD_ENV, "env-pass")]
        .into_iter()
        .collect();
    let mut config = Config::default();
    config.useragent = Some("MyPlayer v1".into());

    let credentials = Credentials::resolve(&config, |key| env.get(key).map(|v| v.to_string())).unwrap();
    assert_eq!(credentials.username, "env-user");
    assert_eq!(credentials.password, "env-pass");
    assert_eq!(credentials.useragent, "MyPlayer v1");
    assert_eq!(credentials.language, "en");
}

#[test]
fn test_credentialsResolve_withoutUseragent_shouldNameTheVariable() {
    let mut config = Config::default();
    config.username = Some("alice".into());
    config.password = Some("s3cret".into());

    match Credentials::resolve(&config, |_| None) {
        Err(ClientError::Auth(message)) => assert!(message.contains(USERAGENT_ENV)),
        other => panic!("expected Auth error, got {:?}", other),
    }
}

#[test]
fn test_credentialsDebug_shouldHidePassword() {
    let rendered = format!("{:?}", common::test_credentials());
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("s3cret"));
}

#[test]
fn test_clientLanguages_shouldFetchWithoutToken() {
    let transport = Arc::new(MockTransport::always(Ok(common::languages_reply())));
    let (dispatcher, _) = common::mock_dispatcher(&transport);
    let client = Client::new(dispatcher).with_language_converter(Arc::new(LanguageConverter::new()));

    let languages = client.languages().unwrap();
    assert_eq!(languages[1], ("de".to_string(), "ger".to_string(), "German".to_string()));
    assert_eq!(transport.calls_to("GetSubLanguages").len(), 1);
    assert!(transport.calls()[0].params.is_empty());
}

#[test]
fn test_clientServerInfo_shouldReportQuota() {
    let transport = Arc::new(MockTransport::always(Ok(common::server_info_reply(12))));
    let client = common::mock_client(&transport);

    assert_eq!(client.daily_download_info().unwrap().remaining, 12);
    assert_eq!(transport.calls()[0].method, "ServerInfo");
}

#[test]
fn test_clientAutoUpdate_shouldPassProgramName() {
    let transport = Arc::new(MockTransport::always(Ok(json!({
        "status": "200 OK", "version": "1.2.3", "url_windows": "", "comments": ""
    }))));
    let client = common::mock_client(&transport);

    let info = client.auto_update("SubDownloader").unwrap();
    assert_eq!(info.get("version"), Some(&json!("1.2.3")));
    assert_eq!(transport.calls()[0].params, vec![Value::from("SubDownloader")]);
}
