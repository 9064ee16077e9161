/*!
 * Tests for the retrying dispatcher
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use subwire::errors::{ClientError, ErrorKind, TransportError};
use subwire::rpc::mock::MockTransport;
use subwire::rpc::{Dispatcher, Endpoint, ManualClock, RetryPolicy};

use crate::common::{self, ok, status_only};

#[test]
fn test_dispatch_with429ThenSuccess_shouldRetryOnce() {
    common::init_logging();
    let transport = Arc::new(
        MockTransport::scripted()
            .push_value(status_only("429 Too many requests"))
            .push_value(ok(json!([]))),
    );
    let (dispatcher, clock) = common::mock_dispatcher(&transport);

    let response = dispatcher
        .dispatch(Endpoint::SearchSubtitles, Some("tok"), vec![json!([])])
        .unwrap();

    assert_eq!(response.get("status"), Some(&json!("200 OK")));
    assert_eq!(transport.call_count(), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
}

#[test]
fn test_dispatch_withPersistent429_shouldGiveUpWithServerOverload() {
    common::init_logging();
    let transport = Arc::new(MockTransport::always(Ok(status_only("429 Too many requests"))));
    let (dispatcher, clock) = common::mock_dispatcher(&transport);

    let error = dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ServerOverload);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(1500), Duration::from_secs(3), Duration::from_secs(6)]
    );
    assert_eq!(transport.call_count(), 4);
    assert!(clock.elapsed() <= Duration::from_secs(15));
}

#[test]
fn test_dispatch_withShortRealPolicy_shouldStayInsideBudget() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("503 Service Unavailable"))));
    let dispatcher = Dispatcher::new(transport.clone()).with_policy(RetryPolicy {
        timeout: Duration::from_millis(60),
        initial_delay: Duration::from_millis(10),
        factor: 2.0,
    })
    .unwrap();

    let started = Instant::now();
    let error = dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap_err();

    assert!(matches!(error, ClientError::ServerOverload(_)));
    assert!(transport.call_count() >= 2);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_withPolicy_withUnusableFactor_shouldBeInvalidInput() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("200 OK"))));
    for factor in [f64::NAN, -2.0, 0.5, f64::INFINITY] {
        let policy = RetryPolicy {
            factor,
            ..RetryPolicy::default()
        };
        let error = Dispatcher::new(transport.clone()).with_policy(policy).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput, "factor {}", factor);
    }

    let zero_delay = RetryPolicy {
        initial_delay: Duration::ZERO,
        ..RetryPolicy::default()
    };
    assert!(Dispatcher::new(transport).with_policy(zero_delay).is_err());
}

#[test]
fn test_dispatch_withHugeFactor_shouldStopInsteadOfPanicking() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("429 Too many requests"))));
    let clock = Arc::new(ManualClock::new());
    let dispatcher = Dispatcher::new(transport.clone())
        .with_clock(clock.clone())
        .with_policy(RetryPolicy {
            timeout: Duration::from_secs(15),
            initial_delay: Duration::from_millis(1500),
            factor: f64::MAX,
        })
        .unwrap();

    let error = dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ServerOverload);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_dispatch_withAuthenticatedEndpoint_shouldPrependToken() {
    let transport = Arc::new(MockTransport::always(Ok(status_only("200 OK"))));
    let (dispatcher, _) = common::mock_dispatcher(&transport);

    dispatcher
        .dispatch(Endpoint::SubtitlesVote, Some("tok"), vec![json!("12"), json!(9)])
        .unwrap();
    dispatcher.dispatch(Endpoint::SubtitlesVote, None, vec![json!("12")]).unwrap();
    dispatcher
        .dispatch(Endpoint::LogIn, None, vec![json!("u"), json!("p"), json!("en"), json!("ua")])
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].method, "SubtitlesVote");
    assert_eq!(calls[0].params, vec![json!("tok"), json!("12"), json!(9)]);
    assert_eq!(calls[1].params, vec![Value::Null, json!("12")]);
    assert_eq!(calls[2].params.len(), 4);
    assert_eq!(calls[2].params[0], json!("u"));
}

#[test]
fn test_dispatch_withSilentEndpoint_shouldReturnResponseAsIs() {
    let transport = Arc::new(MockTransport::always(Ok(common::server_info_reply(10))));
    let (dispatcher, _) = common::mock_dispatcher(&transport);

    let response = dispatcher.dispatch(Endpoint::ServerInfo, None, Vec::new()).unwrap();
    assert!(response.get("status").is_none());
    assert!(response.contains_key("download_limits"));
}

#[test]
fn test_dispatch_withErrorStatus_shouldMapToKind() {
    let cases = [
        ("401 Unauthorized", ErrorKind::Auth),
        ("407 Download limit reached", ErrorKind::Download),
        ("402 Subtitles has invalid format", ErrorKind::Upload),
        ("412 Invalid parameters", ErrorKind::LibraryContract),
        ("999 Something new", ErrorKind::Library),
    ];

    for (status, kind) in cases {
        let transport = Arc::new(MockTransport::always(Ok(status_only(status))));
        let (dispatcher, clock) = common::mock_dispatcher(&transport);
        let error = dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap_err();
        assert_eq!(error.kind(), kind, "{}", status);
        assert_eq!(transport.call_count(), 1, "{}", status);
        assert!(clock.sleeps().is_empty());
    }
}

#[test]
fn test_dispatch_withTransportFault_shouldRetryKnownCodes() {
    let transport = Arc::new(
        MockTransport::scripted()
            .push_error(TransportError::Protocol { code: 503, message: "Service Unavailable".into() })
            .push_error(TransportError::Connection("reset by peer".into()))
            .push_value(status_only("200 OK")),
    );
    let (dispatcher, clock) = common::mock_dispatcher(&transport);

    dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap();
    assert_eq!(transport.call_count(), 3);
    assert_eq!(clock.sleeps().len(), 2);
}

#[test]
fn test_dispatch_withUnknownProtocolError_shouldFailWithoutRetry() {
    let transport = Arc::new(MockTransport::always(Err(TransportError::Protocol {
        code: 418,
        message: "I'm a teapot".into(),
    })));
    let (dispatcher, _) = common::mock_dispatcher(&transport);

    let error = dispatcher.dispatch(Endpoint::NoOperation, Some("tok"), Vec::new()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Library);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_dispatch_withMissingStatus_shouldBreakContract() {
    let transport = Arc::new(MockTransport::always(Ok(json!({"data": []}))));
    let (dispatcher, _) = common::mock_dispatcher(&transport);

    let error = dispatcher.dispatch(Endpoint::SearchSubtitles, Some("tok"), Vec::new()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::LibraryContract);
}

#[test]
fn test_dispatch_withNonStructResponse_shouldBreakContract() {
    let transport = Arc::new(MockTransport::always(Ok(json!("surprise"))));
    let (dispatcher, _) = common::mock_dispatcher(&transport);

    let error = dispatcher.dispatch(Endpoint::ServerInfo, None, Vec::new()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::LibraryContract);
}
