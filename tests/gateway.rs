//! End-to-end behavior of the CAS gateway.
//!
//! Every test builds the gateway the way a request handler would: request
//! context, session store, deployment and the recording engine.

use axum::http::Method;
use casgate::cas::{
    recording::Call, AuthOutcome, Cas, ClientSetup, Config, Deployment, Error, MemorySessionStore,
    Mode, RecordingEngine, RequestContext, SessionStore, VersionToken,
};
use serde_json::{json, Value};

const CRAWLER: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

fn request() -> RequestContext {
    RequestContext::new(Method::GET, "app.example.org", "/account")
        .with_tls(true)
        .with_user_agent(BROWSER)
}

fn build(
    config: Config,
    engine: RecordingEngine,
    request: &RequestContext,
) -> Cas<RecordingEngine> {
    let mut session = MemorySessionStore::new();
    match Cas::new(config, engine, request, &mut session, &Deployment::default()) {
        Ok(cas) => cas,
        Err(err) => panic!("gateway construction failed: {err}"),
    }
}

fn config_from(value: Value) -> Config {
    match Config::from_value(value) {
        Ok(config) => config,
        Err(err) => panic!("invalid config: {err}"),
    }
}

#[test]
fn default_deployment_configures_cas_2_client() {
    let config = config_from(json!({
        "CAS_VERSION": "2.0",
        "CAS_HOST": "cas.example.org",
        "CAS_PORT": 443,
    }));
    let cas = build(config, RecordingEngine::new(), &request());

    let plan = cas.plan().cloned();
    assert_eq!(
        plan.as_ref().map(|plan| &plan.setup),
        Some(&ClientSetup {
            mode: Mode::Client,
            version: VersionToken::Cas20,
            host: "cas.example.org".to_string(),
            port: 443,
            context: "/cas".to_string(),
            control_session: true,
        })
    );
    assert_eq!(plan.as_ref().map(|plan| plan.version_fallback), Some(false));
    assert_eq!(plan.and_then(|plan| plan.logout_policy), None);

    let calls = cas.engine().map(RecordingEngine::calls).unwrap_or_default();
    assert!(!calls
        .iter()
        .any(|call| matches!(call, Call::HandleLogoutRequests(_))));
}

#[test]
fn proxy_mode_from_flag_or_mode() {
    for value in [
        json!({"CAS_HOST": "cas.example.org", "CAS_PROXY": "true"}),
        json!({"CAS_HOST": "cas.example.org", "CAS_MODE": "proxy"}),
        json!({"CAS_HOST": "cas.example.org", "CAS_MODE": "", "CAS_PROXY": 1}),
    ] {
        let cas = build(config_from(value), RecordingEngine::new(), &request());
        assert_eq!(cas.plan().map(|plan| plan.setup.mode), Some(Mode::Proxy));
    }
}

#[test]
fn missing_or_unknown_version_falls_back_to_cas_2() {
    for value in [
        json!({"CAS_HOST": "cas.example.org"}),
        json!({"CAS_HOST": "cas.example.org", "CAS_VERSION": "9.9"}),
    ] {
        let cas = build(config_from(value), RecordingEngine::new(), &request());
        let plan = cas.plan();
        assert_eq!(
            plan.map(|plan| plan.setup.version),
            Some(VersionToken::Cas20)
        );
        assert_eq!(plan.map(|plan| plan.version_fallback), Some(true));
    }
}

#[test]
fn crawler_gets_an_inert_gateway() {
    let request = RequestContext::new(Method::GET, "app.example.org", "/").with_user_agent(CRAWLER);
    let mut session = MemorySessionStore::new();
    let config = Config {
        mask_dummy_user: Some("alice".to_string()),
        ..Config::for_host("cas.example.org")
    };

    let cas = Cas::new(
        config,
        RecordingEngine::new(),
        &request,
        &mut session,
        &Deployment::default(),
    );
    let mut cas = match cas {
        Ok(cas) => cas,
        Err(err) => panic!("gateway construction failed: {err}"),
    };

    assert!(cas.is_inert());
    assert_eq!(cas.engine().map(RecordingEngine::was_consulted), None);
    assert_eq!(session.name(), None);
    assert!(session.cookie_params().is_none());

    assert_eq!(cas.authenticate(&request).ok(), Some(AuthOutcome::Bypassed));
    assert_eq!(
        cas.check_authentication(&request).ok(),
        Some(AuthOutcome::Bypassed)
    );
    assert!(!cas.is_authenticated());
    assert!(matches!(cas.user(), Err(Error::NotAuthenticated)));
    assert!(matches!(cas.logout(&request, &session, None, None), Ok(None)));
    assert_eq!(cas.call("getVersion", &[]).ok(), Some(Value::Null));
    assert!(cas.logout_notification("evil.example.org", "<samlp/>").is_ok());
    assert_eq!(cas.login_url(), None);
    assert_eq!(cas.masquerade(), None);
}

#[test]
fn masquerade_dominates_engine_state() {
    let config = Config {
        mask_dummy_user: Some("alice".to_string()),
        ..Config::for_host("cas.example.org")
    };
    let mut cas = build(config, RecordingEngine::new(), &request());

    assert!(cas.is_authenticated());
    assert_eq!(cas.user().ok().as_deref(), Some("alice"));
    assert_eq!(
        cas.authenticate(&request()).ok(),
        Some(AuthOutcome::Authenticated("alice".to_string()))
    );
    assert_eq!(
        cas.check_authentication(&request()).ok(),
        Some(AuthOutcome::Authenticated("alice".to_string()))
    );
    assert_eq!(cas.engine().map(RecordingEngine::was_consulted), Some(false));
}

#[test]
fn masquerade_beats_a_different_engine_user() {
    let config = Config {
        mask_dummy_user: Some("alice".to_string()),
        ..Config::for_host("cas.example.org")
    };
    let cas = build(config, RecordingEngine::authenticated_as("bob"), &request());
    assert_eq!(cas.user().ok().as_deref(), Some("alice"));
}

#[test]
fn unauthenticated_request_is_sent_to_login() {
    let mut cas = build(
        Config::for_host("cas.example.org"),
        RecordingEngine::new(),
        &request(),
    );

    match cas.authenticate(&request()) {
        Ok(AuthOutcome::MustRedirect(redirect)) => assert_eq!(
            redirect.location(),
            "https://cas.example.org/cas/login?service=https%3A%2F%2Fapp.example.org%2Faccount"
        ),
        other => panic!("expected a redirect, got {other:?}"),
    }
}

#[test]
fn fixed_service_url_is_used_for_login() {
    let config = Config {
        redirect_path: Some("https://app.example.org/sso".to_string()),
        ..Config::for_host("cas.example.org")
    };
    let mut cas = build(config, RecordingEngine::new(), &request());

    match cas.authenticate(&request()) {
        Ok(AuthOutcome::MustRedirect(redirect)) => {
            assert!(redirect
                .location()
                .ends_with("?service=https%3A%2F%2Fapp.example.org%2Fsso"));
        }
        other => panic!("expected a redirect, got {other:?}"),
    }
}

#[test]
fn session_hardening_runs_once_before_start() {
    let config = Config {
        session_name: "APPSESS".to_string(),
        session_max_life: 3600,
        ..Config::for_host("cas.example.org")
    };
    let deployment = Deployment {
        app_domain: Some("example.org".to_string()),
        https_only_cookies: true,
    };
    let mut session = MemorySessionStore::new();

    for _ in 0..2 {
        let cas = Cas::new(
            config.clone(),
            RecordingEngine::new(),
            &request(),
            &mut session,
            &deployment,
        );
        assert!(cas.is_ok());
    }
    session.start("abc123");

    assert_eq!(session.name(), Some("APPSESS"));
    assert_eq!(
        session.set_cookie_header().as_deref(),
        Some(concat!(
            "APPSESS=abc123; Path=/; Max-Age=3600; Domain=example.org; ",
            "Secure; HttpOnly; SameSite=Lax"
        ))
    );
}

#[test]
fn started_session_is_left_alone() {
    let mut session = MemorySessionStore::new();
    session.start("abc123");

    let cas = Cas::new(
        Config {
            session_name: "APPSESS".to_string(),
            ..Config::for_host("cas.example.org")
        },
        RecordingEngine::new(),
        &request(),
        &mut session,
        &Deployment::default(),
    );

    assert!(cas.is_ok());
    assert!(session.is_started());
    assert_eq!(session.name(), None);
}

#[test]
fn logout_sends_service_and_url() {
    let mut cas = build(
        Config::for_host("cas.example.org"),
        RecordingEngine::authenticated_as("bob"),
        &request(),
    );
    let session = MemorySessionStore::new();

    let redirect = match cas.logout(&request(), &session, Some("https://b"), Some("https://a")) {
        Ok(Some(redirect)) => redirect,
        other => panic!("expected a logout redirect, got {other:?}"),
    };
    assert_eq!(
        redirect.location(),
        "https://cas.example.org/cas/logout?service=https%3A%2F%2Fa&url=https%3A%2F%2Fb"
    );
    assert!(!cas.is_authenticated());
}

#[test]
fn logout_derives_service_from_request() {
    let mut cas = build(
        Config::for_host("cas.example.org"),
        RecordingEngine::authenticated_as("bob"),
        &request(),
    );
    let mut session = MemorySessionStore::new();
    session.insert("cas", json!({"user": "bob"}));

    let redirect = match cas.logout(&request(), &session, None, None) {
        Ok(Some(redirect)) => redirect,
        other => panic!("expected a logout redirect, got {other:?}"),
    };
    assert!(redirect
        .location()
        .ends_with("/cas/logout?service=https%3A%2F%2Fapp.example.org%2Faccount"));
}

#[test]
fn logout_prefers_configured_redirect() {
    let config = Config {
        logout_redirect_url: Some("https://www.example.org/bye".to_string()),
        ..Config::for_host("cas.example.org")
    };
    let mut cas = build(config, RecordingEngine::authenticated_as("bob"), &request());

    let calls_before = cas.engine().map(RecordingEngine::calls).unwrap_or_default();
    let result = cas.logout(&request(), &MemorySessionStore::new(), None, None);
    assert!(matches!(result, Ok(Some(_))));

    let calls = cas.engine().map(RecordingEngine::calls).unwrap_or_default();
    let logout = calls[calls_before.len()..].iter().find_map(|call| match call {
        Call::Logout(params) => Some(params.clone()),
        _ => None,
    });
    assert_eq!(
        logout.and_then(|params| params.service),
        Some("https://www.example.org/bye".to_string())
    );
}

#[test]
fn saml_logout_is_restricted_to_real_hosts() {
    let config = config_from(json!({
        "CAS_HOST": "cas.example.org",
        "CAS_ENABLE_SAML": "1",
        "CAS_VERSION": "3.0",
        "CAS_REAL_HOSTS": "cas-a.example.org, cas-b.example.org",
    }));
    let mut cas = build(config, RecordingEngine::new(), &request());

    let plan = cas.plan().cloned();
    assert_eq!(
        plan.as_ref().map(|plan| plan.setup.version),
        Some(VersionToken::Saml11)
    );
    let policy = plan.and_then(|plan| plan.logout_policy);
    assert_eq!(policy.as_ref().map(|policy| policy.restrict), Some(true));
    assert_eq!(
        policy.map(|policy| policy.allowed_hosts),
        Some(vec![
            "cas-a.example.org".to_string(),
            "cas-b.example.org".to_string()
        ])
    );

    assert!(matches!(
        cas.logout_notification("evil.example.org", "<samlp:LogoutRequest/>"),
        Err(Error::UnauthorizedLogoutSource { host }) if host == "evil.example.org"
    ));
    let calls = cas.engine().map(RecordingEngine::calls).unwrap_or_default();
    assert!(!calls
        .iter()
        .any(|call| matches!(call, Call::LogoutNotification(_))));

    assert!(cas
        .logout_notification("CAS-A.example.org", "<samlp:LogoutRequest/>")
        .is_ok());
    let calls = cas.engine().map(RecordingEngine::calls).unwrap_or_default();
    assert!(calls.contains(&Call::LogoutNotification(
        "<samlp:LogoutRequest/>".to_string()
    )));
}

#[test]
fn saml_without_real_hosts_rejects_every_source() {
    let config = Config {
        saml_enabled: true,
        ..Config::for_host("cas.example.org")
    };
    let mut cas = build(config, RecordingEngine::new(), &request());
    assert!(cas
        .logout_notification("cas.example.org", "<samlp:LogoutRequest/>")
        .is_err());
}

#[test]
fn endpoint_accessors_follow_overrides() {
    let cas = build(
        Config::for_host("cas.example.org"),
        RecordingEngine::new(),
        &request(),
    );
    assert_eq!(
        cas.login_url().as_deref(),
        Some("https://cas.example.org/cas/login")
    );
    assert_eq!(
        cas.logout_url().as_deref(),
        Some("https://cas.example.org/cas/logout")
    );

    let config = Config {
        login_url: Some("https://sso.example.org/login".to_string()),
        logout_url: Some("https://sso.example.org/logout".to_string()),
        ..Config::for_host("cas.example.org")
    };
    let cas = build(config, RecordingEngine::new(), &request());
    assert_eq!(
        cas.login_url().as_deref(),
        Some("https://sso.example.org/login")
    );
    assert_eq!(
        cas.logout_url().as_deref(),
        Some("https://sso.example.org/logout")
    );
}

#[test]
fn passthrough_reaches_engine() {
    let mut cas = build(
        Config::for_host("cas.example.org"),
        RecordingEngine::new(),
        &request(),
    );
    assert_eq!(
        cas.call("getVersion", &[]).ok(),
        Some(json!(env!("CARGO_PKG_VERSION")))
    );
    assert!(matches!(
        cas.call("renewTicket", &[json!("ST-1")]),
        Err(Error::MethodNotSupported { method }) if method == "renewTicket"
    ));
}

#[test]
fn configuration_errors_surface_from_construction() {
    let mut session = MemorySessionStore::new();
    let config = Config {
        saml_enabled: true,
        real_hosts: vec!["not a host".to_string()],
        ..Config::for_host("cas.example.org")
    };
    let result = Cas::new(
        config,
        RecordingEngine::new(),
        &request(),
        &mut session,
        &Deployment::default(),
    );
    assert!(matches!(result, Err(Error::Configuration(_))));
}
