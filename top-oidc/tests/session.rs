use top_oidc::{LoginInfo, OidcError, OidcProviderConfig, SessionStore};

/// UNIX milliseconds.
const NOW: u64 = 1_700_000_000_000;

fn config() -> OidcProviderConfig {
    OidcProviderConfig::default()
}

#[test]
fn login_derives_email_and_subject() {
    let store = SessionStore::new();
    let identity = store.login(LoginInfo::new("John Doe"), &config(), NOW).unwrap();

    assert_eq!(identity.name, "John Doe");
    assert_eq!(identity.email, "john.doe@home.org");
    assert!(identity.sub.starts_with("id-of-john-doe-"), "{}", identity.sub);
    assert!(identity.sub.ends_with("@op.test"), "{}", identity.sub);
    assert_eq!(identity.valid_seconds(), 3600);
    assert_eq!(identity.issued_at_ms, NOW);
    assert_eq!(identity.expires_at_ms, NOW + 3_600_000);
    assert_eq!(store.current(NOW).unwrap(), identity);
}

#[test]
fn generated_subjects_are_unique() {
    let store = SessionStore::new();
    let first = store.login(LoginInfo::new("John Doe"), &config(), NOW).unwrap();
    let second = store.login(LoginInfo::new("John Doe"), &config(), NOW).unwrap();
    assert_ne!(first.sub, second.sub);
}

#[test]
fn login_keeps_given_values() {
    let store = SessionStore::new();
    let info = LoginInfo::new("Dr. Jane Roe")
        .email("jane@foo.edu")
        .sub("sub-of-jane")
        .valid_seconds(30.0);
    let identity = store.login(info, &config(), NOW).unwrap();

    assert_eq!(identity.name, "Jane Roe");
    assert_eq!(identity.email, "jane@foo.edu");
    assert_eq!(identity.sub, "sub-of-jane");
    assert_eq!(identity.expires_at_ms, NOW + 30_000);
}

#[test]
fn login_uses_configured_domains() {
    let config = OidcProviderConfig::default()
        .issuer("https://proxy.aai.lifescience-ri.eu")
        .user_domain("dkfz.de")
        .validated()
        .unwrap();
    let store = SessionStore::new();
    let identity = store
        .login(LoginInfo::new("Prof. Frank Foo").sub(""), &config, NOW)
        .unwrap();

    assert_eq!(identity.name, "Frank Foo");
    assert_eq!(identity.email, "frank.foo@dkfz.de");
    assert!(identity.sub.starts_with("id-of-frank-foo-"));
    assert!(identity.sub.ends_with("@lifescience-ri.eu"));
}

#[test]
fn invalid_login_input_is_rejected() {
    let store = SessionStore::new();
    let cases = [
        LoginInfo::new(""),
        LoginInfo::new("   "),
        LoginInfo::new("Dr."),
        LoginInfo::new("John Doe").email("not-an-email"),
        LoginInfo::new("John Doe").valid_seconds(0.0),
        LoginInfo::new("John Doe").valid_seconds(-5.0),
        LoginInfo::new("John Doe").valid_seconds(f64::NAN),
    ];
    for info in cases {
        let err = store.login(info.clone(), &config(), NOW).unwrap_err();
        assert!(matches!(err, OidcError::InvalidLoginInput(_)), "{info:?}: {err:?}");
    }
}

#[test]
fn rejected_login_keeps_previous_identity() {
    let store = SessionStore::new();
    let alice = store
        .login(LoginInfo::new("Alice").email("alice@home.org"), &config(), NOW)
        .unwrap();
    assert!(store.login(LoginInfo::new(""), &config(), NOW).is_err());
    assert_eq!(store.current(NOW).unwrap(), alice);
}

#[test]
fn prepared_login_is_not_active_until_committed() {
    let store = SessionStore::new();
    let alice = store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    let code = store.issue_code("rp", "https://rp.test/cb", "openid", None, NOW).unwrap();

    let bob = store
        .prepare_login(LoginInfo::new("Bob"), &config(), NOW)
        .unwrap();
    assert_eq!(store.current(NOW).unwrap(), alice);

    store.commit_login(bob.clone());
    assert_eq!(store.current(NOW).unwrap(), bob);
    assert!(store.redeem_code(&code, None, NOW).is_err());
}

#[test]
fn new_login_replaces_identity() {
    let store = SessionStore::new();
    store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    let bob = store.login(LoginInfo::new("Bob"), &config(), NOW).unwrap();
    assert_eq!(store.current(NOW).unwrap().name, "Bob");
    assert_eq!(store.current(NOW).unwrap(), bob);
}

#[test]
fn expired_identity_counts_as_absent() {
    let store = SessionStore::new();
    store
        .login(LoginInfo::new("Alice").valid_seconds(10.0), &config(), NOW)
        .unwrap();
    assert!(store.current(NOW + 9_999).is_ok());
    assert_eq!(store.current(NOW + 10_000), Err(OidcError::NoActiveSession));
}

#[test]
fn fractional_lifetime_expires_on_the_millisecond() {
    let store = SessionStore::new();
    let identity = store
        .login(LoginInfo::new("Short John").valid_seconds(0.1), &config(), NOW)
        .unwrap();
    assert_eq!(identity.lifetime_ms, 100);
    assert_eq!(identity.valid_seconds(), 1);
    assert!(store.current(NOW + 99).is_ok());
    assert_eq!(store.current(NOW + 100), Err(OidcError::NoActiveSession));
}

#[test]
fn reset_clears_identity() {
    let store = SessionStore::new();
    store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    store.reset();
    assert_eq!(store.current(NOW), Err(OidcError::NoActiveSession));
    store.reset();
    assert_eq!(store.current(NOW), Err(OidcError::NoActiveSession));
}

#[test]
fn codes_require_a_session() {
    let store = SessionStore::new();
    let err = store
        .issue_code("test-client", "https://rp.test/cb", "openid", None, NOW)
        .unwrap_err();
    assert_eq!(err, OidcError::NoActiveSession);
}

#[test]
fn codes_are_single_use() {
    let store = SessionStore::new();
    let alice = store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    let code = store
        .issue_code("rp", "https://rp.test/cb", "openid email", Some("n-0S6".into()), NOW)
        .unwrap();

    let (identity, grant) = store
        .redeem_code(&code, Some("https://rp.test/cb"), NOW)
        .unwrap();
    assert_eq!(identity, alice);
    assert_eq!(grant.sub, alice.sub);
    assert_eq!(grant.client_id, "rp");
    assert_eq!(grant.scope, "openid email");
    assert_eq!(grant.nonce.as_deref(), Some("n-0S6"));

    let err = store.redeem_code(&code, None, NOW).unwrap_err();
    assert!(matches!(err, OidcError::InvalidGrant(_)));
}

#[test]
fn redirect_uri_must_match() {
    let store = SessionStore::new();
    store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    let code = store
        .issue_code("rp", "https://rp.test/cb", "openid", None, NOW)
        .unwrap();
    let err = store
        .redeem_code(&code, Some("https://evil.test/cb"), NOW)
        .unwrap_err();
    assert!(matches!(err, OidcError::InvalidGrant(_)));
}

#[test]
fn codes_do_not_survive_login_or_reset() {
    let store = SessionStore::new();
    store.login(LoginInfo::new("Alice"), &config(), NOW).unwrap();
    let code = store.issue_code("rp", "https://rp.test/cb", "openid", None, NOW).unwrap();
    store.login(LoginInfo::new("Bob"), &config(), NOW).unwrap();
    assert!(store.redeem_code(&code, None, NOW).is_err());

    let code = store.issue_code("rp", "https://rp.test/cb", "openid", None, NOW).unwrap();
    store.reset();
    assert!(store.redeem_code(&code, None, NOW).is_err());
}
