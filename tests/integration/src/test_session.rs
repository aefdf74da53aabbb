//! Session and CSRF integration tests.

#[cfg(test)]
mod tests {
    use oncall_auth::session::CSRF_HEADER;
    use oncall_core::{AuthConfig, AuthError, Caller, ErrorKind, Session};

    use crate::{Fixture, T0, session_of};

    fn parts(session: Option<Session>, csrf: Option<&str>) -> http::request::Parts {
        let mut builder = http::Request::builder().uri("/api/v0/users/alice");
        if let Some(token) = csrf {
            builder = builder.header(CSRF_HEADER, token);
        }
        let mut parts = builder.body(()).unwrap().into_parts().0;
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    #[test]
    fn test_should_accept_matching_csrf_token() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);

        let caller = guard
            .authenticate(&parts(Some(session_of("alice")), Some("tok-alice")), b"")
            .unwrap();
        assert_eq!(caller, Caller::User("alice".to_owned()));
        assert_eq!(fixture.directory.open_connections(), 0);
    }

    #[test]
    fn test_should_reject_wrong_or_absent_csrf_token() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);

        for csrf in [Some("tok-bob"), Some(""), None] {
            let err = guard
                .authenticate(&parts(Some(session_of("alice")), csrf), b"")
                .unwrap_err();
            assert!(matches!(err, AuthError::CsrfValidationFailed), "{csrf:?}");
            assert_eq!(err.title(), "Invalid Session");
        }
    }

    #[test]
    fn test_should_reject_session_without_unique_token() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);

        let err = guard
            .authenticate(&parts(Some(session_of("carol")), Some("tok-carol")), b"")
            .unwrap_err();
        assert!(matches!(err, AuthError::CsrfTokenMissing));

        fixture.directory.push_csrf_token("sess-alice", "tok-alice-2");
        let err = guard
            .authenticate(&parts(Some(session_of("alice")), Some("tok-alice")), b"")
            .unwrap_err();
        assert!(matches!(err, AuthError::CsrfTokenMissing));
    }

    #[test]
    fn test_should_require_login() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);

        for session in [None, Some(Session::anonymous("sess-alice"))] {
            let err = guard
                .authenticate(&parts(session, Some("tok-alice")), b"")
                .unwrap_err();
            assert!(matches!(err, AuthError::NotLoggedIn));
            assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        }
    }

    #[test]
    fn test_should_substitute_debug_user_only_for_authentication_failures() {
        let fixture = Fixture::seeded();
        let config = AuthConfig {
            debug: true,
            debug_user: "dev".to_owned(),
            ..AuthConfig::default()
        };
        let guard = fixture.guard_at(config, T0);

        let caller = guard
            .authenticate(&parts(Some(session_of("alice")), Some("bogus")), b"")
            .unwrap();
        assert_eq!(caller, Caller::User("dev".to_owned()));

        let caller = guard
            .authenticate(&parts(Some(session_of("alice")), Some("tok-alice")), b"")
            .unwrap();
        assert_eq!(caller, Caller::User("alice".to_owned()));

        fixture.directory.set_offline(true);
        let err = guard
            .authenticate(&parts(Some(session_of("alice")), Some("tok-alice")), b"")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
