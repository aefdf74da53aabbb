//! Application digest integration tests.

#[cfg(test)]
mod tests {
    use oncall_auth_http::RequestGuard;
    use oncall_core::{AuthConfig, AuthError, Caller, ErrorKind};

    use crate::{APP, Fixture, T0, app_signature};

    fn parts(method: &str, uri: &str, authorization: &str) -> http::request::Parts {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::AUTHORIZATION, authorization)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_should_accept_digest_within_two_windows() {
        let fixture = Fixture::seeded();
        let header = app_signature("GET", "/widgets/42", "", b"", T0);
        let parts = parts("GET", "/widgets/42", &header);

        for offset in [0, 4, 5, 9] {
            let guard = fixture.guard_at(AuthConfig::default(), T0 + offset);
            let caller = guard.authenticate(&parts, b"").unwrap();
            assert_eq!(caller, Caller::Application(APP.to_owned()), "offset {offset}");
        }
    }

    #[test]
    fn test_should_reject_digest_after_two_windows() {
        let fixture = Fixture::seeded();
        let header = app_signature("GET", "/widgets/42", "", b"", T0);
        let parts = parts("GET", "/widgets/42", &header);

        for offset in [10, 11, 60] {
            let guard = fixture.guard_at(AuthConfig::default(), T0 + offset);
            assert!(
                matches!(guard.authenticate(&parts, b""), Err(AuthError::WrongDigest)),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_should_cover_query_and_body() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);
        let header = app_signature("POST", "/events", "team=sre", b"{\"a\":1}", T0);

        let signed = parts("POST", "/events?team=sre", &header);
        assert!(guard.authenticate(&signed, b"{\"a\":1}").is_ok());

        let other_query = parts("POST", "/events?team=infra", &header);
        assert!(guard.authenticate(&other_query, b"{\"a\":1}").is_err());

        let other_method = parts("PUT", "/events?team=sre", &header);
        assert!(guard.authenticate(&other_method, b"{\"a\":1}").is_err());

        assert!(guard.authenticate(&signed, b"{\"a\":2}").is_err());
    }

    #[test]
    fn test_should_reject_unknown_application() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);
        let header = app_signature("GET", "/", "", b"", T0).replacen(APP, "svc-x", 1);

        let err = guard.authenticate(&parts("GET", "/", &header), b"").unwrap_err();
        assert!(matches!(err, AuthError::ApplicationNotFound(ref name) if name == "svc-x"));
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_should_serve_keys_from_cache_after_preload() {
        let fixture = Fixture::seeded();
        let guard = RequestGuard::init(AuthConfig::default(), fixture.store())
            .unwrap()
            .with_clock(|| T0);
        assert_eq!(guard.credentials().len(), 1);

        let acquired = fixture.directory.connections_acquired();
        let header = app_signature("GET", "/", "", b"", T0);
        assert!(guard.authenticate(&parts("GET", "/", &header), b"").is_ok());
        assert_eq!(fixture.directory.connections_acquired(), acquired);
    }

    #[test]
    fn test_should_keep_serving_cached_keys_while_directory_is_down() {
        let fixture = Fixture::seeded();
        let guard = fixture.guard_at(AuthConfig::default(), T0);
        let header = app_signature("GET", "/", "", b"", T0);
        let parts = parts("GET", "/", &header);

        assert!(guard.authenticate(&parts, b"").is_ok());
        fixture.directory.set_offline(true);
        assert!(guard.authenticate(&parts, b"").is_ok());
    }

    #[test]
    fn test_should_report_directory_outage_for_uncached_application() {
        let fixture = Fixture::seeded();
        fixture.directory.set_offline(true);
        let guard = fixture.guard_at(AuthConfig::default(), T0);
        let header = app_signature("GET", "/", "", b"", T0);

        let err = guard.authenticate(&parts("GET", "/", &header), b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(fixture.directory.open_connections(), 0);
    }
}
