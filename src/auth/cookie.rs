/// Pick the cookie `Domain=` value for a request host. An exact configured
/// entry wins, then the `*.` wildcard entry with the longest base that the
/// host is a subdomain of, then the host itself. Ports are ignored.
pub fn resolve_cookie_domain<'a>(domains: &'a [String], request_host: &'a str) -> &'a str {
    let host = request_host.split(':').next().unwrap_or(request_host);

    if let Some(exact) = domains.iter().find(|d| d.as_str() == host) {
        return exact.as_str();
    }

    let mut best: Option<&'a str> = None;
    for domain in domains {
        let Some(base) = domain.strip_prefix("*.") else {
            continue;
        };
        let is_subdomain = host.len() > base.len()
            && host.ends_with(base)
            && host.as_bytes()[host.len() - base.len() - 1] == b'.';
        if is_subdomain && best.map_or(true, |current| base.len() > current.len()) {
            best = Some(base);
        }
    }
    best.unwrap_or(host)
}

pub fn build_session_cookie(name: &str, token: &str, domain: &str, ttl_minutes: i64) -> String {
    format!(
        "{name}={token}; Domain={domain}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        ttl_minutes * 60
    )
}

pub fn clear_session_cookie(name: &str, domain: &str) -> String {
    format!("{name}=; Domain={domain}; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_beats_wildcards() {
        let configured = domains(&["shop.example.com", "*.example.com"]);
        assert_eq!(
            resolve_cookie_domain(&configured, "shop.example.com"),
            "shop.example.com"
        );
    }

    #[test]
    fn longest_wildcard_base_wins() {
        let configured = domains(&["*.example.com", "*.shop.example.com"]);
        assert_eq!(
            resolve_cookie_domain(&configured, "api.shop.example.com"),
            "shop.example.com"
        );
        assert_eq!(
            resolve_cookie_domain(&configured, "www.example.com"),
            "example.com"
        );
    }

    #[test]
    fn wildcard_does_not_match_the_bare_base() {
        let configured = domains(&["*.example.com"]);
        assert_eq!(
            resolve_cookie_domain(&configured, "example.com"),
            "example.com"
        );
        // Nothing configured matches, so the raw host comes back
        assert_eq!(
            resolve_cookie_domain(&configured, "other.test"),
            "other.test"
        );
    }

    #[test]
    fn suffix_overlap_without_a_dot_is_not_a_match() {
        let configured = domains(&["*.example.com"]);
        assert_eq!(
            resolve_cookie_domain(&configured, "badexample.com"),
            "badexample.com"
        );
    }

    #[test]
    fn port_is_stripped_before_matching() {
        let configured = domains(&["localhost"]);
        assert_eq!(resolve_cookie_domain(&configured, "localhost:8080"), "localhost");
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = build_session_cookie("pinshop_session", "tok", "example.com", 60);
        assert!(cookie.starts_with("pinshop_session=tok;"));
        assert!(cookie.contains("Domain=example.com"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let cleared = clear_session_cookie("pinshop_session", "example.com");
        assert!(cleared.contains("pinshop_session=;"));
        assert!(cleared.contains("Max-Age=0"));
    }
}
