// src/resolver/follow.rs
// =============================================================================
// This module follows a redirect chain by hand and extracts the final token.
//
// Why manual following?
// - The chain mixes HTTP Location redirects with HTML meta-refresh hops,
//   and an HTTP client only follows the former
// - We need the terminal response's URL AND body for token extraction
//
// The hop loop:
// - Location header present -> adopt it as the next URL
// - else a refresh-style 'url=' directive in the body -> percent-decode it,
//   absolutize relative targets against the current response, adopt it
// - else -> terminal response
// - hop bound reached -> the last-fetched response is treated as terminal
//   (deliberately NOT an error: extraction still gets its chance)
//
// Token extraction from the terminal response, in priority order:
// (a) 'start' query parameter on the terminal URL
// (b) 'start=' occurrence anywhere in the body, percent-decoded
// (c) raw 'start=' match against the URL's text form
// =============================================================================

use url::Url;

use super::extract;
use super::protocol::fresh_client;
use super::{browser_headers, ResolveError};
use crate::codec;

/// Maximum number of responses fetched before the chain is cut off
const MAX_REDIRECT_HOPS: usize = 10;

// Follows the chain from `address` and extracts the 'start' token
//
// Uses a fresh, session-less client: the hosts expect each phase to arrive
// without cookies from the previous one.
pub async fn follow_and_extract_token(
    address: &str,
    verbose: bool,
) -> Result<String, ResolveError> {
    let client = fresh_client()?;

    let mut current = address.to_string();
    let mut fetched = 0;

    let (terminal_url, terminal_body) = loop {
        if verbose {
            println!("Hop {}: {}", fetched + 1, current);
        }

        let response = client
            .get(&current)
            .headers(browser_headers())
            .send()
            .await?;
        fetched += 1;

        let response_url = response.url().clone();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        if fetched < MAX_REDIRECT_HOPS {
            // HTTP redirect wins over anything in the body
            if let Some(next) = location {
                current = next;
                continue;
            }

            // Meta-refresh style redirect hidden in the body
            if let Some(raw_target) = extract::meta_refresh_target(&body) {
                current = absolutize(codec::url_decode(&raw_target), &response_url);
                continue;
            }
        }

        // Terminal: no redirect found, or the hop budget is spent
        break (response_url.to_string(), body);
    };

    if verbose {
        println!("Terminal URL: {}", terminal_url);
    }

    token_from_terminal(&terminal_url, &terminal_body)
}

// Makes a possibly-relative redirect target absolute
//
// Relative targets are resolved against the scheme and host (with port)
// of the response that carried them.
fn absolutize(target: String, base: &Url) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target;
    }

    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{}://{}:{}{}", base.scheme(), host, port, target),
        None => format!("{}://{}{}", base.scheme(), host, target),
    }
}

// Extracts the opaque token from the terminal response
//
// The fallback order (URL query, then body text, then raw URL text) is the
// order the live hosts were observed to need, preserved as-is.
fn token_from_terminal(terminal_url: &str, terminal_body: &str) -> Result<String, ResolveError> {
    // (a) proper query parameter on the terminal URL
    if let Ok(parsed) = Url::parse(terminal_url) {
        if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "start") {
            return Ok(value.into_owned());
        }
    }

    // (b) 'start=' anywhere in the body
    if let Some(found) = extract::start_in_text(terminal_body) {
        return Ok(codec::url_decode(&found));
    }

    // (c) last resort: raw match against the URL text itself
    if let Some(found) = extract::start_in_url(terminal_url) {
        return Ok(codec::url_decode(&found));
    }

    Err(ResolveError::Extraction(
        "no start parameter in terminal URL or body".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_terminal_url_query() {
        let token = token_from_terminal("https://t.example/bot?start=QUERYTOKEN", "<html></html>");
        assert_eq!(token.unwrap(), "QUERYTOKEN");
    }

    #[test]
    fn test_token_from_terminal_body_fallback() {
        // No query parameter, but the body carries start=ABC123
        let token = token_from_terminal(
            "https://t.example/landing",
            "<html><body>redirecting start=ABC123 now</body></html>",
        );
        assert_eq!(token.unwrap(), "ABC123");
    }

    #[test]
    fn test_token_from_terminal_body_is_percent_decoded() {
        let token = token_from_terminal("https://t.example/landing", "start=A%2FB%2FC");
        assert_eq!(token.unwrap(), "A/B/C");
    }

    #[test]
    fn test_token_from_terminal_query_wins_over_body() {
        let token = token_from_terminal(
            "https://t.example/bot?start=FROM_URL",
            "body has start=FROM_BODY too",
        );
        assert_eq!(token.unwrap(), "FROM_URL");
    }

    #[test]
    fn test_token_from_terminal_nothing_found() {
        let err = token_from_terminal("https://t.example/empty", "<html></html>").unwrap_err();
        assert!(matches!(err, ResolveError::Extraction(_)));
    }

    #[test]
    fn test_absolutize_relative_target() {
        let base = Url::parse("https://host.example/page").unwrap();
        assert_eq!(
            absolutize("/next?x=1".to_string(), &base),
            "https://host.example/next?x=1"
        );
    }

    #[test]
    fn test_absolutize_keeps_port() {
        let base = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(
            absolutize("/next".to_string(), &base),
            "http://127.0.0.1:8080/next"
        );
    }

    #[test]
    fn test_absolutize_leaves_absolute_alone() {
        let base = Url::parse("https://host.example/page").unwrap();
        assert_eq!(
            absolutize("https://other.example/done".to_string(), &base),
            "https://other.example/done"
        );
    }

    // ------------------------------------------------------------------
    // Live-chain tests against a minimal local HTTP server.
    //
    // The server answers each connection from a (path, base) -> response
    // closure, which is enough to script redirect loops, meta-refresh
    // hops, and terminal pages without any real network.
    // ------------------------------------------------------------------

    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_server<F>(make_response: F) -> String
    where
        F: Fn(&str, &str) -> String + Clone + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let served_base = base.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let make_response = make_response.clone();
                let base = served_base.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let response = make_response(&path, &base);
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        base
    }

    fn http_ok(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn http_redirect(location: &str) -> String {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            location
        )
    }

    #[tokio::test]
    async fn test_endless_redirect_loop_is_cut_off_at_the_hop_bound() {
        // Every response redirects again, forever. The follower must stop
        // at the bound and treat the last response as terminal - and that
        // response's URL still carries the token.
        let base = spawn_server(|_, base| http_redirect(&format!("{}/loop?start=LOOPED", base))).await;

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            follow_and_extract_token(&format!("{}/entry", base), false),
        )
        .await
        .expect("follower did not terminate within the hop bound");

        assert_eq!(result.unwrap(), "LOOPED");
    }

    #[tokio::test]
    async fn test_meta_refresh_hop_with_relative_target() {
        // First page redirects via a refresh directive with a RELATIVE
        // target, which must be resolved against this server's host:port
        let base = spawn_server(|path, _| {
            if path.starts_with("/done") {
                http_ok("<html>landed</html>")
            } else {
                http_ok(r#"<meta http-equiv="refresh" content="0;url=/done?start=FINAL">"#)
            }
        })
        .await;

        let token = follow_and_extract_token(&format!("{}/entry", base), false)
            .await
            .unwrap();
        assert_eq!(token, "FINAL");
    }

    #[tokio::test]
    async fn test_http_redirect_then_token_in_terminal_body() {
        let base = spawn_server(|path, base| {
            if path.starts_with("/page") {
                http_ok("<html>loading start=BODYTOKEN please wait</html>")
            } else {
                http_redirect(&format!("{}/page", base))
            }
        })
        .await;

        let token = follow_and_extract_token(&format!("{}/entry", base), false)
            .await
            .unwrap();
        assert_eq!(token, "BODYTOKEN");
    }
}
