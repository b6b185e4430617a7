//! NetMirror client tests against a stub upstream

use std::sync::Arc;
use std::time::Duration;

use mirrorlink_providers::netmirror::{
    build_http_client, CookieSource, CookieSupplier, CredentialSupplier, Endpoint, HttpOptions,
    MediaQuery, MirrorTransport, NetMirrorClient, RelayMode, Resolver, StreamAssembler,
};
use mirrorlink_providers::{ErrorKind, NetMirrorError};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOKIE: &str = "t_hash_t=abc";

fn http() -> reqwest::Client {
    build_http_client(&HttpOptions::default()).unwrap()
}

fn mirror(server: &MockServer) -> NetMirrorClient {
    NetMirrorClient::new(server.uri(), http()).unwrap()
}

#[tokio::test]
async fn test_call_attaches_cookie_and_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("s", "The Office"))
        .and(header("cookie", COOKIE))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "y"})))
        .expect(1)
        .mount(&server)
        .await;

    let value = mirror(&server)
        .call(
            Endpoint::Search,
            &[("s", "The Office".to_string())],
            COOKIE,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(value["status"], "y");
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = mirror(&server)
        .call(Endpoint::Meta, &[("id", "1".to_string())], COOKIE, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, NetMirrorError::Http { .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_unparsable_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playlist.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let err = mirror(&server)
        .call(Endpoint::Playlist, &[("id", "1".to_string())], COOKIE, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, NetMirrorError::Parse(_)));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_cancel_mid_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "y"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = mirror(&server)
        .call(Endpoint::Search, &[("s", "x".to_string())], COOKIE, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_remote_cookie_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/cookie.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"netflixCookie": {"cookie": "t_hash_t=remote"}})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let supplier = CookieSupplier::new(
        CookieSource::Remote {
            url: format!("{}/json/cookie.json", server.uri()),
            pointer: "/netflixCookie/cookie".to_string(),
        },
        http(),
    )
    .with_extra_cookies([("hd".to_string(), "on".to_string())]);

    let cancel = CancellationToken::new();
    assert_eq!(supplier.session_token(&cancel).await.unwrap(), "t_hash_t=remote; hd=on");
    // No caching: every resolution re-fetches.
    assert_eq!(supplier.session_token(&cancel).await.unwrap(), "t_hash_t=remote; hd=on");
}

#[tokio::test]
async fn test_remote_cookie_failures_are_credential_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    for file in ["missing.json", "broken.json"] {
        let supplier = CookieSupplier::new(
            CookieSource::Remote {
                url: format!("{}/{file}", server.uri()),
                pointer: "/netflixCookie/cookie".to_string(),
            },
            http(),
        );
        let err = supplier.session_token(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Credential, "{file}: {err}");
    }
}

#[tokio::test]
async fn test_show_resolution_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("s", "Dark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "y",
            "searchResult": [
                {"id": "70000001", "t": "Dark Matter"},
                {"id": "80100172", "t": "Dark"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post.php"))
        .and(query_param("id", "70000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"year": "2024", "type": "t"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post.php"))
        .and(query_param("id", "80100172"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "year": "2017",
            "type": "t",
            "season": [{"s": "1", "id": "s1"}, {"s": "2", "id": "s2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Continuation pages carry `page`; the first request does not.
    Mock::given(method("GET"))
        .and(path("/episodes.php"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "episodes": [{"ep": "E4", "s": "S2", "id": "ep-2-4"}],
            "nextPageShow": 0
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episodes.php"))
        .and(query_param("s", "s2"))
        .and(query_param("series", "80100172"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "episodes": [
                {"ep": "E1", "s": "S2", "id": "ep-2-1"},
                {"ep": "E2", "s": "S2", "id": "ep-2-2"},
                {"ep": "E3", "s": "S2", "id": "ep-2-3"}
            ],
            "nextPageShow": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/playlist.php"))
        .and(query_param("id", "ep-2-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sources": [
                {"label": "Mid HD", "file": "hls/ep-2-4-720.m3u8"},
                {"label": "Full HD", "file": "hls/ep-2-4-1080.m3u8"}
            ]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let http = http();
    let client = NetMirrorClient::new(server.uri(), http.clone()).unwrap();
    let base = client.base_url().to_string();
    let cookies = CookieSupplier::new(CookieSource::Static(COOKIE.to_string()), http);
    let assembler = StreamAssembler::new(
        base.clone(),
        RelayMode::Relayed {
            template: "https://relay.example/proxy?url={url}&headers={headers}".to_string(),
        },
    )
    .unwrap();
    let resolver = Resolver::new(Arc::new(client), Arc::new(cookies), assembler);

    let ticks = std::sync::Mutex::new(Vec::new());
    let progress = |p: u8| ticks.lock().unwrap().push(p);
    let stream = resolver
        .resolve(&MediaQuery::show("Dark", 2017, 2, 4), &CancellationToken::new(), &progress)
        .await
        .unwrap();

    let relayed = url::Url::parse(&stream.playlist).unwrap();
    let target = relayed
        .query_pairs()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(target, format!("{base}hls/ep-2-4-1080.m3u8"));
    assert!(stream.cors_allowed());

    let ticks = ticks.lock().unwrap().clone();
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(ticks.last(), Some(&90));
}
