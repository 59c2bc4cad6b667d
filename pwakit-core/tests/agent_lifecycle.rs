//! Drives the offline agent through a full worker lifecycle against the in-memory host.

use std::rc::Rc;

use pwakit_core::agent::memory::{MemoryHost, MemoryNotification, MemoryRequest, ResponseSnapshot};
use pwakit_core::agent::{
    AgentError, CacheOutcome, ClickOutcome, FetchOutcome, Lifecycle, OfflineAgent,
};
use pwakit_core::AgentConfig;
use reqwest::Url;

const ORIGIN: &str = "https://bis.local/";

fn serve_site(host: &MemoryHost) {
    host.serve(ORIGIN, ResponseSnapshot::new(200, "<html>start</html>"));
    host.serve(
        "https://bis.local/static/style.css",
        ResponseSnapshot::new(200, "body{}").with_header("content-type", "text/css"),
    );
    host.serve("https://bis.local/static/script.js", ResponseSnapshot::new(200, "init()"));
    host.serve("https://bis.local/static/manifest.json", ResponseSnapshot::new(200, "{}"));
}

#[tokio::test]
async fn test_upgrade_then_offline_session() {
    let host = Rc::new(MemoryHost::new());
    for stale in ["bis-cache-v0", "bis-cache-beta", "bis-cache-v1-rc"] {
        host.seed_generation(stale);
    }
    serve_site(&host);

    let config = AgentConfig::from_json(r#"{"cacheName": "bis-cache-v2"}"#).unwrap();
    let agent = OfflineAgent::new(Rc::clone(&host), config, Url::parse(ORIGIN).unwrap()).unwrap();
    assert_eq!(agent.lifecycle(), Lifecycle::Parsed);

    let install = agent.on_install().await;
    assert!(install.error.is_none());
    assert_eq!(install.precached.len(), 4);

    let activation = agent.on_activate().await;
    assert_eq!(activation.purged.len(), 3);
    assert_eq!(agent.lifecycle(), Lifecycle::Activated);
    assert_eq!(host.generation_names(), vec!["bis-cache-v2".to_string()]);

    // Online browsing captures successful GETs.
    let page = ResponseSnapshot::new(200, "<html>Schichtbuch</html>");
    host.serve("https://bis.local/schichtbuch", page.clone());
    let online = agent
        .on_fetch(MemoryRequest::get("https://bis.local/schichtbuch"))
        .await;
    assert!(online.outcome.is_network());
    if let Some(write) = online.cache_write {
        write.await;
    }

    host.set_offline(true);

    let replay = agent
        .on_fetch(MemoryRequest::get("https://bis.local/schichtbuch"))
        .await;
    match replay.outcome {
        FetchOutcome::Cache(CacheOutcome::Exact, response) => {
            assert_eq!(response.status, page.status);
            assert_eq!(response.body, page.body);
        }
        other => panic!("Expected exact cache hit, got: {other:?}"),
    }

    let unknown = agent
        .on_fetch(MemoryRequest::get("https://bis.local/ersatzteile"))
        .await;
    assert!(matches!(
        unknown.outcome,
        FetchOutcome::Cache(CacheOutcome::OfflineFallback, _)
    ));
}

#[tokio::test]
async fn test_offline_without_root_document_rejects() {
    let host = Rc::new(MemoryHost::new());
    host.set_offline(true);
    let agent = OfflineAgent::new(
        Rc::clone(&host),
        AgentConfig::default(),
        Url::parse(ORIGIN).unwrap(),
    )
    .unwrap();

    agent.on_install().await;
    agent.on_activate().await;

    let url = "https://bis.local/dashboard";
    let result = agent.on_fetch(MemoryRequest::get(url)).await.into_response(url);
    assert_eq!(
        result,
        Err(AgentError::Unrecoverable {
            url: url.to_string()
        })
    );
}

#[tokio::test]
async fn test_push_then_click() {
    let host = Rc::new(MemoryHost::new());
    let agent = OfflineAgent::new(
        Rc::clone(&host),
        AgentConfig::default(),
        Url::parse(ORIGIN).unwrap(),
    )
    .unwrap();

    let shown = agent
        .on_push(Some(
            r#"{"title":"Neue Bestellung","nachricht":"42","data":{"url":"/bestellungen/42","benachrichtigung_id":7}}"#,
        ))
        .await;
    assert_eq!(shown.notification_id, Some(7));

    let notification = MemoryNotification::new(&shown.tag, Some(&shown.url));
    let first = agent.on_notification_click(&notification).await;
    assert_eq!(
        first,
        ClickOutcome::Opened {
            url: "https://bis.local/bestellungen/42".to_string()
        }
    );

    // The window opened by the first click is focused by the second.
    let second = agent.on_notification_click(&notification).await;
    assert_eq!(
        second,
        ClickOutcome::Focused {
            client_id: "window-1".to_string()
        }
    );
    assert_eq!(host.focused(), vec!["window-1".to_string()]);
}
