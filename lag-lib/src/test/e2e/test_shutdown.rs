use std::time::Duration;

use rama::http::{BodyExtractExt as _, StatusCode, service::client::HttpClientExt as _};
use tokio::net::TcpStream;

use super::{client, runtime};
use crate::{config::ServerSettings, server::ShutdownOutcome};

#[tokio::test]
#[tracing_test::traced_test]
async fn test_shutdown_idle() {
    let runtime = runtime::spawn().await;
    let addr = runtime.addr();

    assert!(matches!(
        runtime.shutdown().await,
        ShutdownOutcome::Graceful(_)
    ));
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_shutdown_waits_for_in_flight_lag() {
    let mut runtime = runtime::spawn_with_settings(ServerSettings {
        graceful: Some("5s".to_owned()),
        ..Default::default()
    })
    .await;
    let addr = runtime.addr();

    let url = runtime.url("/?lag=500ms");
    let in_flight = tokio::spawn(async move {
        let resp = client::new_web_client().get(url).send().await.unwrap();
        (resp.status(), resp.try_into_string().await.unwrap())
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    runtime.begin_shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // draining: the lagged request is still pending, new connections are refused
    assert!(!in_flight.is_finished());
    assert!(TcpStream::connect(addr).await.is_err());

    let outcome = runtime.stopped().await;
    assert!(matches!(outcome, ShutdownOutcome::Graceful(_)), "{outcome:?}");

    let (status, payload) = in_flight.await.unwrap();
    assert_eq!(StatusCode::OK, status);
    assert_eq!("ok", payload);

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_shutdown_forced_when_lag_outlives_grace() {
    let runtime = runtime::spawn_with_settings(ServerSettings {
        graceful: Some("200ms".to_owned()),
        max_lag: Some("10s".to_owned()),
        ..Default::default()
    })
    .await;

    let url = runtime.url("/?lag=5s");
    let mut in_flight = tokio::spawn(async move {
        let resp = client::new_web_client().get(url).send().await?;
        Ok::<_, rama::error::BoxError>(resp.status())
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        ShutdownOutcome::Forced(Duration::from_millis(200)),
        runtime.shutdown().await
    );

    // the abandoned request never gets its response
    let result = tokio::time::timeout(Duration::from_millis(500), &mut in_flight).await;
    assert!(
        !matches!(result, Ok(Ok(Ok(StatusCode::OK)))),
        "abandoned request completed: {result:?}"
    );

    in_flight.abort();
}
