//! Graceful-shutdown behavior of the server lifecycle.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use relay_proxy::http::ServerError;
use relay_proxy::lifecycle::{LifecycleState, StopKind};

mod common;

#[tokio::test]
async fn shutdown_without_traffic_stops_clean() {
    let upstream =
        common::spawn_upstream(Router::new().route("/", get(|| async { "root" }))).await;
    let mut relay = common::spawn_relay(&format!("http://{upstream}")).await;

    relay.shutdown.trigger();

    let result = relay.task.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(
        *relay.state.borrow_and_update(),
        LifecycleState::Stopped(StopKind::Clean)
    );
}

#[tokio::test]
async fn in_flight_request_finishes_during_drain() {
    let upstream = common::spawn_upstream(Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "done"
        }),
    ))
    .await;
    let mut relay = common::spawn_relay(&format!("http://{upstream}")).await;

    let in_flight = {
        let client = common::client();
        let url = relay.url("/slow");
        tokio::spawn(async move { client.get(url).send().await.unwrap() })
    };

    // Let the request reach the upstream before signalling shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    relay.shutdown.trigger();

    let response = in_flight.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "done");

    let result = relay.task.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(
        *relay.state.borrow_and_update(),
        LifecycleState::Stopped(StopKind::Clean)
    );
}

#[tokio::test]
async fn overrunning_drain_reports_errored_stop() {
    let upstream = common::spawn_upstream(Router::new().route(
        "/stuck",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "eventually"
        }),
    ))
    .await;
    let mut relay = common::spawn_relay_with_grace(
        &format!("http://{upstream}"),
        Some(Duration::from_millis(100)),
    )
    .await;

    let in_flight = {
        let client = common::client();
        let url = relay.url("/stuck");
        tokio::spawn(async move {
            let _ = client.get(url).send().await;
        })
    };

    // Let the request occupy a connection before signalling shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    relay.shutdown.trigger();

    let result = relay.task.await.unwrap();
    assert!(matches!(
        result,
        Err(ServerError::ShutdownTimeout { active: 1 })
    ));
    assert_eq!(
        *relay.state.borrow_and_update(),
        LifecycleState::Stopped(StopKind::Errored)
    );

    in_flight.abort();
}

#[tokio::test]
async fn no_new_connections_after_shutdown() {
    let upstream =
        common::spawn_upstream(Router::new().route("/", get(|| async { "root" }))).await;
    let relay = common::spawn_relay(&format!("http://{upstream}")).await;

    relay.shutdown.trigger();
    let url = relay.url("/");
    relay.task.await.unwrap().unwrap();

    let result = common::client().get(url).send().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn lifecycle_states_are_published_in_order() {
    let upstream =
        common::spawn_upstream(Router::new().route("/", get(|| async { "root" }))).await;
    let mut relay = common::spawn_relay(&format!("http://{upstream}")).await;

    assert_eq!(*relay.state.borrow_and_update(), LifecycleState::Serving);

    relay.shutdown.trigger();
    relay.task.await.unwrap().unwrap();

    relay
        .state
        .wait_for(|state| *state == LifecycleState::Stopped(StopKind::Clean))
        .await
        .ok();
    assert_eq!(
        *relay.state.borrow_and_update(),
        LifecycleState::Stopped(StopKind::Clean)
    );
}
