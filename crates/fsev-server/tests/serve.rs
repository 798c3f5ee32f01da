//! End-to-end tests for the serve loop.
//!
//! These exercise a real notification backend against a temp directory.
//! Event delivery is timing-dependent across platforms, so the tests that
//! wait for dispatch only assert on the event when it arrived; shutdown
//! behavior is asserted unconditionally.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use fsev_core::ServeError;
use fsev_router::{handler_fn, Handler, ServeMux};
use fsev_server::Server;

fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_owned()).expect("utf-8 temp path")
}

/// Gives the backend a moment to establish its subscriptions.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}

#[tokio::test]
async fn test_close_ends_serving_cleanly() {
    let tmp = TempDir::new().expect("temp dir");
    let root = utf8_root(&tmp);

    let mux = Arc::new(ServeMux::new());
    let server = Arc::new(Server::builder(root).handler(mux as Arc<dyn Handler>).build());

    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen_and_serve().await }
    });

    settle().await;
    server.close();

    let result = timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve loop ends after close")
        .expect("serve task does not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_close_before_serving_is_clean() {
    let tmp = TempDir::new().expect("temp dir");
    let server = Arc::new(Server::new(utf8_root(&tmp)));

    server.close();
    let result = timeout(Duration::from_secs(5), server.listen_and_serve())
        .await
        .expect("serve loop ends immediately");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_created_file_reaches_matching_handler() {
    let tmp = TempDir::new().expect("temp dir");
    let root = utf8_root(&tmp);

    let (seen_tx, mut seen_rx) = mpsc::channel::<Utf8PathBuf>(8);
    let mux = Arc::new(ServeMux::new());
    mux.register(
        &format!("{root}/**"),
        Arc::new(handler_fn(move |ctx| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(ctx.request().path.clone()).await;
                Ok(())
            }
        })),
    )
    .expect("register route");

    let server = Arc::new(
        Server::builder(root.clone())
            .handler(mux as Arc<dyn Handler>)
            .build(),
    );
    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen_and_serve().await }
    });

    settle().await;
    std::fs::write(root.join("fresh.txt"), b"payload").expect("write file");

    // Delivery is timing-dependent; only assert on an event that arrived.
    if let Ok(Some(path)) = timeout(Duration::from_secs(3), seen_rx.recv()).await {
        assert!(path.as_str().ends_with("fresh.txt"));
    }

    server.close();
    let result = timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve loop ends after close")
        .expect("serve task does not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_handler_errors_reach_error_handler() {
    let tmp = TempDir::new().expect("temp dir");
    let root = utf8_root(&tmp);

    let mux = Arc::new(ServeMux::new());
    mux.register(
        &format!("{root}/**"),
        Arc::new(handler_fn(|ctx| async move {
            Err(ServeError::handling_request(
                ctx.request().path.clone(),
                "conversion failed",
            ))
        })),
    )
    .expect("register route");

    let (err_tx, mut err_rx) = mpsc::channel::<String>(8);
    let error_handler = move |error: &ServeError| {
        let _ = err_tx.try_send(error.to_string());
    };

    let server = Arc::new(
        Server::builder(root.clone())
            .handler(mux as Arc<dyn Handler>)
            .error_handler(Arc::new(error_handler))
            .build(),
    );
    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen_and_serve().await }
    });

    settle().await;
    std::fs::write(root.join("doomed.txt"), b"payload").expect("write file");

    if let Ok(Some(message)) = timeout(Duration::from_secs(3), err_rx.recv()).await {
        assert!(message.contains("conversion failed"));
    }

    server.close();
    let result = timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve loop ends after close")
        .expect("serve task does not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_relative_root_is_rejected() {
    let server = Server::new("relative/media");
    let err = server.listen_and_serve().await.unwrap_err();
    assert!(matches!(err, ServeError::ListeningDirectory { .. }));
}

#[tokio::test]
async fn test_missing_root_is_rejected() {
    let server = Server::new("/nonexistent/fsev-serve-test");
    let err = server.listen_and_serve().await.unwrap_err();
    assert!(matches!(err, ServeError::ListeningDirectory { .. }));
}

#[tokio::test]
async fn test_ignored_subtree_is_not_watched() {
    let tmp = TempDir::new().expect("temp dir");
    let root = utf8_root(&tmp);
    std::fs::create_dir_all(root.join("kept")).expect("create dir");
    std::fs::create_dir_all(root.join("skipped")).expect("create dir");

    let (seen_tx, mut seen_rx) = mpsc::channel::<Utf8PathBuf>(8);
    let mux = Arc::new(ServeMux::new());
    mux.register(
        &format!("{root}/**"),
        Arc::new(handler_fn(move |ctx| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(ctx.request().path.clone()).await;
                Ok(())
            }
        })),
    )
    .expect("register route");

    let server = Arc::new(
        Server::builder(root.clone())
            .handler(mux as Arc<dyn Handler>)
            .ignore(vec![format!("{root}/skipped*")])
            .build(),
    );
    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen_and_serve().await }
    });

    settle().await;
    std::fs::write(root.join("skipped/hidden.txt"), b"x").expect("write file");
    std::fs::write(root.join("kept/visible.txt"), b"x").expect("write file");

    // Whatever arrives must come from the watched subtree.
    while let Ok(Some(path)) = timeout(Duration::from_secs(2), seen_rx.recv()).await {
        assert!(
            !path.as_str().contains("skipped"),
            "event from ignored subtree: {path}"
        );
        if path.as_str().ends_with("visible.txt") {
            break;
        }
    }

    server.close();
    let result = timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve loop ends after close")
        .expect("serve task does not panic");
    assert!(result.is_ok());
}
