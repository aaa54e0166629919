use assistant_core::{bootstrap, ServerConfig, ServerMode};

#[tokio::test]
async fn runtime_boots_with_defaults() {
    let mut config = ServerConfig::default();
    config.mode = ServerMode::Headless;
    let runtime = bootstrap(config).await.expect("bootstrap succeeds");
    let result = runtime.serve().await;
    assert!(
        result.is_ok(),
        "expected headless serve to succeed: {result:?}"
    );
}
