use std::time::Duration;

use audio_enhancer::store::LogStore;
use audio_enhancer::tasks::BackgroundTasks;
use audio_enhancer::Config;

#[tokio::test]
async fn test_background_tasks_stop_on_shutdown() {
    let guard = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: guard.path().join("data"),
        ..Default::default()
    };
    let store = LogStore::new(config.db_path(), config.enhanced_dir());
    store.initialize().await.unwrap();

    let tasks = BackgroundTasks::start(&config, store);
    let token = tasks.cancellation_token();
    assert!(!token.is_cancelled());

    // Both loops are asleep until their daily slot; shutdown must not wait for it
    tokio::time::timeout(Duration::from_secs(5), tasks.shutdown())
        .await
        .expect("background tasks did not stop");
    assert!(token.is_cancelled());
}
