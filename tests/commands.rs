//! Drives the public command functions end to end against the in-memory sheet.

use accountant::{commands, Config, ErrorType, Mode};
use tempfile::TempDir;
use uuid::Uuid;

async fn setup() -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let secret = dir.path().join("client_secret.json");
    std::fs::write(&secret, "{}").unwrap();
    let home = dir.path().join("home");
    let sheet_url = format!(
        "https://docs.google.com/spreadsheets/d/{}/edit",
        Uuid::new_v4().simple()
    );
    commands::init(&home, &secret, &sheet_url).await.unwrap();
    let config = Config::load(&home).await.unwrap();
    (dir, config)
}

#[tokio::test]
async fn test_record_expenses() {
    let (_dir, config) = setup().await;

    let out = commands::total(&config, Mode::Test).await.unwrap();
    assert_eq!(out.structure().unwrap().tab, "October 2025");
    assert_eq!(out.structure().unwrap().total.to_string(), "1017,90");

    let first = commands::add(&config, Mode::Test, "Lunch 2.95").await.unwrap();
    assert_eq!(first.structure().unwrap().row.number(), 8);

    let second = commands::add(&config, Mode::Test, "Bus ticket 1,50")
        .await
        .unwrap();
    let added = second.structure().unwrap();
    assert_eq!(added.row.number(), 9);
    assert_eq!(added.entry.description(), "Bus ticket");
    assert_eq!(added.total.unwrap().to_string(), "1022,35");

    let out = commands::total(&config, Mode::Test).await.unwrap();
    assert_eq!(
        out.message(),
        "The monthly total of 'October 2025' is 1022,35€"
    );
}

#[tokio::test]
async fn test_reject_malformed_expense() {
    let (_dir, config) = setup().await;
    let err = commands::add(&config, Mode::Test, "2.95").await.unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Parse);

    let out = commands::total(&config, Mode::Test).await.unwrap();
    assert_eq!(out.structure().unwrap().total.to_string(), "1017,90");
}

#[tokio::test]
async fn test_verify_in_test_mode() {
    let (_dir, config) = setup().await;
    let out = commands::auth_verify(&config, Mode::Test).await.unwrap();
    assert_eq!(out.structure().unwrap().active_tab, "October 2025");
}
