// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Chain store persistence through the file backend.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chain_recorder::record::{RequestRecord, ResponseRecord};
use chain_recorder::storage::{ChainStorage, FileStorage};
use chain_recorder::store::{Chain, ChainStore, STORAGE_KEY, STORAGE_VERSION};
use rstest::rstest;
use serde_json::json;
use tokio::fs;

use common::make_temp_storage_path;

fn make_chain(name: &str, urls: &[&str]) -> anyhow::Result<Chain> {
    let mut requests = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        let mut r = RequestRecord::new(url, Some(if i % 2 == 0 { "GET" } else { "POST" }))?
            .with_headers(HashMap::from([("x-step".to_string(), i.to_string())]));
        if i % 2 == 1 {
            r = r.with_body(format!("step={}", i));
        }
        r.resolve(ResponseRecord {
            status: 200 + i as u16,
            headers: HashMap::new(),
            body: format!("body {}", i),
        });
        requests.push(r);
    }
    Ok(Chain::from_recording(name, &requests)?)
}

#[tokio::test]
async fn reload_yields_structurally_equal_chains() -> anyhow::Result<()> {
    let path = make_temp_storage_path("roundtrip");
    let a = make_chain("A", &["example.com/login", "example.com/submit"])?;
    let b = make_chain("B", &["https://other.example/"])?;

    let mut store = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    store.add(a.clone()).await;
    store.add(b.clone()).await;

    let reloaded = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    assert_eq!(reloaded.list(), &[a, b]);

    let raw = FileStorage::new(&path)
        .read(STORAGE_KEY)
        .await?
        .ok_or_else(|| anyhow::anyhow!("nothing persisted"))?;
    assert_eq!(raw["version"], STORAGE_VERSION);

    let _ = fs::remove_file(&path).await;
    Ok(())
}

#[tokio::test]
async fn delete_persists_even_without_match() -> anyhow::Result<()> {
    let path = make_temp_storage_path("delete");
    let a = make_chain("A", &["example.com"])?;

    let mut store = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    store.add(a.clone()).await;
    assert!(store.remove("does-not-exist").await.is_err());

    let reloaded = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    assert_eq!(reloaded.list(), &[a.clone()]);

    let mut store = reloaded;
    store.remove(&a.id).await?;
    let reloaded = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    assert!(reloaded.is_empty());

    let _ = fs::remove_file(&path).await;
    Ok(())
}

#[rstest]
#[case("")]
#[case("{broken")]
#[case("[1, 2, 3]")]
#[tokio::test]
async fn unusable_documents_load_as_empty(#[case] contents: &str) -> anyhow::Result<()> {
    let path = make_temp_storage_path("unusable");
    fs::write(&path, contents).await?;

    let store = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    assert!(store.is_empty());

    let _ = fs::remove_file(&path).await;
    Ok(())
}

#[tokio::test]
async fn newer_version_file_is_left_untouched() -> anyhow::Result<()> {
    let path = make_temp_storage_path("future");
    let future = make_chain("future", &["example.com/next"])?;
    let mut doc = serde_json::Map::new();
    doc.insert(
        STORAGE_KEY.to_string(),
        json!({"version": STORAGE_VERSION + 1, "chains": [future]}),
    );
    let document = serde_json::Value::Object(doc);
    fs::write(&path, serde_json::to_vec(&document)?).await?;

    let mut store = ChainStore::load(Arc::new(FileStorage::new(&path))).await;
    assert!(store.is_empty());
    store.add(make_chain("new", &["example.com"])?).await;

    let on_disk: serde_json::Value = serde_json::from_slice(&fs::read(&path).await?)?;
    assert_eq!(on_disk, document);

    let _ = fs::remove_file(&path).await;
    Ok(())
}
