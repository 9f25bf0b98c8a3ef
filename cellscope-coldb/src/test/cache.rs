use super::{json_dataset, jsonl_dataset};
use crate::{ColumnCache, SchemaStore};
use cellscope_base::ErrorKind;
use cellscope_lang::{Column, Datum, COUNT_KEY};
use cellscope_net::MemTransport;
use serde_json::json;
use std::sync::Arc;
use test_log::test;

async fn open(t: &Arc<MemTransport>, url: &str) -> ColumnCache<MemTransport> {
    let store = SchemaStore::new(t.clone(), url);
    let rows = store.load().await.unwrap().rows();
    ColumnCache::new(store.column_source().await.unwrap(), rows)
}

#[test(tokio::test)]
async fn test_fetch_decodes_dense_and_sparse() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    cache.fetch_columns(&["CD14", "CD4", "cell_type"]).await.unwrap();

    assert_eq!(
        *cache.get("CD14").unwrap(),
        Column::Numbers(vec![0.0, 1.5, 0.0, 3.0, 2.0])
    );
    assert_eq!(
        *cache.get("CD4").unwrap(),
        Column::Numbers(vec![0.0, 4.0, 0.0, 5.0, 0.0])
    );
    assert_eq!(cache.get("cell_type").unwrap().datum(3), Datum::Str("NK"));
    assert_eq!(cache.len(), 3);
}

#[test(tokio::test)]
async fn test_each_key_read_once() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    cache.fetch_columns(&["CD14", "CD14"]).await.unwrap();
    cache.fetch_columns(&["CD14", "cell_type"]).await.unwrap();
    assert_eq!(t.reads("mem://d/CD14.json"), 1);
    assert_eq!(t.reads("mem://d/cell_type.json"), 1);
}

#[test(tokio::test)]
async fn test_concurrent_fetches_coalesce() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    let (a, b, c) = futures::join!(
        cache.fetch_columns(&["CD14"]),
        cache.fetch_columns(&["CD14", "CD4"]),
        cache.fetch_columns(&["CD4", "CD14"]),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();
    assert_eq!(t.reads("mem://d/CD14.json"), 1);
    assert_eq!(t.reads("mem://d/CD4.json"), 1);
    assert!(cache.contains("CD14") && cache.contains("CD4"));
}

#[test(tokio::test)]
async fn test_count_key_is_never_fetched() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    let before = t.total_reads();
    cache.fetch_columns(&[COUNT_KEY]).await.unwrap();
    assert_eq!(t.total_reads(), before);
    assert!(cache.contains(COUNT_KEY));
    assert_eq!(*cache.get(COUNT_KEY).unwrap(), Column::ones(5));
    assert!(cache.is_empty());
}

#[test(tokio::test)]
async fn test_cached_columns_are_never_replaced() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    cache.fetch_columns(&["CD14"]).await.unwrap();
    let first = cache.get("CD14").unwrap();
    let snapshot = cache.columns();

    t.insert_json("mem://d/CD14.json", &json!([9.0, 9.0, 9.0, 9.0, 9.0]));
    cache.fetch_columns(&["CD14", "CD4"]).await.unwrap();
    assert!(Arc::ptr_eq(&first, &cache.get("CD14").unwrap()));
    assert_eq!(snapshot.len(), 1);
    assert_eq!(cache.columns().len(), 2);
}

#[test(tokio::test)]
async fn test_failed_read_is_not_cached_and_retries() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    t.remove("mem://d/CD14.json");

    let report = cache.fetch_columns_report(&["CD14", "CD4"]).await;
    assert!(!report.is_ok());
    assert_eq!(report.loaded, vec!["CD4".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "CD14");
    assert_eq!(report.failed[0].1.kind(), ErrorKind::Fetch);
    assert!(!cache.contains("CD14"));
    assert!(cache.contains("CD4"));

    t.insert_json("mem://d/CD14.json", &json!([1, 2, 3, 4, 5]));
    cache.fetch_columns(&["CD14", "CD4"]).await.unwrap();
    assert_eq!(cache.get("CD14").unwrap().number(4), Some(5.0));
    assert_eq!(t.reads("mem://d/CD14.json"), 2);
    assert_eq!(t.reads("mem://d/CD4.json"), 1);
}

#[test(tokio::test)]
async fn test_row_count_mismatch_is_a_decode_error() {
    let t = json_dataset();
    t.insert_json("mem://d/short.json", &json!([1.0, 2.0]));
    let cache = open(&t, "mem://d/").await;
    let e = cache.fetch_columns(&["short"]).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Decode);
    assert!(!cache.contains("short"));
}

#[test(tokio::test)]
async fn test_jsonl_columns_are_ranged_reads() {
    let url = "mem://d/data.jsonl.gz";
    let t = jsonl_dataset(url);
    let cache = open(&t, url).await;
    cache.fetch_columns(&["CD14", "CD8A"]).await.unwrap();
    assert_eq!(cache.get("CD14").unwrap().number(2), Some(2.5));
    assert_eq!(
        *cache.get("CD8A").unwrap(),
        Column::Numbers(vec![0.0, 0.0, 7.0, 0.0])
    );

    let log = t.read_log();
    assert_eq!(log[0].0, format!("{}.idx.json", url));
    assert_eq!(log.iter().filter(|(u, _)| u.ends_with(".idx.json")).count(), 1);
    for (u, range) in &log[1..] {
        assert_eq!(u, url);
        assert!(range.is_some());
    }
    assert_eq!(t.read_log().len(), 4);
}

#[test(tokio::test)]
async fn test_jsonl_missing_key() {
    let url = "mem://d/data.jsonl";
    let t = jsonl_dataset(url);
    let cache = open(&t, url).await;
    let e = cache.fetch_columns(&["GAPDH"]).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert_eq!(e.message(), "key not found: GAPDH");
    // Index and schema record only; an unknown key never reaches the blob.
    assert_eq!(t.read_log().len(), 2);
}

#[test(tokio::test)]
async fn test_get_vector_views() {
    let t = json_dataset();
    let cache = open(&t, "mem://d/").await;
    cache.fetch_columns(&["cell_type"]).await.unwrap();

    let whole = cache.get_vector("cell_type", None).unwrap();
    assert_eq!(whole.name(), "cell_type");
    assert_eq!(whole.size(), 5);

    let sliced = cache.get_vector("cell_type", Some(vec![3, 0])).unwrap();
    assert_eq!(sliced.size(), 2);
    assert_eq!(sliced.get(0), Datum::Str("NK"));
    assert_eq!(sliced.as_array(), json!(["NK", "T"]));

    let count = cache.get_vector(COUNT_KEY, Some(vec![1, 2])).unwrap();
    assert_eq!(count.as_array(), json!([1.0, 1.0]));

    let e = cache.get_vector("CD14", None).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Query);
}
