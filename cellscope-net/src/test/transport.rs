use crate::{ByteRange, FileTransport, HttpConfig, HttpTransport, MemTransport, Transport};
use cellscope_base::ErrorKind;
use std::time::Duration;
use test_log::test;

#[test(tokio::test)]
async fn test_mem_transport_counts_and_ranges() {
    let t = MemTransport::new();
    t.insert("mem://d/blob.jsonl", "hello world");
    assert_eq!(t.get("mem://d/blob.jsonl", None).await.unwrap(), b"hello world");
    let part = t
        .get("mem://d/blob.jsonl", Some(ByteRange::new(6, 10).unwrap()))
        .await
        .unwrap();
    assert_eq!(part, b"world");
    assert_eq!(t.reads("mem://d/blob.jsonl"), 2);

    let e = t.get("mem://d/missing.json", None).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert_eq!(t.total_reads(), 3);
    assert_eq!(
        t.read_log()[1],
        ("mem://d/blob.jsonl".to_string(), Some(ByteRange::new(6, 10).unwrap()))
    );
}

#[test(tokio::test)]
async fn test_file_transport_ranged_read() {
    let dir = std::env::temp_dir().join(format!("cellscope-net-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("blob.jsonl"), b"{\"a\":1}\n[1,2,3]\n").unwrap();

    let t = FileTransport::with_root(&dir);
    let whole = t.get("blob.jsonl", None).await.unwrap();
    assert_eq!(whole.len(), 16);
    let rec = t.get("blob.jsonl", Some(ByteRange::new(8, 14).unwrap())).await.unwrap();
    assert_eq!(rec, b"[1,2,3]");

    let url = format!("file://{}", dir.join("blob.jsonl").display());
    assert_eq!(FileTransport::new().get(&url, None).await.unwrap(), whole);

    let e = t.get("nope.json", None).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_http_transport_builds_from_config() {
    let config = HttpConfig {
        request_timeout: Duration::from_secs(5),
        ..HttpConfig::default()
    };
    assert!(config.user_agent.starts_with("cellscope/"));
    assert!(HttpTransport::new(&config).is_ok());
}
