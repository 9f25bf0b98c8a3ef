use crate::{base_url_of, ByteRange, ByteRangeIndex, Layout};
use cellscope_base::ErrorKind;
use cellscope_lang::Format;
use test_log::test;

#[test]
fn test_jsonl_urls_select_ranged_mode() {
    for url in ["https://h/d/pbmc.jsonl", "https://h/d/pbmc.jsonl.gz"] {
        let layout = Layout::from_url(url);
        assert_eq!(layout.format(), Format::Jsonl);
        assert_eq!(
            layout,
            Layout::Jsonl {
                base_url: "https://h/d/".to_string(),
                blob_url: url.to_string(),
                index_url: format!("{}.idx.json", url),
            }
        );
    }
}

#[test]
fn test_json_urls() {
    let layout = Layout::from_url("https://h/d/pbmc/schema.json.gz");
    assert_eq!(layout.format(), Format::Json);
    assert_eq!(
        layout,
        Layout::Json {
            base_url: "https://h/d/pbmc/".to_string(),
            schema_url: "https://h/d/pbmc/schema.json.gz".to_string(),
        }
    );
    assert_eq!(layout.column_url("CD14"), "https://h/d/pbmc/CD14.json");
    assert_eq!(layout.job_url("job1"), "https://h/d/pbmc/uns/job1.json");
}

#[test]
fn test_unrecognized_suffix_rewritten_to_schema_json() {
    let layout = Layout::from_url("https://h/d/pbmc");
    assert_eq!(
        layout,
        Layout::Json {
            base_url: "https://h/d/".to_string(),
            schema_url: "https://h/d/schema.json".to_string(),
        }
    );
    let layout = Layout::from_url("https://h/d/pbmc/");
    assert_eq!(layout.base_url(), "https://h/d/pbmc/");
    assert_eq!(base_url_of("no-slash"), "");
}

#[test]
fn test_byte_range_index() {
    let idx = ByteRangeIndex::from_json_slice(
        br#"{"index": {"schema": [0, 99], "CD14": [100, 149]}}"#,
    )
    .unwrap();
    assert_eq!(idx.len(), 2);
    let r = idx.range("CD14").unwrap();
    assert_eq!(r, ByteRange::new(100, 149).unwrap());
    assert_eq!(r.len(), 50);
    assert_eq!(r.header_value(), "bytes=100-149");
    let e = idx.range("CD3E").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert!(e.message().contains("key not found"));

    let backwards = ByteRangeIndex::from_json_slice(br#"{"index": {"a": [10, 2]}}"#);
    assert_eq!(backwards.unwrap_err().kind(), ErrorKind::Schema);
    let malformed = ByteRangeIndex::from_json_slice(br#"{"ranges": {}}"#);
    assert_eq!(malformed.unwrap_err().kind(), ErrorKind::Schema);
}

#[test]
fn test_byte_range_slice() {
    let body = b"0123456789";
    assert_eq!(ByteRange::new(2, 4).unwrap().slice(body).unwrap(), b"234");
    assert_eq!(ByteRange::new(9, 9).unwrap().slice(body).unwrap(), b"9");
    assert!(ByteRange::new(8, 10).unwrap().slice(body).is_err());
}

#[test]
fn test_backwards_byte_range_rejected() {
    let e = ByteRange::new(5, 3).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    let one = ByteRange::new(7, 7).unwrap();
    assert_eq!((one.start(), one.end(), one.len()), (7, 7, 1));
}
