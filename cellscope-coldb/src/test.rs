mod cache;

use cellscope_net::MemTransport;
use serde_json::json;
use std::sync::Arc;

// A five-row dataset in the directory-of-json layout.
pub(crate) fn json_dataset() -> Arc<MemTransport> {
    let t = MemTransport::new();
    t.insert_json(
        "mem://d/schema.json",
        &json!({
            "shape": [5, 3],
            "features": [
                {"name": "CD14", "type": "continuous"},
                {"name": "CD4", "type": "continuous"},
                {"name": "cell_type", "type": "categorical"}
            ],
            "bases": [{"name": "umap"}]
        }),
    );
    t.insert_json("mem://d/CD14.json", &json!([0.0, 1.5, 0.0, 3.0, 2.0]));
    t.insert_json(
        "mem://d/CD4.json",
        &json!({"index": [1, 3], "value": [4.0, 5.0]}),
    );
    t.insert_json(
        "mem://d/cell_type.json",
        &json!(["T", "B", "T", "NK", "B"]),
    );
    t.insert_json(
        "mem://d/umap_2.json",
        &json!([[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]]),
    );
    Arc::new(t)
}

// The same kind of dataset packed into one JSONL blob.
pub(crate) fn jsonl_dataset(blob_url: &str) -> Arc<MemTransport> {
    let t = MemTransport::new();
    t.insert_jsonl(
        blob_url,
        &[
            (
                "schema",
                json!({"shape": [4], "format": "jsonl",
                       "features": [{"name": "CD14", "type": "continuous"}]}),
            ),
            ("CD14", json!([0.5, 0.0, 2.5, 1.0])),
            ("CD8A", json!({"index": [2], "value": [7.0]})),
        ],
    );
    Arc::new(t)
}
