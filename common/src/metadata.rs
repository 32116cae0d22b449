// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Table metadata document fixtures

use serde_json::{Value as JsonValue, json};

/// Builds a format v2 table metadata document
///
/// Starts with schema 0 `{1: x int, 2: name string}` partitioned by
/// `identity(x)` as spec 0, and no snapshots.
#[derive(Debug, Clone)]
pub struct TableMetadataFixture {
    doc: JsonValue,
}

impl TableMetadataFixture {
    pub fn v2(location: &str) -> Self {
        let doc = json!({
            "format-version": 2,
            "table-uuid": uuid::Uuid::new_v4().to_string(),
            "location": location,
            "last-sequence-number": 0,
            "last-updated-ms": 1_700_000_000_000i64,
            "last-column-id": 2,
            "current-schema-id": 0,
            "schemas": [{
                "type": "struct",
                "schema-id": 0,
                "fields": [
                    {"id": 1, "name": "x", "required": false, "type": "int"},
                    {"id": 2, "name": "name", "required": false, "type": "string"}
                ]
            }],
            "default-spec-id": 0,
            "partition-specs": [{
                "spec-id": 0,
                "fields": [{"source-id": 1, "field-id": 1000, "name": "x", "transform": "identity"}]
            }],
            "last-partition-id": 1000,
            "default-sort-order-id": 0,
            "sort-orders": [{"order-id": 0, "fields": []}],
            "properties": {},
            "current-snapshot-id": -1,
            "snapshots": [],
            "snapshot-log": [],
            "metadata-log": []
        });
        Self { doc }
    }

    /// Adds a schema and makes it current
    pub fn with_current_schema(mut self, schema: JsonValue) -> Self {
        let id = schema["schema-id"].clone();
        if let Some(last) = schema["fields"]
            .as_array()
            .and_then(|fields| fields.iter().filter_map(|f| f["id"].as_i64()).max())
        {
            let current = self.doc["last-column-id"].as_i64().unwrap_or(0);
            self.doc["last-column-id"] = json!(current.max(last));
        }
        self.array_mut("schemas").push(schema);
        self.doc["current-schema-id"] = id;
        self
    }

    /// Replaces the partition specs with `spec` as the default
    pub fn with_only_spec(mut self, spec: JsonValue) -> Self {
        self.doc["default-spec-id"] = spec["spec-id"].clone();
        let last = spec["fields"]
            .as_array()
            .and_then(|fields| fields.iter().filter_map(|f| f["field-id"].as_i64()).max())
            .unwrap_or(999);
        self.doc["last-partition-id"] = json!(last);
        self.doc["partition-specs"] = json!([spec]);
        self
    }

    /// Adds a partition spec without changing the default
    pub fn with_spec(mut self, spec: JsonValue) -> Self {
        self.array_mut("partition-specs").push(spec);
        self
    }

    /// Appends a snapshot and makes it current
    pub fn with_snapshot(
        mut self,
        snapshot_id: i64,
        parent: Option<i64>,
        sequence_number: i64,
        timestamp_ms: i64,
        manifest_list: &str,
    ) -> Self {
        let mut snapshot = json!({
            "snapshot-id": snapshot_id,
            "sequence-number": sequence_number,
            "timestamp-ms": timestamp_ms,
            "manifest-list": manifest_list,
            "summary": {"operation": "append"},
            "schema-id": self.doc["current-schema-id"].clone()
        });
        if let Some(parent) = parent {
            snapshot["parent-snapshot-id"] = json!(parent);
        }
        self.array_mut("snapshots").push(snapshot);
        self.array_mut("snapshot-log")
            .push(json!({"snapshot-id": snapshot_id, "timestamp-ms": timestamp_ms}));
        self.doc["current-snapshot-id"] = json!(snapshot_id);
        self.doc["last-sequence-number"] = json!(sequence_number);
        self
    }

    /// Points the current snapshot elsewhere
    pub fn with_current_snapshot(mut self, snapshot_id: i64) -> Self {
        self.doc["current-snapshot-id"] = json!(snapshot_id);
        self
    }

    /// Adds a branch or tag
    pub fn with_ref(mut self, name: &str, snapshot_id: i64, kind: &str) -> Self {
        if !self.doc["refs"].is_object() {
            self.doc["refs"] = json!({});
        }
        self.doc["refs"][name] = json!({"snapshot-id": snapshot_id, "type": kind});
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.doc["properties"][key] = json!(value);
        self
    }

    pub fn json(&self) -> &JsonValue {
        &self.doc
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.doc).unwrap()
    }

    fn array_mut(&mut self, key: &str) -> &mut Vec<JsonValue> {
        self.doc[key].as_array_mut().unwrap()
    }
}
