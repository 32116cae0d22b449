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

//! Test fixtures shared by unit and integration tests

pub mod avro;
pub mod metadata;

/// Binary single-value encoding of an int bound
pub fn int_bound(v: i32) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

/// Binary single-value encoding of a long bound
pub fn long_bound(v: i64) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

/// Binary single-value encoding of a string bound
pub fn string_bound(v: &str) -> Vec<u8> {
    v.as_bytes().to_vec()
}
