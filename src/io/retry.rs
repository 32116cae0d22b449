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

//! Bounded retries at the storage boundary

use super::FileIO;
use crate::error::{Error, Result};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use std::future::Future;
use std::ops::Range;
use std::time::Duration;

/// Exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Doubling backoff between `initial_backoff` and `max_backoff`
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::new()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_factor(2.0)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        op.retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(Error::is_retryable)
            .notify(|e, delay| log::warn!("{what} failed, retrying in {delay:?}: {e}"))
            .await
    }
}

/// Retries retryable storage failures of the wrapped [`FileIO`]
#[derive(Debug, Clone)]
pub struct RetryingFileIO<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: FileIO> RetryingFileIO<F> {
    /// Wraps `inner` with the default policy
    pub fn new(inner: F) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: F, policy: RetryPolicy) -> Self {
        RetryingFileIO { inner, policy }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: FileIO> FileIO for RetryingFileIO<F> {
    async fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes> {
        self.policy
            .run(&format!("read of '{path}'"), || {
                self.inner.read(path, range.clone())
            })
            .await
    }

    async fn length(&self, path: &str) -> Result<u64> {
        self.policy
            .run(&format!("length of '{path}'"), || self.inner.length(path))
            .await
    }
}
