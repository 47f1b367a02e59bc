//! Fixed-size worker pool running independent scans in parallel.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::domain::DetectionResult;
use crate::pipeline::{ScanPipeline, ScanRequest};
use crate::{DetectError, Result};

/// Dispatches one pipeline run per request onto a dedicated thread pool.
///
/// Scans are CPU bound and run to completion. To cancel a batch, drop its
/// results.
pub struct ScanScheduler {
    pipeline: Arc<ScanPipeline>,
    pool: ThreadPool,
}

impl ScanScheduler {
    /// Creates a scheduler with `threads` workers (0 = one per core).
    pub fn new(pipeline: ScanPipeline, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("minesense-scan-{i}"))
            .build()
            .map_err(|e| DetectError::WorkerPool(e.to_string()))?;

        tracing::debug!(threads = pool.current_num_threads(), "Started scan worker pool");
        Ok(Self {
            pipeline: Arc::new(pipeline),
            pool,
        })
    }

    /// Creates a scheduler sized by the pipeline's `worker_threads` setting.
    pub fn from_pipeline(pipeline: ScanPipeline) -> Result<Self> {
        let threads = pipeline.config().worker_threads;
        Self::new(pipeline, threads)
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get the pipeline
    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    /// Scans every request; results are in request order.
    ///
    /// A failing request does not affect the others.
    pub fn run_batch(&self, requests: Vec<ScanRequest>) -> Vec<Result<DetectionResult>> {
        let total = requests.len();
        let pipeline = &self.pipeline;

        let results: Vec<Result<DetectionResult>> = self.pool.install(|| {
            requests
                .par_iter()
                .enumerate()
                .map(|(index, request)| {
                    let result = pipeline.scan(request);
                    if let Err(e) = &result {
                        tracing::warn!(index, error = %e, "Scan failed");
                    }
                    result
                })
                .collect()
        });

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(total, failed, "Batch scan complete");
        results
    }
}

impl std::fmt::Debug for ScanScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanScheduler")
            .field("threads", &self.threads())
            .finish_non_exhaustive()
    }
}
