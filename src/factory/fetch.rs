//! Fetch phase: one task per source, merged into a single snapshot

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{OpenProxyError, Result};
use crate::models::{FetchReport, ProxyEndpoint};
use crate::source::{ProxyBuilder, SourceParser};

/// A single source paired with the parser of its builder
#[derive(Clone)]
pub(crate) struct SourceJob {
    pub source: String,
    pub parser: Arc<dyn SourceParser>,
}

/// Flatten builders into one job per source, preserving registry order
pub(crate) fn jobs(builders: &[ProxyBuilder]) -> Vec<SourceJob> {
    builders
        .iter()
        .filter_map(|b| b.parser().map(|parser| (b, parser)))
        .flat_map(|(builder, parser)| {
            builder.sources().iter().map(move |source| SourceJob {
                source: source.clone(),
                parser: Arc::clone(parser),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchOptions {
    pub source_timeout: Option<Duration>,
    pub log_source_failures: bool,
}

struct SourceOutcome {
    source: String,
    result: Result<usize>,
}

/// Invoke the parser, absorbing errors, timeouts and panics into the outcome
async fn run_job(
    job: SourceJob,
    merge: mpsc::UnboundedSender<ProxyEndpoint>,
    limit: Option<Duration>,
) -> SourceOutcome {
    let parse = AssertUnwindSafe(job.parser.parse(&job.source)).catch_unwind();

    let caught = match limit {
        Some(limit) => match tokio::time::timeout(limit, parse).await {
            Ok(caught) => caught,
            Err(_) => Ok(Err(OpenProxyError::source_fetch(
                &job.source,
                format!("timed out after {:?}", limit),
            ))),
        },
        None => parse.await,
    };

    let result = caught
        .unwrap_or_else(|_| Err(OpenProxyError::source_fetch(&job.source, "parser panicked")))
        .map(|endpoints| {
            let count = endpoints.len();
            for endpoint in endpoints {
                // Only fails once the collector is gone, i.e. the stream was closed.
                if merge.send(endpoint).is_err() {
                    break;
                }
            }
            count
        });

    SourceOutcome {
        source: job.source,
        result,
    }
}

/// Run every job concurrently and collect their endpoints.
///
/// Returns only after every task has finished; the snapshot is complete at
/// that point and is never written again. Dropping the returned future aborts
/// the outstanding tasks.
pub(crate) async fn collect(
    jobs: Vec<SourceJob>,
    options: FetchOptions,
) -> (Vec<ProxyEndpoint>, FetchReport) {
    let (merge_tx, mut merge_rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();

    for job in jobs {
        tasks.spawn(run_job(job, merge_tx.clone(), options.source_timeout));
    }
    drop(merge_tx);

    let sources = tasks.len();
    info!("Fetching proxies from {} sources", sources);

    let mut snapshot = Vec::new();
    let mut failed_sources = 0;

    loop {
        tokio::select! {
            Some(endpoint) = merge_rx.recv() => snapshot.push(endpoint),
            joined = tasks.join_next() => match joined {
                Some(Ok(SourceOutcome { source, result: Ok(count) })) => {
                    debug!("Source {} yielded {} proxies", source, count);
                }
                Some(Ok(SourceOutcome { source, result: Err(e) })) => {
                    failed_sources += 1;
                    if options.log_source_failures {
                        warn!("Source {} contributed nothing: {}", source, e);
                    } else {
                        debug!("Source {} contributed nothing: {}", source, e);
                    }
                }
                Some(Err(e)) => {
                    failed_sources += 1;
                    warn!("Fetch task did not complete: {}", e);
                }
                // Barrier: every producer has finished.
                None => break,
            },
        }
    }

    // Seal the merge point and take whatever arrived after the last poll.
    merge_rx.close();
    while let Ok(endpoint) = merge_rx.try_recv() {
        snapshot.push(endpoint);
    }

    let report = FetchReport {
        sources,
        failed_sources,
        endpoints: snapshot.len(),
        completed_at: Utc::now(),
    };

    info!(
        "Fetch complete: {} proxies from {} sources ({} failed)",
        report.endpoints,
        report.succeeded_sources(),
        report.failed_sources
    );

    (snapshot, report)
}
