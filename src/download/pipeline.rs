//! Source → resolver → pool wiring.

use futures::channel::mpsc;
use futures::SinkExt;

use crate::dedup::DedupLedger;
use crate::download::pool::{DownloadPool, PoolItem};
use crate::download::record::DownloadRecord;
use crate::download::shutdown::Shutdown;
use crate::error::{Error, Result};
use crate::media::{MediaResolver, PostKind, SavedPost};
use crate::output::RunReport;
use crate::source::PostSource;

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Fatal source error that cut the run short.
    pub error: Option<Error>,
}

/// The stages a run streams saved posts through.
pub struct Pipeline<'a> {
    pub resolver: &'a MediaResolver,
    pub ledger: &'a DedupLedger,
    pub pool: &'a DownloadPool,
    /// Items resolved ahead of the pool.
    pub channel_capacity: usize,
}

impl Pipeline<'_> {
    /// Stream saved posts from `source` through the resolver into the pool.
    ///
    /// Resolving runs ahead of downloading through a bounded channel, so the
    /// saved list is never held in memory at once. `on_queued` fires for
    /// every item handed to the pool and `on_record` for every outcome.
    pub async fn run<Q, F>(
        &self,
        source: &mut dyn PostSource,
        shutdown: Shutdown,
        mut on_queued: Q,
        mut on_record: F,
    ) -> RunOutcome
    where
        Q: FnMut(),
        F: FnMut(&DownloadRecord),
    {
        let (tx, rx) = mpsc::channel(self.channel_capacity.max(1));
        let mut report = RunReport::default();

        let producer = produce(
            source,
            self.resolver,
            self.ledger,
            tx,
            shutdown.clone(),
            &mut on_queued,
        );
        let consumer = self.pool.run(rx, shutdown.clone(), |record| {
            on_record(&record);
            report.add(&record);
        });

        let (produced, ()) = tokio::join!(producer, consumer);

        report.interrupted = shutdown.is_triggered();
        RunOutcome {
            report,
            error: produced.err(),
        }
    }
}

async fn produce(
    source: &mut dyn PostSource,
    resolver: &MediaResolver,
    ledger: &DedupLedger,
    mut tx: mpsc::Sender<PoolItem>,
    shutdown: Shutdown,
    on_queued: &mut dyn FnMut(),
) -> Result<()> {
    loop {
        let batch = tokio::select! {
            batch = source.next_batch() => batch?,
            _ = shutdown.clone().wait() => return Ok(()),
        };
        let posts = match batch {
            Some(posts) => posts,
            None => return Ok(()),
        };

        for post in posts {
            let items = tokio::select! {
                items = prepare(&post, resolver, ledger) => items,
                _ = shutdown.clone().wait() => return Ok(()),
            };

            for item in items {
                on_queued();
                // Receiver gone means the pool stopped
                if tx.send(item).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Turn a post into pool work: downloads, or an outcome decided up front.
async fn prepare(
    post: &SavedPost,
    resolver: &MediaResolver,
    ledger: &DedupLedger,
) -> Vec<PoolItem> {
    // Gallery images are recorded one by one, so the pool checks each of them
    if post.kind != PostKind::Gallery && ledger.contains(&post.id).await {
        tracing::debug!("Skipping post {}: already downloaded", post.id);
        return vec![PoolItem::Settled(DownloadRecord::duplicate(post.id.clone(), None))];
    }

    match resolver.resolve(post).await {
        Ok(media) if media.is_empty() => {
            tracing::debug!("Post {} has no downloadable media ({})", post.id, post.kind);
            vec![PoolItem::Settled(DownloadRecord::skipped(
                post.id.clone(),
                format!("no downloadable media ({})", post.kind),
            ))]
        }
        Ok(media) => media.into_iter().map(PoolItem::Download).collect(),
        Err(e @ (Error::UnsupportedMedia(_) | Error::ContentGone(_))) => {
            tracing::warn!("Skipping post {}: {}", post.id, e);
            vec![PoolItem::Settled(DownloadRecord::skipped(
                post.id.clone(),
                e.to_string(),
            ))]
        }
        Err(e) => {
            tracing::warn!("Could not resolve post {}: {}", post.id, e);
            vec![PoolItem::Settled(DownloadRecord::failed(
                post.id.clone(),
                e.to_string(),
            ))]
        }
    }
}
