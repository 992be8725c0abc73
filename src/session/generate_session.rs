use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use image::RgbaImage;
use rayon::prelude::*;

use crate::assets::source::{AssetSource, FsAssetSource};
use crate::config::tree::CategoryTree;
use crate::edition::driver::{EditionDriver, EditionItem, ItemTicket};
use crate::edition::metadata::item_stem;
use crate::encode::sink::{ItemSink, SinkConfig};
use crate::foundation::error::{LayergenError, LayergenResult};
use crate::render::compositor::{Compositor, ImageCompositor};

const MAX_REORDER_BUFFER_BYTES: u64 = 256 * 1024 * 1024;

/// Options controlling a generation run.
#[derive(Clone, Debug)]
pub struct GenerateSessionOpts {
    /// Number of rayon worker threads (the concurrency cap). `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Items scheduled per batch; also bounds the reorder buffer.
    pub chunk_size: usize,
    /// Bounded channel capacity between workers and the writer thread.
    pub channel_capacity: usize,
    /// Run seed. `None` draws one and logs it.
    pub seed: Option<u64>,
    /// Record failed items and continue instead of aborting on the first failure.
    pub keep_going: bool,
}

impl Default for GenerateSessionOpts {
    fn default() -> Self {
        Self {
            threads: None,
            chunk_size: 64,
            channel_capacity: 4,
            seed: None,
            keep_going: false,
        }
    }
}

/// An item that could not be produced or written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure {
    /// Index of the edition configuration.
    pub config_index: usize,
    /// Sequence number.
    pub number: u64,
    /// `<prefix>-<n>`.
    pub stem: String,
    /// Rendered error.
    pub error: String,
}

/// Outcome of [`GenerateSession::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Seed the run used.
    pub run_seed: u64,
    /// Items across all edition configurations.
    pub items_total: u64,
    /// Items delivered to the sink.
    pub items_written: u64,
    /// Layers dropped by per-asset failures, summed over delivered items.
    pub layers_skipped: u64,
    /// Items recorded as failed (only with `keep_going`).
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    /// `true` when every item was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.items_written == self.items_total
    }
}

/// Runs every edition configuration of a validated tree through one bounded worker pool.
///
/// Items are resolved and rendered in parallel up to the thread cap, then reordered and handed to
/// the sink in configuration order, then sequence number.
pub struct GenerateSession {
    tree: CategoryTree,
    assets: Box<dyn AssetSource>,
    compositor: Box<dyn Compositor>,
    opts: GenerateSessionOpts,
}

impl GenerateSession {
    /// Session reading assets below `assets_root` and compositing with [`ImageCompositor`].
    pub fn new(
        tree: CategoryTree,
        assets_root: impl Into<PathBuf>,
        opts: GenerateSessionOpts,
    ) -> Self {
        Self::with_backends(
            tree,
            Box::new(FsAssetSource::new(assets_root)),
            Box::new(ImageCompositor::default()),
            opts,
        )
    }

    /// Session over caller-provided asset and rendering gateways.
    pub fn with_backends(
        tree: CategoryTree,
        assets: Box<dyn AssetSource>,
        compositor: Box<dyn Compositor>,
        opts: GenerateSessionOpts,
    ) -> Self {
        Self {
            tree,
            assets,
            compositor,
            opts,
        }
    }

    /// Validated tree the session generates from.
    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    /// Options the session was built with.
    pub fn opts(&self) -> &GenerateSessionOpts {
        &self.opts
    }

    /// Generate every item and stream it into `sink`.
    ///
    /// Leaf directories are checked before `sink.begin`, so configuration problems found there
    /// leave no output behind. A configuration error found later cancels the remaining work;
    /// items already written are kept.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn run(&self, sink: &mut dyn ItemSink) -> LayergenResult<RunReport> {
        let run_seed = self.opts.seed.unwrap_or_else(rand::random);
        tracing::info!(seed = run_seed, "starting run");

        let driver = EditionDriver::new(
            &self.tree,
            self.assets.as_ref(),
            self.compositor.as_ref(),
            run_seed,
        );
        let total = driver.total();
        let pool = build_thread_pool(self.opts.threads)?;
        driver.preflight()?;

        let cap = self.opts.channel_capacity.max(1);
        let bytes_per_item = self
            .tree
            .editions()
            .iter()
            .map(|e| {
                let c = self.tree.canvas_for(e);
                (c.width as u64)
                    .saturating_mul(c.height as u64)
                    .saturating_mul(4)
            })
            .max()
            .unwrap_or(0)
            .max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_item).max(1);
        let chunk_size = (self.opts.chunk_size.max(1) as u64).min(max_chunk_by_mem) as usize;

        let cancel = AtomicBool::new(false);
        let keep_going = self.opts.keep_going;

        // Writer thread: deliver items to the sink in ticket order regardless of completion order.
        std::thread::scope(|scope| -> LayergenResult<RunReport> {
            let (tx, rx) = mpsc::sync_channel::<ItemMsg>(cap);
            let sink_ref: &mut dyn ItemSink = sink;
            let cancel_ref = &cancel;

            let writer = scope.spawn(move || -> LayergenResult<RunReport> {
                sink_ref.begin(SinkConfig {
                    items_total: total,
                    run_seed,
                })?;

                let mut report = RunReport {
                    run_seed,
                    items_total: total,
                    ..Default::default()
                };
                let mut next = 0u64;
                let mut pending = HashMap::<u64, ItemMsg>::new();
                while next < total {
                    let Some(msg) = pending.remove(&next) else {
                        match rx.recv() {
                            Ok(msg) => {
                                pending.insert(msg.ticket.ordinal, msg);
                                continue;
                            }
                            // Producers stopped early; the run error is reported by the caller.
                            Err(_) => break,
                        }
                    };
                    next += 1;

                    let outcome = match msg.result {
                        Ok(produced) => {
                            let (item, image) = *produced;
                            report.layers_skipped += item.skipped.len() as u64;
                            sink_ref
                                .push_item(&item, &image)
                                .map(|()| report.items_written += 1)
                        }
                        Err(e) => Err(e),
                    };
                    if let Err(e) = outcome {
                        if !keep_going || e.is_config() {
                            cancel_ref.store(true, Ordering::Relaxed);
                            return Err(e);
                        }
                        tracing::error!(item = %msg.stem, error = %e, "item failed");
                        report.failures.push(ItemFailure {
                            config_index: msg.ticket.config_index,
                            number: msg.ticket.number,
                            stem: msg.stem,
                            error: e.to_string(),
                        });
                    }
                }

                sink_ref.end()?;
                Ok(report)
            });

            let ctx = ProduceCtx {
                driver: &driver,
                tree: &self.tree,
                pool: &pool,
                tx: &tx,
                cancel: &cancel,
                keep_going,
            };
            let produce_res = produce_all(&ctx, driver.tickets(), chunk_size);

            drop(tx);
            let writer_res = writer.join().map_err(|_| {
                LayergenError::Other(anyhow::anyhow!("writer thread panicked"))
            })?;

            let report = match (produce_res, writer_res) {
                (_, Err(e)) => return Err(e),
                (Err(e), Ok(_)) => return Err(e),
                (Ok(()), Ok(report)) => report,
            };
            tracing::info!(
                seed = report.run_seed,
                written = report.items_written,
                total = report.items_total,
                skipped_layers = report.layers_skipped,
                failures = report.failures.len(),
                "run finished"
            );
            Ok(report)
        })
    }
}

struct ItemMsg {
    ticket: ItemTicket,
    stem: String,
    result: LayergenResult<Box<(EditionItem, RgbaImage)>>,
}

#[derive(Clone, Copy)]
struct ProduceCtx<'a> {
    driver: &'a EditionDriver<'a>,
    tree: &'a CategoryTree,
    pool: &'a rayon::ThreadPool,
    tx: &'a mpsc::SyncSender<ItemMsg>,
    cancel: &'a AtomicBool,
    keep_going: bool,
}

fn produce_all(
    ctx: &ProduceCtx<'_>,
    mut tickets: impl Iterator<Item = ItemTicket>,
    chunk_size: usize,
) -> LayergenResult<()> {
    loop {
        let chunk = tickets.by_ref().take(chunk_size).collect::<Vec<_>>();
        if chunk.is_empty() {
            return Ok(());
        }
        if ctx.cancel.load(Ordering::Relaxed) {
            return Err(cancelled());
        }
        produce_chunk(ctx, chunk)?;
    }
}

fn produce_chunk(ctx: &ProduceCtx<'_>, chunk: Vec<ItemTicket>) -> LayergenResult<()> {
    ctx.pool.install(|| {
        chunk.into_par_iter().try_for_each_with(
            ctx.tx.clone(),
            |tx, ticket| -> LayergenResult<()> {
                if ctx.cancel.load(Ordering::Relaxed) {
                    return Err(cancelled());
                }
                let result = match ctx.driver.produce(ticket) {
                    Ok(produced) => Ok(Box::new(produced)),
                    Err(e) if e.is_config() || !ctx.keep_going => {
                        ctx.cancel.store(true, Ordering::Relaxed);
                        return Err(e);
                    }
                    Err(e) => Err(e),
                };
                tx.send(ItemMsg {
                    ticket,
                    stem: stem_of(ctx.tree, ticket),
                    result,
                })
                .map_err(|_| cancelled())
            },
        )
    })
}

fn stem_of(tree: &CategoryTree, ticket: ItemTicket) -> String {
    tree.editions()
        .get(ticket.config_index)
        .map(|e| item_stem(&e.name_prefix, ticket.number))
        .unwrap_or_default()
}

fn cancelled() -> LayergenError {
    LayergenError::Other(anyhow::anyhow!("run cancelled"))
}

fn build_thread_pool(threads: Option<usize>) -> LayergenResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LayergenError::config("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        LayergenError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/session/generate_session.rs"]
mod tests;
