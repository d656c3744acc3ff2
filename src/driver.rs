//! Batch driver: evaluates `CIDR_MATCH` over a list of address rows.
//!
//! Rows are cut into pages of `batch_size` positions. Pages are spread over
//! `workers` threads; each worker gets its own [`DriverContext`] and its own
//! evaluator from one shared factory, and results are reassembled in row
//! order.

use crate::block::{Block, BlockFactory, Page};
use crate::expression::cidr::{self, IP_LENGTH};
use crate::expression::CidrMatchEvaluatorFactory;
use crate::operator::{
    ChannelEvaluatorFactory, DriverContext, ExpressionEvaluatorFactory, LiteralEvaluatorFactory,
};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::path::Path;

/// Encoded addresses of one row. An empty row is null.
pub type AddressRow = Vec<[u8; IP_LENGTH]>;

/// Settings for a driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Maximum number of rows per page
    pub batch_size: usize,
    /// Number of worker threads, each with its own evaluator
    pub workers: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            workers: 1,
        }
    }
}

/// Parse newline separated address rows.
///
/// An empty line is a null row; a line with comma separated addresses is a
/// multi-valued row.
pub fn parse_addresses(text: &str) -> Result<Vec<AddressRow>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() {
                return Ok(Vec::new());
            }
            line.split(',')
                .map(|addr| cidr::parse_ip(addr).with_context(|| format!("line {}", i + 1)))
                .collect()
        })
        .collect()
}

/// Read address rows from a file.
pub fn load_addresses(path: &Path) -> Result<Vec<AddressRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read addresses from {}", path.display()))?;
    parse_addresses(&text).with_context(|| format!("Invalid address in {}", path.display()))
}

/// Render a row for output.
pub fn format_row(row: &AddressRow) -> String {
    if row.is_empty() {
        return "null".to_string();
    }
    row.iter()
        .map(|addr| match cidr::decode_ip(addr) {
            Ok(ip) => ip.to_string(),
            Err(_) => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Build a single-channel page holding `rows` as a byte-string block.
pub fn build_page(rows: &[AddressRow], factory: &BlockFactory) -> Result<Page> {
    let mut builder = factory.new_bytes_ref_block_builder(rows.len());
    for row in rows {
        match row.as_slice() {
            [] => {
                builder.append_null();
            }
            [addr] => {
                builder.append_bytes_ref(addr);
            }
            addrs => {
                builder.begin_positions_entry();
                for addr in addrs {
                    builder.append_bytes_ref(addr);
                }
                builder.end_positions_entry();
            }
        }
    }
    let block_ref = builder.build();
    let block: Block = block_ref.block().clone();
    block_ref.release()?;
    Ok(Page::new(vec![block])?)
}

/// Evaluate whether each row matches any of `cidrs`.
///
/// Returns one entry per row: `None` where the row is null or multi-valued.
pub fn run(
    config: &DriverConfig,
    rows: &[AddressRow],
    cidrs: &[String],
) -> Result<Vec<Option<bool>>> {
    if config.batch_size == 0 {
        bail!("Batch size must be positive");
    }
    if config.workers == 0 {
        bail!("Worker count must be positive");
    }

    let literals: Vec<Box<dyn ExpressionEvaluatorFactory>> = cidrs
        .iter()
        .map(|cidr| {
            Box::new(LiteralEvaluatorFactory::new(cidr.clone().into_bytes()))
                as Box<dyn ExpressionEvaluatorFactory>
        })
        .collect();
    let factory = CidrMatchEvaluatorFactory::try_new(
        Box::new(ChannelEvaluatorFactory::new(0)),
        literals,
        cidrs.len(),
    )?;
    debug!("Evaluating {}", factory);

    let source = BlockFactory::new();
    let pages = rows
        .chunks(config.batch_size)
        .map(|chunk| build_page(chunk, &source))
        .collect::<Result<Vec<_>>>()?;

    let worker_count = config.workers.min(pages.len()).max(1);
    let factory = &factory;
    let pages = &pages;
    let mut outputs = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|worker| scope.spawn(move || run_worker(worker, worker_count, factory, pages)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("Driver worker panicked"))?
            })
            .collect::<Result<Vec<_>>>()
    })?
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    outputs.sort_by_key(|(page_index, _)| *page_index);
    let results: Vec<Option<bool>> = outputs.into_iter().flat_map(|(_, values)| values).collect();
    info!(
        "Evaluated {} rows in {} pages with {} workers",
        results.len(),
        pages.len(),
        worker_count
    );
    Ok(results)
}

/// Evaluate every `worker_count`-th page starting at `worker`.
fn run_worker(
    worker: usize,
    worker_count: usize,
    factory: &CidrMatchEvaluatorFactory,
    pages: &[Page],
) -> Result<Vec<(usize, Vec<Option<bool>>)>> {
    let context = DriverContext::new(BlockFactory::new());
    let evaluator = factory.get(&context);
    let mut outputs = Vec::new();
    for (page_index, page) in pages.iter().enumerate().skip(worker).step_by(worker_count) {
        let result = evaluator
            .eval(page)
            .with_context(|| format!("Failed to evaluate page {}", page_index))?;
        let values = result.block().as_boolean()?.to_nullable_vec();
        result.release()?;
        outputs.push((page_index, values));
    }

    let outstanding = context.block_factory().outstanding();
    if outstanding != 0 {
        bail!("Worker {} leaked {} blocks", worker, outstanding);
    }
    debug!("Worker {} evaluated {} pages", worker, outputs.len());
    Ok(outputs)
}
