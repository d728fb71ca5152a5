//! Batch execution
//!
//! [`route_batch`] is the synchronous core: it resolves the batch-wide
//! configuration once, dispatches every record in input order and applies
//! the host's failure policy. [`SwitchNode`] exposes the same operation
//! through the async [`NodeExecutor`] trait.

use crate::channel::{Channel, Channels, Record};
use crate::config::RoutingConfig;
use crate::host::ParameterHost;
use crate::router::{Dispatcher, Placement};
use crate::{Result, SwitchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tooling::logging::{LogGuard, LogLevel};
use uuid::Uuid;

/// Counts describing one routed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Identifier of this run, for correlating log lines
    pub execution_id: Uuid,
    /// Input records
    pub items: usize,
    /// Appends across all channels; a record matched twice counts twice
    pub placements: usize,
    /// Records that landed in no channel
    pub dropped: usize,
    /// Records replaced by a diagnostic
    pub failed: usize,
    /// Records per channel, diagnostics included
    pub per_channel: Vec<usize>,
}

/// Output of a batch together with its summary
#[derive(Debug, Clone)]
pub struct RoutedBatch {
    pub config: RoutingConfig,
    pub channels: Vec<Channel>,
    pub summary: BatchSummary,
}

impl RoutedBatch {
    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }
}

/// Route a batch of records
///
/// With continue-on-failure off, the first failing record aborts the batch
/// with [`SwitchError::ItemFailed`]. With it on, the failing record is
/// replaced by a diagnostic on channel 0 and the batch continues.
pub fn route_batch(items: &[Record], host: &dyn ParameterHost) -> Result<RoutedBatch> {
    run_batch(items, host, LogLevel::Debug)
}

fn run_batch(items: &[Record], host: &dyn ParameterHost, level: LogLevel) -> Result<RoutedBatch> {
    let config = RoutingConfig::resolve(host)?;
    let execution_id = Uuid::new_v4();
    let _guard = LogGuard::with_level(format!("route_batch {}", execution_id), level);

    tracing::debug!(
        "Routing {} items through '{}' ({:?} mode, {} channels)",
        items.len(),
        config.node_name(),
        config.mode(),
        config.channel_count()
    );

    let dispatcher = Dispatcher::new(&config, host);
    let mut channels = Channels::allocate(config.labels());
    let mut dropped = 0;
    let mut failed = 0;

    for (item_index, record) in items.iter().enumerate() {
        match dispatcher.dispatch(record, item_index, &mut channels) {
            Ok(Placement::Dropped) => dropped += 1,
            Ok(Placement::Routed(_)) => {}
            Err(e) if config.continue_on_fail() => {
                tracing::warn!(
                    "Node '{}' failed on item {}, continuing: {}",
                    config.node_name(),
                    item_index,
                    e
                );
                channels.push_diagnostic(e.to_string(), item_index);
                failed += 1;
            }
            Err(e) => {
                return Err(SwitchError::ItemFailed {
                    node: config.node_name().to_string(),
                    item_index,
                    source: Box::new(e),
                });
            }
        }
    }

    let summary = BatchSummary {
        execution_id,
        items: items.len(),
        placements: channels.total() - failed,
        dropped,
        failed,
        per_channel: channels.sizes(),
    };

    tracing::debug!(
        "Batch {} done: {} placements, {} dropped, {} failed",
        execution_id,
        summary.placements,
        summary.dropped,
        summary.failed
    );

    Ok(RoutedBatch {
        config,
        channels: channels.into_vec(),
        summary,
    })
}

/// Trait for nodes that turn an input batch into output channels
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute the node over a batch
    async fn execute(&self, items: Vec<Record>, host: &dyn ParameterHost) -> Result<Vec<Channel>>;
}

/// The dynamic switch node
#[derive(Debug, Clone, Copy)]
pub struct SwitchNode {
    log_level: LogLevel,
}

impl SwitchNode {
    pub fn new() -> Self {
        Self {
            log_level: LogLevel::Debug,
        }
    }

    /// Level at which batch entry and exit are logged
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Route a batch, keeping the summary
    pub fn route(&self, items: &[Record], host: &dyn ParameterHost) -> Result<RoutedBatch> {
        run_batch(items, host, self.log_level)
    }
}

impl Default for SwitchNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for SwitchNode {
    async fn execute(&self, items: Vec<Record>, host: &dyn ParameterHost) -> Result<Vec<Channel>> {
        self.route(&items, host).map(RoutedBatch::into_channels)
    }
}
