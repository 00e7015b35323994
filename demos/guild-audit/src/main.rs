//! Guild Audit Example
//!
//! Reads OneBot events as JSON lines from stdin and logs every change to
//! guild channels: creation, deletion, renames, slow-mode changes and
//! message recalls.
//!
//! # Shapes
//!
//! The standard OneBot shapes come from `signet-onebot`. This binary adds
//! one more through `#[shape_provider]`:
//!
//! ```text
//! notice/guild/guild_channel_recall   guild_id, channel_id, operator_id, message_id, user_id
//! ```
//!
//! # Usage
//!
//! ```bash
//! cat events.jsonl | cargo run --package guild-audit -- --mode pool
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use signet::core::{
    DuplicateKeyError, EventDescriptor, EventKey, FieldType, Id, Schema, SchemaRegistryBuilder,
    sync_handler,
};
use signet::onebot::{ChannelInfo, ChannelLifecycleNotice, ChannelUpdatedNotice};
use signet::prelude::*;
use signet::runtime::{ConfigLoader, DispatchMode, InboundSender};
use signet::{FromRecord, shape_provider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Sequential,
    Pool,
}

#[derive(Debug, Parser)]
#[command(about = "Audit guild channel changes from OneBot JSON lines on stdin")]
struct Args {
    /// Configuration file (defaults to signet.toml lookup).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides dispatch.mode.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Overrides dispatch.workers.
    #[arg(long)]
    workers: Option<usize>,
}

// ============================================================================
// Extra shape
// ============================================================================

/// A message recalled in a guild channel.
#[derive(Debug, Clone, FromRecord)]
struct ChannelRecall {
    guild_id: Id,
    channel_id: Id,
    operator_id: Id,
    #[field(rename = "user_id")]
    author_id: Id,
    message_id: Id,
}

#[shape_provider]
fn register_audit_shapes(builder: &mut SchemaRegistryBuilder) -> Result<(), DuplicateKeyError> {
    builder.register(EventDescriptor::new(
        EventKey::notice("guild", "guild_channel_recall"),
        "notice.guild.channel_recall",
        Schema::builder()
            .optional("time", FieldType::Int)
            .optional("self_id", FieldType::Id)
            .required("guild_id", FieldType::Id)
            .required("channel_id", FieldType::Id)
            .required("operator_id", FieldType::Id)
            .required("message_id", FieldType::Id)
            .optional("user_id", FieldType::Id)
            .build(),
    ))?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

fn slow_mode_text(info: &ChannelInfo) -> &str {
    info.slow_modes
        .iter()
        .find(|mode| mode.slow_mode_key == info.current_slow_mode)
        .map(|mode| mode.slow_mode_text.as_str())
        .unwrap_or("unknown")
}

fn on_channel_updated(ctx: &EventContext) -> HandlerResult {
    let notice: ChannelUpdatedNotice = ctx.view()?;
    let (old, new) = (&notice.old_info, &notice.new_info);

    if notice.renamed() {
        info!(
            guild = %notice.guild_id,
            channel = %notice.channel_id,
            operator = %notice.operator_id,
            from = %old.channel_name,
            to = %new.channel_name,
            "Channel renamed"
        );
    }
    if old.current_slow_mode != new.current_slow_mode {
        info!(
            guild = %notice.guild_id,
            channel = %notice.channel_id,
            operator = %notice.operator_id,
            from = slow_mode_text(old),
            to = slow_mode_text(new),
            "Slow mode changed"
        );
    }
    if old.talk_permission != new.talk_permission || old.visible_type != new.visible_type {
        info!(
            guild = %notice.guild_id,
            channel = %notice.channel_id,
            operator = %notice.operator_id,
            "Channel permissions changed"
        );
    }
    Ok(())
}

fn on_channel_lifecycle(ctx: &EventContext) -> HandlerResult {
    let notice: ChannelLifecycleNotice = ctx.view()?;
    let action = match ctx.key().detail_type() {
        "channel_created" => "created",
        _ => "destroyed",
    };
    info!(
        guild = %notice.guild_id,
        channel = %notice.channel_id,
        operator = %notice.operator_id,
        name = %notice.channel_info.channel_name,
        "Channel {action}"
    );
    Ok(())
}

fn on_channel_recall(ctx: &EventContext) -> HandlerResult {
    let recall: ChannelRecall = ctx.view()?;
    info!(
        guild = %recall.guild_id,
        channel = %recall.channel_id,
        operator = %recall.operator_id,
        author = %recall.author_id,
        message = %recall.message_id,
        "Message recalled"
    );
    Ok(())
}

// ============================================================================
// Input
// ============================================================================

/// Forwards stdin lines until EOF, then asks the runtime to stop.
async fn read_stdin(inbound: InboundSender, runtime: Arc<SignetRuntime>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                if inbound.send(line).await.is_err() {
                    warn!("Runtime stopped before stdin was exhausted");
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
    runtime.shutdown();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigLoader::new();
    if let Some(path) = &args.config {
        config = config.file(path);
    }
    let mut config = config.load()?;
    if let Some(mode) = args.mode {
        config.dispatch.mode = match mode {
            Mode::Sequential => DispatchMode::Sequential,
            Mode::Pool => DispatchMode::Pool,
        };
    }
    if let Some(workers) = args.workers {
        config.dispatch.workers = workers;
    }
    let runtime = Arc::new(SignetRuntime::builder().onebot().config(config).build()?);

    let handlers = runtime.handlers();
    handlers.subscribe(
        EventKey::notice("guild", "channel_updated"),
        sync_handler(on_channel_updated),
    );
    handlers.subscribe(
        EventKey::notice("guild", "channel_created"),
        sync_handler(on_channel_lifecycle),
    );
    handlers.subscribe(
        EventKey::notice("guild", "channel_destroyed"),
        sync_handler(on_channel_lifecycle),
    );
    handlers.subscribe(
        EventKey::notice("guild", "guild_channel_recall"),
        sync_handler(on_channel_recall),
    );

    let guild_events = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&guild_events);
    handlers.subscribe(
        Topic::Any,
        sync_handler(move |ctx| {
            if ctx.key().sub_type() == "guild" {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }),
    );

    tokio::spawn(read_stdin(runtime.inbound(), Arc::clone(&runtime)));
    runtime.run().await?;

    let stats = runtime.stats();
    info!(
        received = stats.received,
        dispatched = stats.dispatched,
        guild_events = guild_events.load(Ordering::Relaxed),
        malformed = stats.errors.malformed_envelope,
        unknown = stats.errors.unknown_shape,
        decode_failures = stats.errors.decode,
        handler_failures = stats.errors.handler,
        "Audit finished"
    );
    Ok(())
}
