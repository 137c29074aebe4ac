//! Channel factories and handles.
//!
//! Provides factory functions for creating the internal channels with
//! appropriate buffer sizes.

use tokio::sync::mpsc;

use super::types::{HubCommand, OutboundFrame, PipelineCommand};

/// Default buffer size for command channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Buffer size for per-subscriber frame channels. A subscriber that falls
/// this far behind is treated as dead, not awaited.
pub const FRAME_BUFFER: usize = 64;

/// Sender handle for pipeline commands.
pub type PipelineCommandSender = mpsc::Sender<PipelineCommand>;
/// Receiver handle for pipeline commands.
pub type PipelineCommandReceiver = mpsc::Receiver<PipelineCommand>;

/// Sender handle for hub commands.
pub type HubCommandSender = mpsc::Sender<HubCommand>;
/// Receiver handle for hub commands.
pub type HubCommandReceiver = mpsc::Receiver<HubCommand>;

/// Sender handle for one subscriber's outbound frames.
pub type FrameSender = mpsc::Sender<OutboundFrame>;
/// Receiver handle for one subscriber's outbound frames.
pub type FrameReceiver = mpsc::Receiver<OutboundFrame>;

/// Create the pipeline command channel.
pub fn pipeline_command_channel() -> (PipelineCommandSender, PipelineCommandReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create the hub command channel.
pub fn hub_command_channel() -> (HubCommandSender, HubCommandReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a frame channel for a single subscriber.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    mpsc::channel(FRAME_BUFFER)
}
