//! Internal message types and channel infrastructure.
//!
//! This module provides the command and frame types exchanged between the
//! tasks of the pipeline, plus the channel factories that wire them up.
//!
//! # Message flow
//!
//! 1. The server boundary sends `PipelineCommand` -> `DonationPipeline`
//! 2. `DonationPipeline` (and the session machine inside it) emits
//!    `HubCommand::Publish` -> `BroadcastHub`
//! 3. `BroadcastHub` fans `OutboundFrame`s out to one channel per
//!    subscriber; the WebSocket task forwards them onto the wire.
//!
//! All channels are bounded; a receiver that stops draining is treated as
//! dead rather than awaited.

pub mod channels;
pub mod types;

pub use channels::{
    frame_channel, hub_command_channel, pipeline_command_channel, FrameReceiver, FrameSender,
    HubCommandReceiver, HubCommandSender, PipelineCommandReceiver, PipelineCommandSender,
    DEFAULT_CHANNEL_BUFFER, FRAME_BUFFER,
};

pub use types::{
    ControlAction, HubCommand, OutboundFrame, PipelineCommand, PipelineStats, SubmitOutcome,
};
