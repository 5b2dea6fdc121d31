//! The streaming pipeline.
//!
//! One task per subscribed track normalizes, gates, windows, and transcribes
//! audio; a single emitter task owns the session state and the outbound
//! surfaces. Stations talk over tokio mpsc channels.

pub mod emitter;
pub mod frame;
pub mod pipeline;
pub mod window;
