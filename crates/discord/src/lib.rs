//! Discord interaction surface for CuraBot.
//!
//! - **Events** (`events`) - decode interaction webhooks into typed events
//! - **Commands** (`commands`) - the `summarize` schema, option parsing, button and form ids
//! - **Verification** (`verify`) - Ed25519 request signatures
//! - **Components** (`components`) - embeds, buttons, the edit form and response envelopes
//! - **Platform** (`platform`) - follow-up, edit-original and command registration calls
//! - **Summarize** (`summarize`) - fetch, analyze, store and render one article
//! - **Dispatcher** (`dispatcher`) - initial responses plus the deferred follow-up work
//!
//! # Flow
//!
//! ```text
//! POST /interactions → verify → InteractionEvent → InteractionDispatcher
//!                                                   ↓            ↓
//!                                      initial response    DeferredTask → PlatformClient
//! ```

pub mod commands;
pub mod components;
pub mod dispatcher;
pub mod events;
pub mod platform;
pub mod summarize;
pub mod verify;

pub use dispatcher::{DeferredTask, DispatchError, DispatchOutcome, InteractionDispatcher};
pub use events::{EventContext, InteractionEvent};
pub use platform::{DiscordRestClient, PlatformClient, PlatformError};
pub use summarize::{PipelineError, SummarizePipeline};
pub use verify::{InteractionVerifier, VerifyError};
