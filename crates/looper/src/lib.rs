//! Beat loop controller.
//!
//! Pins a hosted media element's playback to a user-chosen region and keeps
//! that region alive across host re-renders, in-page navigation and reloads.
//!
//! Architecture:
//!
//! ```text
//! Host (page / desktop harness)          LoopController (lifecycle)
//! ┌────────────────────────┐   events   ┌──────────────────────────────┐
//! │ timers, media events,  │──────────► │ reconcile / heartbeat timers │
//! │ navigation, keys,      │            │ MediaResolver                │
//! │ panel inputs           │ ◄──────────│ LoopSession (per video)      │
//! │                        │  seek/play │  ├─ LoopRegion               │
//! │ panel surface          │  render    │  ├─ EnforcementEngine        │
//! └────────────────────────┘            │  └─ PanelController          │
//!                                       │ LoopStore (KeyValueStore)    │
//!                                       └──────────────────────────────┘
//! ```
//!
//! Everything runs on the host's single logical thread. The host owns the
//! media element, the timers and the panel widgets; this crate only ever
//! refers to them through the ids issued by [`host::HostPage`].

pub mod clock;
pub mod config;
pub mod correction;
pub mod enforcement;
pub mod error;
pub mod host;
pub mod layout;
pub mod lifecycle;
pub mod location;
pub mod panel;
pub mod region;
pub mod resolver;
pub mod session;
pub mod store;
pub mod timefmt;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{LoopConfig, Preset};
pub use correction::{correct, Correction, Tolerances};
pub use enforcement::{EnforcementEngine, Trigger, TriggerOutcome};
pub use error::{ConfigError, StorageError, TimeParseError};
pub use host::{
    HostEvent, HostPage, KeyPress, ListenerId, MediaElement, MediaEventKind, MediaHandle, TimerId,
};
pub use layout::{inject, insertion_index, InjectedRole, SlotItem};
pub use lifecycle::LoopController;
pub use location::PageLocation;
pub use panel::{KeyCommand, Nudge, PanelController, PanelInput, PanelView};
pub use region::LoopRegion;
pub use resolver::MediaResolver;
pub use session::LoopSession;
pub use store::{FileStore, KeyValueStore, LoopStore, MemoryStore, PersistedLoopState};
pub use timefmt::{format_time, parse_time_input};
