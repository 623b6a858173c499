//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points of the race engine. Adapters implement
//! the outbound ports to plug in storage, rate feeds, the chain and the
//! socket layer; the coordinator implements the inbound port.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  (coordinator, jobs)    │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     │                   │             │                     │
//!     ▼                   ▼             ▼                     ▼
//! ┌─────────┐       ┌──────────┐  ┌──────────┐         ┌───────────┐
//! │  Store  │       │  Rates   │  │  Chain   │         │ EventSink │
//! │ Adapter │       │ Adapter  │  │ Adapter  │         │  Adapter  │
//! └─────────┘       └──────────┘  └──────────┘         └───────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::race::{AssetInput, RaceApi};
pub use outbound::chain::{ChainClient, RaceCall, TransactionRequest, TxHash};
pub use outbound::clock::Clock;
pub use outbound::rates::RateCache;
pub use outbound::store::{PortfolioStore, SaveOutcome, TrackStore, UserDirectory};
pub use outbound::transport::{EventSink, JoinedTrack, PlayerPosition, RaceEvent, RaceInit};
