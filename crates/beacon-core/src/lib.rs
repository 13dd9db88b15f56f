//! # Beacon Core
//!
//! Endpoint selection, probing, caching and fallback engine for EVM
//! JSON-RPC traffic.
//!
//! Given a chain id and a JSON-RPC call, the gateway picks the best
//! upstream from a curated whitelist and fails over through the rest:
//!
//! - **[`whitelist`]**: read-only `chain id -> [URL]` mapping, filtered to
//!   resolved HTTPS entries at load time.
//!
//! - **[`probe`]**: concurrent liveness/capability probing. Each endpoint
//!   answers `eth_getCode` for the Permit2 witness contract and
//!   `eth_syncing`; the pair classifies it into a usable tier or a hard
//!   failure.
//!
//! - **[`cache`]**: durable per-chain selection cache (whole-document JSON
//!   under one key of a pluggable KV store) with TTL freshness.
//!
//! - **[`selector`]**: ranked endpoint lists with single-flight probe
//!   coordination per chain.
//!
//! - **[`dispatch`]**: round-robin starting offset and sequential failover
//!   through the ranked list, one attempt per endpoint per call.
//!
//! - **[`gateway`]**: the [`gateway::RpcGateway`] facade tying the above
//!   together behind `send` / `ranked_list`.
//!
//! ## Request flow
//!
//! ```text
//! send(chain, method, params)
//!       │
//!       ▼
//! ┌──────────────┐   fresh & usable    ┌─────────────────┐
//! │ SelectionCache│ ──────────────────► │  ranked list    │
//! └──────┬───────┘                      └────────┬────────┘
//!        │ stale / invalidated                   │
//!        ▼                                       ▼
//! ┌──────────────┐    single-flight     ┌─────────────────┐
//! │    Prober    │ ◄─────────────────── │   Dispatcher    │
//! │ getCode +    │   (one round per     │ round-robin +   │
//! │ eth_syncing  │    cold chain)       │ failover loop   │
//! └──────────────┘                      └─────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod gateway;
pub mod probe;
pub mod rpc_http;
pub mod selector;
pub mod types;
pub mod whitelist;

pub use errors::GatewayError;
pub use gateway::{RpcGateway, RpcGatewayBuilder};
