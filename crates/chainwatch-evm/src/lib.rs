//! chainwatch-evm: EVM log fetcher, event decoder and poll loop.
//!
//! ## Implementation notes
//! - topics[0] → keccak256 of the event signature, computed once at startup
//! - topics[1] → indexed `tokenId` (uint256, 32 bytes)
//! - `data` → non-indexed `(uint8 r, uint8 g, uint8 b)` as an ABI-encoded tuple

pub mod builder;
pub mod decoder;
pub mod fetcher;
pub mod poller;
pub mod topic;

pub use builder::PollerBuilder;
pub use decoder::decode_color_changed;
pub use fetcher::{EvmFetcher, EvmRpcClient, JsonRpcEvmClient};
pub use poller::{EventPoller, PollReport};
pub use topic::{keccak256_signature, Topic};
