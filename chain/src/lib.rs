//! Segment Chain - an unbounded append-only log over capacity-bounded segments.
//!
//! Many storage backends offer append targets that refuse writes after a
//! fixed number of appends. A [`SegmentChain`] hides that limit: callers see
//! one logical stream while the chain splits it across segments named
//! `<stream>.0`, `<stream>.1`, ... and rolls over to the next one when the
//! store refuses an append.
//!
//! # Architecture
//!
//! Writers never talk to each other. Every chain instance, whether in the same
//! process or another one, coordinates only through the store's conditional
//! create: when a segment fills up, all writers that notice race to create the
//! next one, exactly one succeeds, and the rest treat "already exists" as
//! success. Within a process, a shared cursor remembers the newest segment
//! seen so far so appends do not start from segment 0 each time.
//!
//! # Key Concepts
//!
//! - **SegmentChain**: the entry point, providing appends and aggregate reads.
//! - **Segments**: numbered from 0 with no gaps. The logical stream is their
//!   concatenation in suffix order.
//! - **AppendResult**: the `(suffix, offset)` where a payload landed. Unique
//!   across the chain's lifetime. Payloads appended concurrently near a
//!   rollover have no defined order across segments.
//!
//! # Example
//!
//! ```ignore
//! use chain::{Config, SegmentChain};
//!
//! let chain = SegmentChain::open(Config::default()).await?;
//! let result = chain.append_str("order-123").await?;
//! println!("segment={} offset={}", result.suffix, result.offset);
//!
//! let bytes = chain.total_size().await?;
//! let appends = chain.total_committed_count().await?;
//! ```

mod chain;
mod config;
mod cursor;
mod encoding;
mod error;
mod model;
mod segment;

pub use chain::SegmentChain;
pub use config::{AppendOptions, Config, RetryConfig, load_config};
pub use encoding::TextEncoding;
pub use error::{Error, Result};
pub use model::{AppendResult, SegmentInfo, SegmentSuffix};
