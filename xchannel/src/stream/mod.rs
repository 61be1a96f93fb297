//! Object streams layered over a byte stream.
//!
//! Each direction has its own stream. The writer opens its direction with
//! a stream header; the reader blocks until that header arrives. Peers must
//! therefore construct their writer before their reader, or both sides wait
//! for a header neither has sent.

mod reader;
mod writer;

pub use reader::{ObjectReader, ReadOutcome};
pub use writer::ObjectWriter;
