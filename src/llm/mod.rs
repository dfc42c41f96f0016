pub mod chat;

use bytes::Bytes;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Raw response body as it comes off the wire, one network read per item.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;
