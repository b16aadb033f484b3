//! Convenience re-exports for pipeline consumers.

pub use crate::builder::{Adapter, Builder, Callbacks, NoCallbacks};
pub use crate::codec::{Codec, RleCodec};
pub use crate::collector::Collector;
pub use crate::error::{Error, Result};
pub use crate::feed::{Feed, Frame};
pub use crate::fragment::Fragment;
pub use crate::imageio::FileFeed;
pub use crate::palette::Nat;
pub use crate::scratch::FramePool;
pub use crate::types::{Dimensions, Rect};
