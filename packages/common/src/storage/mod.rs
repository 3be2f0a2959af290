mod error;
mod hash;
mod layout;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::TierError;
pub use hash::ContentHash;
pub use layout::{fanout_digest, local_path_for, validate_name};
pub use traits::{Disposition, NameLookup, PutReceipt, Tier, UrlOptions};
