//! Core SMTP types.

mod features;
mod reply;

pub use features::EsmtpFeatures;
pub use reply::{Reply, ReplyCode};
