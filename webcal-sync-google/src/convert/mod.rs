mod from_google;
mod to_google;

pub use from_google::FromGoogle;
pub use to_google::{insert_body, patch_body};
