mod auth_service_fake;
mod auth_service_impl;
mod token_codec_impl;
mod user_service_impl;

pub use auth_service_fake::*;
pub use auth_service_impl::*;
pub use token_codec_impl::*;
pub use user_service_impl::*;
