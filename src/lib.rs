pub mod adapter;
pub mod convert;
pub mod errors;
pub mod request_builder;
pub mod response;
pub mod session;
pub mod types;

#[cfg(feature = "merchant-validation")]
pub mod validation;
