// Library lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

pub use crate::parser::{ProtocolParser, dissect};

pub mod frame;
pub mod layer;
pub mod parser;
pub mod protocols;
