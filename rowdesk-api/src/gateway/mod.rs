//! Gateway implementations provided by the server.

mod demo;
mod rest;

pub use demo::demo_gateway;
pub use rest::RestGateway;
