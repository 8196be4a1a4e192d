// jsonPTS protocol modules
//
// Wire types plus the typed client, one method per controller capability.

pub mod client;
pub mod product;
pub mod wire;

pub use client::PtsClient;
pub use product::Product;
