// forecourt-pts: Async Rust client for PTS-2 pump controllers (jsonPTS over HTTP Digest)

pub mod digest;
pub mod error;
pub mod pts;
pub mod transport;

pub use digest::{DigestAlgorithm, DigestChallenge, DigestCredential, DigestSession};
pub use error::Error;
pub use pts::client::{AuthorizeKind, PtsClient};
pub use pts::product::Product;
pub use transport::{ControllerEndpoint, ControllerTransport, EndpointGates, Scheme, TransportConfig};
