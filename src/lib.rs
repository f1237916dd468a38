//! # cmp-client — Certificate Management Protocol client engine
//!
//! An embeddable client for the Certificate Management Protocol (RFC 4210)
//! and Certificate Request Message Format (RFC 4211): it builds, protects,
//! sends, and interprets CMP exchanges for certificate enrollment, key
//! update, and revocation, including PBMAC1 and signature-based message
//! protection and X.509 chain validation of issued certificates.
//!
//! ## Architecture
//!
//! - [`message`]: PKIMessage/PKIHeader/PKIBody types and the ASN.1 codec boundary
//! - [`protection`]: PBMAC1 and signature-based message protection
//! - [`trust`]: certificate chain validation and revocation dispatch
//! - [`transaction`]: the request/response/poll/confirm state machine
//! - [`request`]: assembling `CertReqMessage`/`RevDetails`/`GenMsg` content
//! - [`response`]: classifying a response into a caller-facing [`response::Outcome`]
//! - [`transport`]: pluggable request/response carriers (HTTP, file replay, mock)
//! - [`context`]: per-transaction configuration, credentials, and callbacks

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod protection;
pub mod request;
pub mod response;
pub mod traits;
pub mod transaction;
pub mod transport;
pub mod trust;
pub mod types;

pub use error::{CmpError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::{CmpContext, ContextOptions};
    pub use crate::error::{CmpError, Result};
    pub use crate::request::RequestBuilder;
    pub use crate::response::Outcome;
    pub use crate::traits::{CertConfCallback, MessageCodec, RevocationSource, Transport};
    pub use crate::transaction::TransactionRunner;
    pub use crate::types::*;
}
