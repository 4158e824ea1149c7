//! Certificates: parsing, encrypted delivery and caching.

mod cache;
mod payload;
mod record;

pub use cache::CertificateCache;
pub use payload::{EncryptedCertificatePayload, PlatformCertificateEntry, PlatformCertificateList};
pub use record::CertificateRecord;
