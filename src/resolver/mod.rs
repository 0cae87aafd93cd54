pub mod classifier;
pub mod errors;
pub mod pipeline;
pub mod scanner;
pub mod service;
pub mod transport;
pub mod types;

pub use classifier::classify;
pub use errors::{RetrievalError, RetrievalErrorKind, TransportError};
pub use scanner::scan;
pub use service::{MetadataRetriever, UrlResolver};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    ContentKind, MimeType, PageResponse, ProbeResponse, ResolvedMetadata, ScanResult,
};
