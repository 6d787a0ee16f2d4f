pub mod operation;
pub mod service;

pub use operation::QuoteOperations;
pub use service::QuoteProxyService;
