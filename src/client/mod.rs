//! HTTP client for the Amana API, used by frontend tooling and the
//! end-to-end test suite.

pub mod http;
pub mod loans;
pub mod retry;
pub mod session;

pub use http::{ApiClient, ApiError, Pagination};
pub use loans::{LoanApi, LoanListQuery};
pub use retry::{execute_with_deadline, execute_with_retry, RetryPolicy};
pub use session::{MemorySession, TokenProvider};
