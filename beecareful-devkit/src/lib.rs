/*!
# BeeCareful DevKit

Test tooling shared by the BeeCareful crates:
- in-process mock of the REST backend
- JSON fixtures and push payload builder
- harness with logging and scratch directories
*/

pub mod fixtures;
pub mod mock_backend;
pub mod test_utils;

pub use fixtures::PushBuilder;
pub use mock_backend::{MockBackend, RecordedRequest};
pub use test_utils::{init_logging, wait_until, TestHarness};
