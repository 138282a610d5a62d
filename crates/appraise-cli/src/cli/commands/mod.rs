//! Command implementations.

pub mod comments;
pub mod helpers;
pub mod reports;
pub mod reviews;
pub mod submit;
pub mod sync;

pub use comments::{run_accept, run_comment, run_reject};
pub use reports::{run_analysis, run_ci_status};
pub use reviews::{run_list, run_request, run_show};
pub use submit::run_submit;
pub use sync::{run_pull, run_push};
