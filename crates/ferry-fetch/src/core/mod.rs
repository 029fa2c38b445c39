//! Pure transformations: request planning, templating, backoff.
//!
//! Nothing in here performs I/O.

mod plan;
mod retry;
mod template;

pub use plan::{Auth, OBJECT_TOKEN_HEADER, Target, plan};
pub use retry::retry_delay;
pub use template::render;
