//! Mesh attribute stream reconstruction and flattening.
//!
//! Turns per-semantic attribute streams and bone influence tables into
//! interleaved, skinned vertices with a synthesized tangent basis, and
//! flattens such vertices back into streams for export.

pub mod container;
pub mod convert;
pub mod error;
pub mod logging;
pub mod project;
pub mod skeleton;

pub use error::{ConvertError, ErrorScope};
pub use logging::{LogLevel, ResultExt, init_logging, send_log};
