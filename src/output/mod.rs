//! Output module: local destinations for sanitized documents
//! Created: 2025-06-03 16:18:02 UTC
//! Author: kartik4091

pub mod local_sink;

pub use local_sink::LocalSink;
