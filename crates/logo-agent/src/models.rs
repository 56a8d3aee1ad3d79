//! These models represent the objects passed between the agent platform and the tool providers
//!
//! There are a few related formats we need to interact with:
//! - azure agent messages and function definitions, exchanged with the agent platform
//! - mcp tool definitions and call results, exchanged with the tool providers
//!
//! We always immediately convert those wire formats into the internal structs, so the rest of
//! the crate never sees either protocol directly.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
