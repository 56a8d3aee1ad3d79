pub mod base;
pub mod mcp;

#[cfg(test)]
pub mod mock;
