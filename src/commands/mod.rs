// Command handlers module
pub mod config;
pub mod print;
pub mod serve;

// Re-exports for cleaner imports
pub use print::execute as print;
pub use serve::execute as serve;
