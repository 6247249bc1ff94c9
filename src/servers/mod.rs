// Modules for server components
pub mod status;
pub mod websocket;

// Re-export public APIs
pub use status::{StatusConfig, StatusServer};
pub use websocket::{GameSocketConfig, GameSocketServer};
