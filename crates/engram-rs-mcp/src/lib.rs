//! Client for an MCP tool server spoken to over a subprocess's stdio.
//!
//! The session is opened once per interactive run, reused across turns, and
//! shut down when the loop exits. There is no reconnect: a transport failure
//! is fatal to the session.

mod adaptor;
mod codec;
mod error;
mod session;

pub use adaptor::{remote_tools, McpTool};
pub use error::McpError;
pub use session::{DiscoveredTool, McpSession};
