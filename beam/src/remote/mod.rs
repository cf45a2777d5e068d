//! Remote host access

pub mod console;
pub mod session;
pub mod ssh;
pub mod transport;

pub use console::ConsoleObserver;
pub use session::{ExecOptions, Session};
pub use ssh::{SshConnector, SshOptions};
pub use transport::{Connector, OutputObserver, RemoteOutput, Transport};
