//! Chrome DevTools Protocol backend.
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! ```
//!
//! then connect with [`CdpBrowser::connect`].

mod browser;
mod client;
mod protocol;

pub use browser::CdpBrowser;
pub use client::CdpClient;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
