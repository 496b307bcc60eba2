//! Platform user agents for interactive sign-in

mod loopback;

pub use loopback::{BrowserOpener, LoopbackUserAgent};
