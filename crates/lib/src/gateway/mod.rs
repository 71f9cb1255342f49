//! Gateway: HTTP webhook surface.
//!
//! `GET /` and `GET /test` are static probes. `POST /callback` verifies the LINE signature,
//! acknowledges immediately, and runs one pipeline task per image message.

mod server;

pub use server::{receive_callback, router, run_gateway, CallbackError, GatewayState};
