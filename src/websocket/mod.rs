//! WebSocket Real-Time Streaming
//!
//! Fans every sampled dashboard update out to all connected browsers.
//!
//! ## Architecture
//!
//! - **Hub**: owns the live subscriber set and offers each update to every
//!   subscriber's bounded queue without blocking the publisher
//! - **Handler**: upgrades `/ws` requests and drains one subscription onto
//!   one connection, with a deadline on every write
//! - **Messages**: the opaque [`Update`] payload and its wire framing
//!
//! ## Usage
//!
//! Clients connect to `/ws` and only listen; every update is an HTML fragment
//! made of `hx-swap-oob` blocks that the dashboard page swaps in place.
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8000/ws');
//!
//! ws.onmessage = (event) => {
//!   console.log('Update:', event.data);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::{serve, websocket_handler, CloseReason};
pub use hub::{Hub, HubConfig, HubStats, PublishReport, Subscriber, SubscriberId, Subscription};
pub use messages::Update;
