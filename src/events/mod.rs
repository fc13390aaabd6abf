//! # Events Module
//!
//! Progress reporting for discovery, metadata gathering and placement.
//!
//! The core never draws progress bars itself. It emits [`Event`]s through an
//! [`EventSender`] and any front end (the CLI, a test) consumes them.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Transfer(TransferEvent::Progress(p)) = event {
//!             println!("{} {}/{}", p.phase, p.completed, p.total);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&roots, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
