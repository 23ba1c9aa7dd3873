//! Half-duplex LoRa radio controller in Rust
//!
//! This crate manages a single LoRa transceiver shared between transmit and
//! receive duties on a device with no operating system scheduler. The
//! transceiver performs one physical operation at a time; completion is
//! signalled by a hardware interrupt raising a one-bit flag, and the
//! application drives the controller from a cooperative polling loop.
//!
//! # Features
//! - Non-blocking transmit/receive state machine with a single completion flag
//! - Fail-fast configuration validation with per-parameter diagnostics
//! - Closed-loop frequency correction from measured receiver drift
//! - Hardware abstraction layer for radio drivers
//! - No unsafe code
//!
//! # Example
//! ```ignore
//! use lora_radio::{
//!     config::radio::RadioConfig,
//!     controller::RadioController,
//!     flag::ActionFlag,
//!     sink::NullSink,
//! };
//!
//! // The flag lives in a static so the interrupt routine can reach it.
//! static ACTION_DONE: ActionFlag = ActionFlag::new();
//!
//! // Radio driver construction omitted (any `radio::traits::Radio` impl).
//! # let radio = ();
//! # let mut controller = RadioController::new(radio, &ACTION_DONE, NullSink);
//!
//! let config = RadioConfig::new(434.5, 0xF4);
//! if controller.begin(config) {
//!     // Poll from the main loop; the interrupt handler calls
//!     // ACTION_DONE.signal() when the hardware finishes an operation.
//!     loop {
//!         if controller.receive_bytes() {
//!             let packet = controller.received_data();
//!             // copy packet.payload before the next call overwrites it
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![no_std]

/// Radio session configuration
pub mod config;

/// The main transmit/receive controller
pub mod controller;

/// Interrupt-to-poll completion flag
pub mod flag;

/// Radio hardware abstraction layer
pub mod radio;

/// Human-readable diagnostics sink
pub mod sink;
