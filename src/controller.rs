//! Half-duplex transmit/receive controller
//!
//! This module provides the main polling-loop interface to the shared
//! transceiver. It owns the session configuration, the live runtime state,
//! the most recent reception, and the completion flag handshake with the
//! interrupt handler.
//!
//! The controller is built for a single application thread: every call is
//! non-blocking, and the only concurrency it tolerates is the interrupt
//! handler signalling the completion flag at any instruction boundary.
//! Calling into the controller from interrupt context or from a second
//! thread is outside its contract.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::config::radio::RadioConfig;
use crate::flag::ActionFlag;
use crate::radio::traits::{Radio, RadioError, Status};
use crate::sink::NotificationSink;

/// Largest payload a LoRa packet can carry; bound of the receive record.
pub const MAX_PACKET_LEN: usize = 255;

// Scratch space for one formatted sink message
const MSG_CAPACITY: usize = 96;

/// Hardware action most recently initiated, not necessarily completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Idle between operations
    Standby,
    /// A send is in flight
    Transmit,
    /// Listening has been armed
    Receive,
}

/// Live controller state, readable by the application between polls.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeState {
    /// Operating frequency in MHz; drifts from the configured value when
    /// frequency correction is enabled
    pub frequency: f64,
    /// Status recorded from the most recent radio command
    pub last_status: Status,
    /// Most recently initiated hardware action
    pub last_action: Action,
}

/// Most recent reception.
///
/// Overwritten on every harvest; callers must copy the payload out before
/// the next `receive_bytes` call.
#[derive(Debug, Clone, Default)]
pub struct ReceivedData {
    /// Raw payload bytes
    pub payload: Vec<u8, MAX_PACKET_LEN>,
    /// Signal strength in dBm
    pub rssi: f32,
    /// Signal-to-noise ratio in dB
    pub snr: f32,
    /// Operating frequency in MHz at the time of reception
    pub frequency: f64,
}

/// Controller for one half-duplex radio shared between transmit and
/// receive duties.
///
/// Drive it from a polling loop: `begin` once, then `transmit_bytes` /
/// `receive_bytes` as often as the application likes. Neither call blocks;
/// completion of the underlying hardware operation arrives through the
/// [`ActionFlag`] the interrupt handler signals.
pub struct RadioController<R: Radio, S: NotificationSink> {
    radio: R,
    sink: S,
    config: RadioConfig,
    runtime: RuntimeState,
    flag: &'static ActionFlag,
    received: ReceivedData,
    initialized: bool,
}

impl<R: Radio, S: NotificationSink> RadioController<R, S> {
    /// Create a controller around a radio capability.
    ///
    /// `flag` must be the same flag the application's interrupt routine
    /// signals; nothing works until [`begin`](Self::begin) succeeds.
    pub fn new(radio: R, flag: &'static ActionFlag, sink: S) -> Self {
        Self {
            radio,
            sink,
            config: RadioConfig::default(),
            runtime: RuntimeState {
                frequency: 0.0,
                last_status: Ok(()),
                last_action: Action::Standby,
            },
            flag,
            received: ReceivedData::default(),
            initialized: false,
        }
    }

    /// Initialize the radio and apply `config`.
    ///
    /// Returns false, without marking the controller initialized, if chip
    /// initialization or any configuration step fails. Calling `begin`
    /// again re-applies the full configuration; it must not race any other
    /// operation (the completion flag only guards transmit/receive).
    pub fn begin(&mut self, config: RadioConfig) -> bool {
        self.initialized = false;
        self.config = config;
        self.runtime.frequency = config.frequency;

        self.runtime.last_status = self.radio.init();
        if let Err(code) = self.runtime.last_status {
            self.report_error(format_args!(
                "Initialization failed with status {:?}",
                code
            ));
            return false;
        }

        // Completion interrupts land on the shared flag from here on
        if let Err(code) = self.radio.bind_completion(self.flag) {
            self.runtime.last_status = Err(code);
            self.report_error(format_args!(
                "Binding the completion interrupt failed with status {:?}",
                code
            ));
            return false;
        }
        self.runtime.last_action = Action::Standby;

        if !self.configure() {
            self.sink.error("Configuration failed");
            return false;
        }
        self.sink.info("Configured");

        self.initialized = true;
        self.sink.info("Initialized");

        true
    }

    /// Re-apply a full configuration at runtime.
    ///
    /// Follows the same fail-fast chain as `begin`; the tracked operating
    /// frequency restarts from the new nominal value.
    pub fn reconfigure(&mut self, config: RadioConfig) -> bool {
        if !self.initialized {
            return false;
        }

        self.config = config;
        self.runtime.frequency = config.frequency;

        if !self.configure() {
            self.sink.error("Reconfiguration failed");
            return false;
        }
        self.sink.info("Reconfigured");

        true
    }

    /// Start sending `bytes` over the radio.
    ///
    /// Non-blocking: a true return means the send is in flight, and the
    /// interrupt handler will signal the flag when it finishes. Returns
    /// false when the controller is uninitialized, when a transmit already
    /// holds the action slot, or when the capability refuses the send.
    pub fn transmit_bytes(&mut self, bytes: &[u8]) -> bool {
        if !self.initialized {
            return false;
        }

        // A stale non-transmit action has no timeout of its own; outbound
        // traffic overrides it instead of staying locked out forever.
        if !self.flag.is_set() && self.runtime.last_action != Action::Transmit {
            self.flag.signal();
        }

        // A transmit still in flight keeps the slot
        if !self.flag.is_set() {
            return false;
        }
        self.flag.clear();

        // Clean up from the previous send
        let _ = self.radio.finish_transmit();

        self.runtime.last_status = self.radio.start_transmit(bytes);
        if let Err(code) = self.runtime.last_status {
            self.report_error(format_args!(
                "Starting transmit failed with status {:?}",
                code
            ));
            return false;
        }
        self.runtime.last_action = Action::Transmit;

        true
    }

    /// Harvest any pending packet and re-arm listening.
    ///
    /// Returns true only when this call read out a packet with a non-zero
    /// length and the capability reported success; "nothing received yet"
    /// and hardware errors are both false, distinguished through the
    /// recorded status and the sink. A busy action slot fails the call
    /// without any override: the caller polls again.
    pub fn receive_bytes(&mut self) -> bool {
        if !self.initialized {
            return false;
        }

        if !self.flag.is_set() {
            return false;
        }
        self.flag.clear();

        // Standby first so the pending packet can be read out
        let _ = self.radio.standby();

        // Only a previously armed listen can have a packet waiting; on a
        // fresh or transmit-to-receive transition there is nothing to
        // harvest
        let mut harvested = 0;
        if self.runtime.last_action == Action::Receive {
            harvested = self.harvest();
        }

        // Re-arm listening regardless of the harvest outcome
        // TODO: surface start_receive failures instead of leaving them to
        // the next poll
        let _ = self.radio.start_receive();
        self.runtime.last_action = Action::Receive;

        self.runtime.last_status.is_ok() && harvested != 0
    }

    /// The most recent reception. Meaningful after `receive_bytes`
    /// returned true; overwritten by the next harvest.
    pub fn received_data(&self) -> &ReceivedData {
        &self.received
    }

    /// Live runtime state: operating frequency, last status, last action.
    pub fn runtime_state(&self) -> &RuntimeState {
        &self.runtime
    }

    /// Whether `begin` has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Borrow the underlying radio capability.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Mutably borrow the underlying radio capability, e.g. for
    /// driver-specific calls outside the controller's state machine.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Borrow the notification sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply every configured parameter in a fixed order, stopping at the
    /// first one the capability rejects as invalid. The RF-switch step is
    /// fatal on any error.
    fn configure(&mut self) -> bool {
        let RadioConfig {
            frequency,
            sync_word,
            tx_power,
            spreading_factor,
            coding_rate,
            bandwidth,
            ..
        } = self.config;

        if self.radio.set_frequency(frequency) == Err(RadioError::InvalidFrequency) {
            self.report_error(format_args!("Frequency is invalid: {} MHz", frequency));
            return false;
        }

        if self.radio.set_output_power(tx_power) == Err(RadioError::InvalidOutputPower) {
            self.report_error(format_args!("Transmit power is invalid: {} dBm", tx_power));
            return false;
        }

        if self.radio.set_spreading_factor(spreading_factor)
            == Err(RadioError::InvalidSpreadingFactor)
        {
            self.report_error(format_args!(
                "Spreading factor is invalid: {}",
                spreading_factor
            ));
            return false;
        }

        if self.radio.set_coding_rate(coding_rate) == Err(RadioError::InvalidCodingRate) {
            self.report_error(format_args!("Coding rate is invalid: {}", coding_rate));
            return false;
        }

        if self.radio.set_bandwidth(bandwidth) == Err(RadioError::InvalidBandwidth) {
            self.report_error(format_args!("Signal bandwidth is invalid: {} kHz", bandwidth));
            return false;
        }

        if self.radio.set_sync_word(sync_word) == Err(RadioError::InvalidSyncWord) {
            self.report_error(format_args!("Sync word is invalid: {:#04X}", sync_word));
            return false;
        }

        if self.radio.set_rf_switch_ctrl(true).is_err() {
            self.sink.error("Failed to hand RF switch control to the radio");
            return false;
        }

        true
    }

    /// Read out the pending packet and publish the receive record.
    ///
    /// The record is published even when the read fails, preserving the
    /// last-known-values contract; the failure is visible through the
    /// recorded status and the sink. Returns the harvested length.
    fn harvest(&mut self) -> usize {
        let mut buffer = [0u8; MAX_PACKET_LEN];
        self.runtime.last_status = self.radio.read_data(&mut buffer);
        let reported = self.radio.packet_length();

        if let Err(code) = self.runtime.last_status {
            self.report_error(format_args!("Receiving failed with status {:?}", code));
        }

        // The record never exceeds its bound, whatever length the chip
        // reports
        let length = reported.min(MAX_PACKET_LEN);
        self.received.payload.clear();
        let _ = self.received.payload.extend_from_slice(&buffer[..length]);
        self.received.rssi = self.radio.rssi();
        self.received.snr = self.radio.snr();
        self.received.frequency = self.runtime.frequency;

        if self.config.frequency_correction {
            // The reported error shares the drift unit (Hz); the tracked
            // frequency is in MHz
            let drift = self.radio.frequency_error() / 1_000_000.0;
            let corrected = self.runtime.frequency - drift;
            // Adopt the corrected frequency unless the capability rejects
            // it as out of range
            if self.radio.set_frequency(corrected) != Err(RadioError::InvalidFrequency) {
                self.runtime.frequency = corrected;
            }
        }

        length
    }

    fn report_error(&mut self, args: fmt::Arguments<'_>) {
        let mut message: String<MSG_CAPACITY> = String::new();
        let _ = message.write_fmt(args);
        self.sink.error(&message);
    }
}
