//! Receive-side polling loop demo
//!
//! Drives the controller against an in-process software radio with a
//! scripted airwave:
//! - Controller bring-up with frequency correction enabled
//! - The arm-then-harvest receive cadence (`receive_bytes` harvests a
//!   packet only once listening has been armed by a previous call)
//! - Hex dump of harvested payloads plus their RSSI/SNR
//! - The tracked operating frequency moving as drift is corrected
//!
//! On a target board the radio would be an SX126x driver and the
//! `ACTION_DONE.signal()` call would live in the DIO1 interrupt handler.

use std::collections::VecDeque;

use lora_radio::{
    config::radio::RadioConfig,
    controller::RadioController,
    flag::ActionFlag,
    radio::traits::{Radio, RadioError},
    sink::NotificationSink,
};

static ACTION_DONE: ActionFlag = ActionFlag::new();

/// Software radio replaying a scripted sequence of inbound packets.
struct AirwaveRadio {
    traffic: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
}

impl AirwaveRadio {
    fn new(traffic: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            traffic: traffic.into_iter().collect(),
            pending: Vec::new(),
        }
    }
}

impl Radio for AirwaveRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_frequency(&mut self, _mhz: f64) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_output_power(&mut self, _dbm: i8) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_spreading_factor(&mut self, _sf: u8) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_coding_rate(&mut self, _denominator: u8) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_bandwidth(&mut self, _khz: f32) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_sync_word(&mut self, _word: u8) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_rf_switch_ctrl(&mut self, _enabled: bool) -> Result<(), RadioError> {
        Ok(())
    }

    fn bind_completion(&mut self, _flag: &'static ActionFlag) -> Result<(), RadioError> {
        Ok(())
    }

    fn standby(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn start_transmit(&mut self, _data: &[u8]) -> Result<(), RadioError> {
        Ok(())
    }

    fn finish_transmit(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn start_receive(&mut self) -> Result<(), RadioError> {
        // A new listen window: the next scripted packet goes on the air
        self.pending = self.traffic.pop_front().unwrap_or_default();
        Ok(())
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<(), RadioError> {
        let len = self.pending.len().min(buffer.len());
        buffer[..len].copy_from_slice(&self.pending[..len]);
        Ok(())
    }

    fn packet_length(&mut self) -> usize {
        self.pending.len()
    }

    fn rssi(&mut self) -> f32 {
        -92.5
    }

    fn snr(&mut self) -> f32 {
        7.25
    }

    fn frequency_error(&mut self) -> f64 {
        // A constant 12 kHz of receiver drift
        12_000.0
    }
}

/// Sink printing to the host terminal.
struct PrintlnSink;

impl NotificationSink for PrintlnSink {
    fn info(&mut self, message: &str) {
        println!("[radio/info] {message}");
    }

    fn error(&mut self, message: &str) {
        eprintln!("[radio/error] {message}");
    }
}

fn main() {
    let radio = AirwaveRadio::new([
        b"hello".to_vec(),
        Vec::new(), // a quiet window
        b"telemetry: 42".to_vec(),
    ]);
    let mut controller = RadioController::new(radio, &ACTION_DONE, PrintlnSink);

    let config = RadioConfig {
        frequency_correction: true,
        ..RadioConfig::default()
    };
    if !controller.begin(config) {
        eprintln!("radio bring-up failed");
        return;
    }

    for _ in 0..4 {
        if controller.receive_bytes() {
            let packet = controller.received_data();
            print!("received {} bytes:", packet.payload.len());
            for byte in &packet.payload {
                print!(" {byte:02X}");
            }
            println!(
                "  (rssi {} dBm, snr {} dB, {} MHz)",
                packet.rssi, packet.snr, packet.frequency
            );
        } else {
            println!("nothing harvested this poll");
        }
        println!(
            "operating frequency now {} MHz",
            controller.runtime_state().frequency
        );

        // Interrupt stand-in: the hardware reports the listen window done
        ACTION_DONE.signal();
    }
}
