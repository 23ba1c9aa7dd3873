use embedded_hal::{
    blocking::delay::DelayMs,
    blocking::spi::{Transfer, Write},
    digital::v2::{InputPin, OutputPin},
};

use crate::flag::ActionFlag;
use crate::radio::traits::{Radio, RadioError};

// SX126x Register Map
mod registers {
    pub const REG_SYNC_WORD_MSB: u16 = 0x0740;
    pub const REG_SYNC_WORD_LSB: u16 = 0x0741;
    pub const REG_FREQ_ERROR: u16 = 0x076B;
}

mod commands {
    pub const SET_SLEEP: u8 = 0x84;
    pub const SET_STANDBY: u8 = 0x80;
    pub const SET_TX: u8 = 0x83;
    pub const SET_RX: u8 = 0x82;
    pub const SET_REGULATOR_MODE: u8 = 0x96;
    pub const CALIBRATE: u8 = 0x89;
    pub const SET_PA_CONFIG: u8 = 0x95;
    pub const WRITE_REGISTER: u8 = 0x0D;
    pub const READ_REGISTER: u8 = 0x1D;
    pub const WRITE_BUFFER: u8 = 0x0E;
    pub const READ_BUFFER: u8 = 0x1E;
    pub const SET_DIO_IRQ_PARAMS: u8 = 0x08;
    pub const GET_IRQ_STATUS: u8 = 0x12;
    pub const CLR_IRQ_STATUS: u8 = 0x02;
    pub const SET_DIO2_AS_RF_SWITCH_CTRL: u8 = 0x9D;
    pub const SET_RF_FREQUENCY: u8 = 0x86;
    pub const SET_PKT_TYPE: u8 = 0x8A;
    pub const SET_TX_PARAMS: u8 = 0x8E;
    pub const SET_MODULATION_PARAMS: u8 = 0x8B;
    pub const SET_PKT_PARAMS: u8 = 0x8C;
    pub const GET_PKT_STATUS: u8 = 0x14;
    pub const GET_RX_BUFFER_STATUS: u8 = 0x13;
    pub const SET_BUFFER_BASE_ADDRESS: u8 = 0x8F;
}

// IRQ bits routed to DIO1
const IRQ_TX_DONE: u16 = 0x0001;
const IRQ_RX_DONE: u16 = 0x0002;
const IRQ_CRC_ERR: u16 = 0x0040;
const IRQ_TIMEOUT: u16 = 0x0200;

// Crystal frequency and the frf scaling it implies
const XTAL_HZ: u64 = 32_000_000;

/// SX126x-family (SX1261/2/8) LoRa driver.
///
/// The driver never blocks on an in-flight operation: `start_transmit` and
/// `start_receive` return as soon as the command is accepted and the chip
/// raises DIO1 when the operation completes. Wire the DIO1 line to an
/// interrupt routine that calls [`handle_interrupt`](Self::handle_interrupt)
/// (or signals the bound [`ActionFlag`] directly).
pub struct SX126x<SPI, CS, RESET, BUSY, DIO1, DELAY>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
    DELAY: DelayMs<u32>,
{
    spi: SPI,
    cs: CS,
    reset: RESET,
    busy: BUSY,
    dio1: DIO1,
    delay: DELAY,
    flag: Option<&'static ActionFlag>,
    // Modulation cache; the chip takes all four fields in one command
    spreading_factor: u8,
    bandwidth_khz: f32,
    coding_rate: u8,
}

impl<SPI, CS, RESET, BUSY, DIO1, DELAY> SX126x<SPI, CS, RESET, BUSY, DIO1, DELAY>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
    DELAY: DelayMs<u32>,
{
    /// Create new SX126x driver instance
    ///
    /// # Arguments
    /// * `spi` - SPI interface
    /// * `cs` - Chip select pin
    /// * `reset` - Reset pin
    /// * `busy` - Busy pin
    /// * `dio1` - DIO1 interrupt pin
    /// * `delay` - Delay implementation
    pub fn new(
        spi: SPI,
        cs: CS,
        reset: RESET,
        busy: BUSY,
        dio1: DIO1,
        delay: DELAY,
    ) -> Result<Self, RadioError> {
        let mut radio = Self {
            spi,
            cs,
            reset,
            busy,
            dio1,
            delay,
            flag: None,
            spreading_factor: 7,
            bandwidth_khz: 125.0,
            coding_rate: 5,
        };

        // Reset sequence: NRESET is active low
        radio.reset.set_low().map_err(|_| RadioError::Gpio)?;
        radio.delay.delay_ms(2);
        radio.reset.set_high().map_err(|_| RadioError::Gpio)?;
        radio.delay.delay_ms(10);

        // Wait for busy to go low indicating device is ready
        radio.wait_busy()?;

        Ok(radio)
    }

    /// Forward a DIO1 edge to the bound completion flag.
    ///
    /// Call from the interrupt routine servicing the DIO1 line; clears the
    /// chip-side latch so the line drops before the next operation.
    pub fn handle_interrupt(&mut self) -> Result<(), RadioError> {
        self.clear_irq_status()?;
        if let Some(flag) = self.flag {
            flag.signal();
        }
        Ok(())
    }

    /// Non-blocking completion poll on the DIO1 line, for hosts that wire
    /// no interrupt and poll the pin instead.
    pub fn wait_action_done(&mut self) -> nb::Result<(), RadioError> {
        if self
            .dio1
            .is_high()
            .map_err(|_| nb::Error::Other(RadioError::Gpio))?
        {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Put the chip into sleep mode (warm start retained).
    pub fn sleep(&mut self) -> Result<(), RadioError> {
        self.write_command(commands::SET_SLEEP, &[0x04])
    }

    fn wait_busy(&mut self) -> Result<(), RadioError> {
        for _ in 0..1000 {
            if self.busy.is_low().map_err(|_| RadioError::Gpio)? {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(RadioError::Timeout)
    }

    fn write_command(&mut self, command: u8, data: &[u8]) -> Result<(), RadioError> {
        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi.write(&[command]).map_err(|_| RadioError::Spi)?;
        if !data.is_empty() {
            self.spi.write(data).map_err(|_| RadioError::Spi)?;
        }
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()
    }

    fn read_command(&mut self, command: u8, data: &mut [u8]) -> Result<(), RadioError> {
        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi.write(&[command]).map_err(|_| RadioError::Spi)?;
        self.spi.write(&[0]).map_err(|_| RadioError::Spi)?; // NOP for status
        if !data.is_empty() {
            self.spi.transfer(data).map_err(|_| RadioError::Spi)?;
        }
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()
    }

    fn write_register(&mut self, address: u16, data: &[u8]) -> Result<(), RadioError> {
        let addr_bytes = [(address >> 8) as u8, address as u8];
        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi
            .write(&[commands::WRITE_REGISTER])
            .map_err(|_| RadioError::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| RadioError::Spi)?;
        self.spi.write(data).map_err(|_| RadioError::Spi)?;
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()
    }

    fn read_register(&mut self, address: u16, data: &mut [u8]) -> Result<(), RadioError> {
        let addr_bytes = [(address >> 8) as u8, address as u8];
        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi
            .write(&[commands::READ_REGISTER])
            .map_err(|_| RadioError::Spi)?;
        self.spi.write(&addr_bytes).map_err(|_| RadioError::Spi)?;
        self.spi.write(&[0]).map_err(|_| RadioError::Spi)?; // NOP
        self.spi.transfer(data).map_err(|_| RadioError::Spi)?;
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()
    }

    fn clear_irq_status(&mut self) -> Result<(), RadioError> {
        self.write_command(commands::CLR_IRQ_STATUS, &[0xFF, 0xFF])
    }

    fn irq_status(&mut self) -> Result<u16, RadioError> {
        let mut status = [0u8; 2];
        self.read_command(commands::GET_IRQ_STATUS, &mut status)?;
        Ok(u16::from_be_bytes(status))
    }

    fn apply_modulation_params(&mut self) -> Result<(), RadioError> {
        let bw_code = bandwidth_code(self.bandwidth_khz).ok_or(RadioError::InvalidBandwidth)?;
        let mod_params = [
            self.spreading_factor,
            bw_code,
            self.coding_rate - 4,
            0x00, // Low data rate optimize off
        ];
        self.write_command(commands::SET_MODULATION_PARAMS, &mod_params)
    }

    fn set_packet_params(&mut self, payload_length: u8) -> Result<(), RadioError> {
        let packet_params = [
            0x00,           // Preamble length MSB
            0x08,           // Preamble length LSB
            0x00,           // Header type (explicit)
            payload_length, // Payload length
            0x01,           // CRC on
            0x00,           // Standard IQ
        ];
        self.write_command(commands::SET_PKT_PARAMS, &packet_params)
    }

    // GET_RX_BUFFER_STATUS: [payload length, buffer start offset]
    fn rx_buffer_status(&mut self) -> Result<(u8, u8), RadioError> {
        let mut status = [0u8; 2];
        self.read_command(commands::GET_RX_BUFFER_STATUS, &mut status)?;
        Ok((status[0], status[1]))
    }

    // GET_PKT_STATUS: [RssiPkt, SnrPkt, SignalRssiPkt]
    fn packet_status(&mut self) -> Result<[u8; 3], RadioError> {
        let mut status = [0u8; 3];
        self.read_command(commands::GET_PKT_STATUS, &mut status)?;
        Ok(status)
    }
}

// Discrete SX126x bandwidth steps, keyed in tenths of a kHz (rounded, so
// inexact f32 literals like 20.8 still land on their step)
fn bandwidth_code(khz: f32) -> Option<u8> {
    match (khz * 10.0 + 0.5) as u32 {
        78 => Some(0x00),
        104 => Some(0x08),
        156 => Some(0x01),
        208 => Some(0x09),
        313 => Some(0x02),
        417 => Some(0x0A),
        625 => Some(0x03),
        1250 => Some(0x04),
        2500 => Some(0x05),
        5000 => Some(0x06),
        _ => None,
    }
}

impl<SPI, CS, RESET, BUSY, DIO1, DELAY> Radio for SX126x<SPI, CS, RESET, BUSY, DIO1, DELAY>
where
    SPI: Transfer<u8> + Write<u8>,
    CS: OutputPin,
    RESET: OutputPin,
    BUSY: InputPin,
    DIO1: InputPin,
    DELAY: DelayMs<u32>,
{
    fn init(&mut self) -> Result<(), RadioError> {
        // Set to standby mode
        self.write_command(commands::SET_STANDBY, &[0])?; // STDBY_RC

        // Set packet type to LoRa
        self.write_command(commands::SET_PKT_TYPE, &[0x01])?;

        // Set regulator mode to DC-DC
        self.write_command(commands::SET_REGULATOR_MODE, &[0x01])?;

        // Calibrate all blocks
        self.write_command(commands::CALIBRATE, &[0x7F])?;

        // TX and RX share the 256-byte buffer from offset 0
        self.write_command(commands::SET_BUFFER_BASE_ADDRESS, &[0x00, 0x00])
    }

    fn set_frequency(&mut self, mhz: f64) -> Result<(), RadioError> {
        // Synthesizer range common to the SX126x family
        if !(150.0..=960.0).contains(&mhz) {
            return Err(RadioError::InvalidFrequency);
        }
        let freq_hz = (mhz * 1_000_000.0) as u64;
        let frf = (freq_hz << 25) / XTAL_HZ;
        let freq_bytes = [
            ((frf >> 24) & 0xFF) as u8,
            ((frf >> 16) & 0xFF) as u8,
            ((frf >> 8) & 0xFF) as u8,
            (frf & 0xFF) as u8,
        ];
        self.write_command(commands::SET_RF_FREQUENCY, &freq_bytes)
    }

    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError> {
        if !(-9..=22).contains(&dbm) {
            return Err(RadioError::InvalidOutputPower);
        }
        // Configure PA for the high-power path
        self.write_command(commands::SET_PA_CONFIG, &[0x04, 0x07, 0x00, 0x01])?;
        // Power and 200us ramp time
        self.write_command(commands::SET_TX_PARAMS, &[dbm as u8, 0x04])
    }

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError> {
        if !(5..=12).contains(&sf) {
            return Err(RadioError::InvalidSpreadingFactor);
        }
        self.spreading_factor = sf;
        self.apply_modulation_params()
    }

    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError> {
        if !(5..=8).contains(&denominator) {
            return Err(RadioError::InvalidCodingRate);
        }
        self.coding_rate = denominator;
        self.apply_modulation_params()
    }

    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError> {
        if bandwidth_code(khz).is_none() {
            return Err(RadioError::InvalidBandwidth);
        }
        self.bandwidth_khz = khz;
        self.apply_modulation_params()
    }

    fn set_sync_word(&mut self, word: u8) -> Result<(), RadioError> {
        // One-byte public sync word spread over the two-byte register pair
        let msb = (word & 0xF0) | 0x04;
        let lsb = ((word & 0x0F) << 4) | 0x04;
        self.write_register(registers::REG_SYNC_WORD_MSB, &[msb])?;
        self.write_register(registers::REG_SYNC_WORD_LSB, &[lsb])
    }

    fn set_rf_switch_ctrl(&mut self, enabled: bool) -> Result<(), RadioError> {
        self.write_command(commands::SET_DIO2_AS_RF_SWITCH_CTRL, &[enabled as u8])
    }

    fn bind_completion(&mut self, flag: &'static ActionFlag) -> Result<(), RadioError> {
        self.flag = Some(flag);
        let mask = IRQ_TX_DONE | IRQ_RX_DONE | IRQ_TIMEOUT;
        let params = [
            (mask >> 8) as u8,
            mask as u8,
            (mask >> 8) as u8, // DIO1 gets the full mask
            mask as u8,
            0x00, // DIO2 unused (RF switch)
            0x00,
            0x00, // DIO3 unused
            0x00,
        ];
        self.write_command(commands::SET_DIO_IRQ_PARAMS, &params)
    }

    fn standby(&mut self) -> Result<(), RadioError> {
        self.write_command(commands::SET_STANDBY, &[0x00])
    }

    fn start_transmit(&mut self, data: &[u8]) -> Result<(), RadioError> {
        if data.len() > 255 {
            return Err(RadioError::PacketTooLong);
        }
        self.set_packet_params(data.len() as u8)?;

        // Write payload at offset 0
        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi
            .write(&[commands::WRITE_BUFFER, 0x00])
            .map_err(|_| RadioError::Spi)?;
        self.spi.write(data).map_err(|_| RadioError::Spi)?;
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()?;

        self.clear_irq_status()?;

        // Kick off the send with no chip-side timeout; completion arrives
        // on DIO1, not here
        self.write_command(commands::SET_TX, &[0x00, 0x00, 0x00])
    }

    fn finish_transmit(&mut self) -> Result<(), RadioError> {
        self.clear_irq_status()?;
        self.standby()
    }

    fn start_receive(&mut self) -> Result<(), RadioError> {
        self.set_packet_params(0xFF)?;
        self.clear_irq_status()?;
        // 0xFFFFFF selects continuous RX
        self.write_command(commands::SET_RX, &[0xFF, 0xFF, 0xFF])
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<(), RadioError> {
        let crc_failed = self.irq_status()? & IRQ_CRC_ERR != 0;

        let (len, offset) = self.rx_buffer_status()?;
        let len = (len as usize).min(buffer.len());

        self.cs.set_low().map_err(|_| RadioError::Gpio)?;
        self.spi
            .write(&[commands::READ_BUFFER, offset, 0x00])
            .map_err(|_| RadioError::Spi)?;
        self.spi
            .transfer(&mut buffer[..len])
            .map_err(|_| RadioError::Spi)?;
        self.cs.set_high().map_err(|_| RadioError::Gpio)?;
        self.wait_busy()?;

        self.clear_irq_status()?;

        if crc_failed {
            return Err(RadioError::Crc);
        }
        Ok(())
    }

    fn packet_length(&mut self) -> usize {
        match self.rx_buffer_status() {
            Ok((len, _)) => len as usize,
            Err(_) => 0,
        }
    }

    fn rssi(&mut self) -> f32 {
        match self.packet_status() {
            Ok(status) => -(status[0] as f32) / 2.0,
            Err(_) => 0.0,
        }
    }

    fn snr(&mut self) -> f32 {
        match self.packet_status() {
            Ok(status) => (status[1] as i8) as f32 / 4.0,
            Err(_) => 0.0,
        }
    }

    fn frequency_error(&mut self) -> f64 {
        let mut raw = [0u8; 3];
        if self.read_register(registers::REG_FREQ_ERROR, &mut raw).is_err() {
            return 0.0;
        }
        // 20-bit two's complement estimate
        let mut efe = ((raw[0] as i32 & 0x0F) << 16) | ((raw[1] as i32) << 8) | raw[2] as i32;
        if raw[0] & 0x08 != 0 {
            efe -= 1 << 20;
        }
        // Scale by the observed bandwidth (datasheet constant 1.55)
        1.55 * efe as f64 / (1600.0 / self.bandwidth_khz as f64) * 1000.0
    }
}
