use crate::flag::ActionFlag;

/// Errors reported by a radio capability.
///
/// Every settable parameter has its own dedicated invalid code so callers
/// can tell a rejected value apart from a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Carrier frequency outside the synthesizer range
    InvalidFrequency,
    /// Output power outside the PA range
    InvalidOutputPower,
    /// Unsupported spreading factor
    InvalidSpreadingFactor,
    /// Unsupported coding rate
    InvalidCodingRate,
    /// Bandwidth not in the chip's discrete set
    InvalidBandwidth,
    /// Sync word rejected by the chip
    InvalidSyncWord,
    /// Payload longer than the chip buffer allows
    PacketTooLong,
    /// SPI transfer error
    Spi,
    /// GPIO error
    Gpio,
    /// Chip stayed busy past the deadline
    Timeout,
    /// Payload failed the CRC check
    Crc,
}

/// Outcome of the most recent radio command, recorded verbatim in the
/// controller's runtime state.
pub type Status = Result<(), RadioError>;

/// Generic radio capability interface.
///
/// Implementations are half-duplex transceivers: one physical operation at
/// a time, with `start_transmit`/`start_receive` returning as soon as the
/// operation is kicked off. Completion is delivered out of band through the
/// [`ActionFlag`] bound with [`bind_completion`](Self::bind_completion).
pub trait Radio {
    /// Initialize the chip into standby
    fn init(&mut self) -> Result<(), RadioError>;

    /// Set the carrier frequency in MHz
    fn set_frequency(&mut self, mhz: f64) -> Result<(), RadioError>;

    /// Set the transmit output power in dBm
    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError>;

    /// Set the LoRa spreading factor
    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError>;

    /// Set the coding rate denominator (5 for 4/5 through 8 for 4/8)
    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError>;

    /// Set the signal bandwidth in kHz
    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError>;

    /// Set the sync word
    fn set_sync_word(&mut self, word: u8) -> Result<(), RadioError>;

    /// Route RF switch control to the chip (DIO2 on SX126x parts)
    fn set_rf_switch_ctrl(&mut self, enabled: bool) -> Result<(), RadioError>;

    /// Route operation-complete interrupts to `flag`
    fn bind_completion(&mut self, flag: &'static ActionFlag) -> Result<(), RadioError>;

    /// Put the chip into standby mode
    fn standby(&mut self) -> Result<(), RadioError>;

    /// Start sending `data`; returns once the operation is in flight
    fn start_transmit(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Flush leftover transmit bookkeeping from a prior send
    fn finish_transmit(&mut self) -> Result<(), RadioError>;

    /// Arm continuous listening; returns once the operation is in flight
    fn start_receive(&mut self) -> Result<(), RadioError>;

    /// Read the pending packet payload into `buffer`
    fn read_data(&mut self, buffer: &mut [u8]) -> Result<(), RadioError>;

    /// Length in bytes of the pending packet
    fn packet_length(&mut self) -> usize;

    /// RSSI of the last packet in dBm
    fn rssi(&mut self) -> f32;

    /// SNR of the last packet in dB
    fn snr(&mut self) -> f32;

    /// Measured receiver frequency error in Hz
    fn frequency_error(&mut self) -> f64;
}
