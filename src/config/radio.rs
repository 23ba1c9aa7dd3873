/// Radio configuration, supplied once at `begin` and owned by the
/// controller for the rest of the session.
///
/// The controller keeps its own copy; the caller's copy may be discarded.
/// Pin assignments and the bus instance are not part of this record: they
/// are fixed at driver construction, where the type system can hold them.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    /// Carrier frequency in MHz
    pub frequency: f64,
    /// Sync word distinguishing this network from neighbours
    pub sync_word: u8,
    /// Transmit power in dBm
    pub tx_power: i8,
    /// LoRa spreading factor
    pub spreading_factor: u8,
    /// Coding rate denominator (5 for 4/5 through 8 for 4/8)
    pub coding_rate: u8,
    /// Signal bandwidth in kHz
    pub bandwidth: f32,
    /// Track and correct receiver frequency drift after each packet
    pub frequency_correction: bool,
}

impl RadioConfig {
    /// Create a configuration for the given channel, with the remaining
    /// parameters at their long-range defaults.
    pub fn new(frequency: f64, sync_word: u8) -> Self {
        Self {
            frequency,
            sync_word,
            ..Self::default()
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency: 434.5,
            sync_word: 0xF4,
            tx_power: 22,
            spreading_factor: 11,
            coding_rate: 8,
            bandwidth: 62.5,
            frequency_correction: false,
        }
    }
}
