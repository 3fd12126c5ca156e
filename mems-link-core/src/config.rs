//! Link configuration
//!
//! Everything the dispatch shell needs to know about the board it runs on.
//! Stored in flash as postcard-serialized binary data.

use heapless::String;

use mems_link_hal::UartConfig;
use mems_link_protocol::commands::{CMD_START_DATA_STREAMING, DEFAULT_DEVICE_ADDR};
use mems_link_protocol::transport::DEFAULT_TX_TIMEOUT_MS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum presentation string length
pub const MAX_PRESENTATION_LEN: usize = 64;

/// Presentation string of the IKS02A1 demo firmware
pub const DEFAULT_PRESENTATION: &str = "MEMS shield demo,101,9.4.0,0.0.0,IKS02A1";

/// Firmware id reported by `CheckModeSupport`
pub const DEFAULT_MODE_SUPPORT: i32 = 101;

/// UART baud rate used by every board
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Presentation string longer than [`MAX_PRESENTATION_LEN`]
    PresentationTooLong,
    /// Device address collides with a host address
    InvalidAddress,
    /// Output buffer too small
    Serialize,
    /// Stored bytes are not a valid configuration
    Deserialize,
}

/// Per-board link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Address this board answers to
    pub device_address: u8,
    /// UART baud rate
    pub baud_rate: u32,
    /// Blocking transmit timeout
    pub tx_timeout_ms: u32,
    /// Answer to `ReadPresentationString`
    pub presentation: String<MAX_PRESENTATION_LEN>,
    /// Answer to `CheckModeSupport`
    pub mode_support: i32,
    /// Command byte carried by streamed samples
    pub streaming_command: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let mut presentation = String::new();
        // Fits: the default is shorter than MAX_PRESENTATION_LEN
        let _ = presentation.push_str(DEFAULT_PRESENTATION);
        Self {
            device_address: DEFAULT_DEVICE_ADDR,
            baud_rate: DEFAULT_BAUD_RATE,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
            presentation,
            mode_support: DEFAULT_MODE_SUPPORT,
            streaming_command: CMD_START_DATA_STREAMING,
        }
    }
}

impl LinkConfig {
    /// Replace the presentation string
    pub fn set_presentation(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut presentation = String::new();
        presentation
            .push_str(text)
            .map_err(|_| ConfigError::PresentationTooLong)?;
        self.presentation = presentation;
        Ok(())
    }

    /// UART settings for this link (8N1 at the configured rate)
    pub fn uart_config(&self) -> UartConfig {
        UartConfig {
            baudrate: self.baud_rate,
            ..UartConfig::default()
        }
    }

    /// Check the configuration can be used on a link
    ///
    /// Addresses 1 to 3 belong to the host interfaces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (1..=3).contains(&self.device_address) {
            return Err(ConfigError::InvalidAddress);
        }
        Ok(())
    }

    /// Serialize into `buf`, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn store<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize and validate a stored configuration
    #[cfg(feature = "serde")]
    pub fn load(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_boards() {
        let config = LinkConfig::default();
        assert_eq!(config.device_address, 50);
        assert_eq!(config.baud_rate, 921_600);
        assert_eq!(config.tx_timeout_ms, 5000);
        assert_eq!(config.presentation.as_str(), DEFAULT_PRESENTATION);
        assert_eq!(config.mode_support, 101);
        assert!(config.validate().is_ok());
        assert_eq!(config.uart_config().baudrate, 921_600);
    }

    #[test]
    fn test_presentation_too_long() {
        let mut config = LinkConfig::default();
        let long = [b'x'; MAX_PRESENTATION_LEN + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            config.set_presentation(long),
            Err(ConfigError::PresentationTooLong)
        );
        assert_eq!(config.presentation.as_str(), DEFAULT_PRESENTATION);

        config.set_presentation("MEMS shield demo,4").unwrap();
        assert_eq!(config.presentation.as_str(), "MEMS shield demo,4");
    }

    #[test]
    fn test_host_address_rejected() {
        let config = LinkConfig {
            device_address: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAddress));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_store_load() {
        let mut config = LinkConfig::default();
        config.device_address = 51;
        config.mode_support = 7;

        let mut buf = [0u8; 128];
        let used = config.store(&mut buf).unwrap().len();
        assert_eq!(LinkConfig::load(&buf[..used]), Ok(config));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_store_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            LinkConfig::default().store(&mut buf).map(|b| b.len()),
            Err(ConfigError::Serialize)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_load_garbage() {
        assert_eq!(LinkConfig::load(&[]), Err(ConfigError::Deserialize));
    }
}
