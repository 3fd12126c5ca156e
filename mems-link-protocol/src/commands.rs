//! Addresses and command codes
//!
//! Command codes are grouped by range:
//! - 0x00–0x1F: generic link commands
//! - 0x50–0x5F: sensor and algorithm commands
//! - 0x60–0x6F: environmental sensors
//! - 0x70–0x7F: inertial sensors and streaming data
//!
//! A reply carries the request code plus [`REPLY_ADD`].

// Addresses
pub const ADDR_UART: u8 = 0x01;
pub const ADDR_USB: u8 = 0x02;
pub const ADDR_SPI: u8 = 0x03;

/// Address the board answers to unless configured otherwise
pub const DEFAULT_DEVICE_ADDR: u8 = 50;

// Generic commands
pub const CMD_PING: u8 = 0x01;
pub const CMD_READ_PRES_STRING: u8 = 0x02;
pub const CMD_NACK: u8 = 0x03;
pub const CMD_CHECK_MODE_SUPPORT: u8 = 0x04;
pub const CMD_UPLOAD: u8 = 0x05;
pub const CMD_CHANGE_SF: u8 = 0x07;
pub const CMD_START_DATA_STREAMING: u8 = 0x08;
pub const CMD_STOP_DATA_STREAMING: u8 = 0x09;
pub const CMD_SET_DATE_TIME: u8 = 0x0C;
pub const CMD_ENTER_DFU_MODE: u8 = 0x0E;
pub const CMD_RESET: u8 = 0x0F;
pub const CMD_ENABLE_DISABLE_SENSOR: u8 = 0x10;

// Sensor and algorithm commands
pub const CMD_SENSOR: u8 = 0x50;
pub const CMD_ALGO_MODE: u8 = 0x51;
pub const CMD_CALIBRATION_MODE: u8 = 0x53;
pub const CMD_PRESSURE_INIT: u8 = 0x60;
pub const CMD_HUMIDITY_TEMPERATURE_INIT: u8 = 0x62;
pub const CMD_ACCELERO_GYRO_INIT: u8 = 0x76;
pub const CMD_MAGNETO_INIT: u8 = 0x7A;
pub const CMD_SF_DATA: u8 = 0x7D;

/// Offset added to a command code to mark a reply
pub const REPLY_ADD: u8 = 0x80;

/// Commands the dispatch layer knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Ping,
    ReadPresentationString,
    Nack,
    CheckModeSupport,
    StartStreaming,
    StopStreaming,
    SetDateTime,
    EnterDfu,
    Reset,
    /// Sensor, algorithm and board-specific commands
    Other(u8),
}

impl Command {
    /// Parse a command from its wire byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            CMD_PING => Command::Ping,
            CMD_READ_PRES_STRING => Command::ReadPresentationString,
            CMD_NACK => Command::Nack,
            CMD_CHECK_MODE_SUPPORT => Command::CheckModeSupport,
            CMD_START_DATA_STREAMING => Command::StartStreaming,
            CMD_STOP_DATA_STREAMING => Command::StopStreaming,
            CMD_SET_DATE_TIME => Command::SetDateTime,
            CMD_ENTER_DFU_MODE => Command::EnterDfu,
            CMD_RESET => Command::Reset,
            other => Command::Other(other),
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Ping => CMD_PING,
            Command::ReadPresentationString => CMD_READ_PRES_STRING,
            Command::Nack => CMD_NACK,
            Command::CheckModeSupport => CMD_CHECK_MODE_SUPPORT,
            Command::StartStreaming => CMD_START_DATA_STREAMING,
            Command::StopStreaming => CMD_STOP_DATA_STREAMING,
            Command::SetDateTime => CMD_SET_DATE_TIME,
            Command::EnterDfu => CMD_ENTER_DFU_MODE,
            Command::Reset => CMD_RESET,
            Command::Other(byte) => byte,
        }
    }
}

/// Reply code for a request code
pub fn reply_code(command: u8) -> u8 {
    command.wrapping_add(REPLY_ADD)
}

/// Returns true if the code has the reply bit set
pub fn is_reply(command: u8) -> bool {
    command & REPLY_ADD != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_roundtrip() {
        let commands = [
            Command::Ping,
            Command::ReadPresentationString,
            Command::Nack,
            Command::CheckModeSupport,
            Command::StartStreaming,
            Command::StopStreaming,
            Command::SetDateTime,
            Command::EnterDfu,
            Command::Reset,
            Command::Other(CMD_SENSOR),
        ];

        for command in commands {
            assert_eq!(Command::from_byte(command.to_byte()), command);
        }
    }

    #[test]
    fn test_unknown_command_is_other() {
        assert_eq!(Command::from_byte(0x76), Command::Other(CMD_ACCELERO_GYRO_INIT));
    }

    #[test]
    fn test_reply_code() {
        assert_eq!(reply_code(CMD_PING), 0x81);
        assert!(is_reply(reply_code(CMD_SENSOR)));
        assert!(!is_reply(CMD_SENSOR));
    }
}
