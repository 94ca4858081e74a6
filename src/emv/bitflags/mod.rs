//! The fixed-format bitflag-valued EMV tags: Terminal Verification Results,
//! Transaction Status Information, Application Interchange Profile,
//! Terminal Capabilities, and Additional Terminal Capabilities.

pub mod additional_terminal_capabilities;
pub mod aip;
pub mod terminal_capabilities;
pub mod tsi;
pub mod tvr;

pub use additional_terminal_capabilities::AdditionalTerminalCapabilities;
pub use aip::ApplicationInterchangeProfile;
pub use terminal_capabilities::TerminalCapabilities;
pub use tsi::TransactionStatusInformation;
pub use tvr::TerminalVerificationResults;
