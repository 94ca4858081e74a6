//! The IAC value for `Online`.
//!
//! From EMV Book 3:
//! > The `Issuer Action Code - Online` specifies the conditions that cause
//! > a transaction to be transmitted online.

use crate::{emv::bitflags::TerminalVerificationResults, error::ParseError};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IssuerActionCodeOnline {
	pub tvr: TerminalVerificationResults,
}

impl Default for IssuerActionCodeOnline {
	/// From EMV Book 3: if absent, a default value with all bits set to `0`
	/// is used.
	fn default() -> Self {
		Self {
			tvr: TerminalVerificationResults::try_from([0x00u8; 5].as_slice())
				.expect("all-zeroes is always a valid TVR value"),
		}
	}
}

impl TryFrom<&[u8]> for IssuerActionCodeOnline {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::IssuerActionCodeOnline;

	#[test]
	fn default_value_is_ok() {
		IssuerActionCodeOnline::default();
	}
}
