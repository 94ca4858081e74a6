//! The IAC value for `Denial`.
//!
//! From EMV Book 3:
//! > The `Issuer Action Code - Denial` specifies the conditions that cause
//! > the denial of a transaction without attempting to go online.

use crate::{emv::bitflags::TerminalVerificationResults, error::ParseError};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IssuerActionCodeDenial {
	pub tvr: TerminalVerificationResults,
}

impl Default for IssuerActionCodeDenial {
	/// From EMV Book 3: if absent, a default value with all bits set to `0`
	/// is used (no additional denial conditions).
	fn default() -> Self {
		Self {
			tvr: TerminalVerificationResults::try_from([0x00u8; 5].as_slice())
				.expect("all-zeroes is always a valid TVR value"),
		}
	}
}

impl TryFrom<&[u8]> for IssuerActionCodeDenial {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::IssuerActionCodeDenial;

	#[test]
	fn default_value_is_ok() {
		IssuerActionCodeDenial::default();
	}
}
