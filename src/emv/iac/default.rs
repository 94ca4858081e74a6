//! The IAC value for `Default`.
//!
//! From EMV Book 3:
//! > Together, the `Issuer Action Code - Default` and the `Terminal Action
//! > Code - Default` specify the conditions that cause the transaction to be
//! > rejected if it might have been approved online but the terminal is for
//! > any reason unable to process the transaction online.
//!
//! and
//!
//! > If any bit in `Issuer Action Code - Default` or the `Terminal Action
//! > Code - Default` and the corresponding bit in the TVR are both set to
//! > `1`, the transaction shall be rejected and the terminal shall request
//! > an `AAC` to complete processing.

use crate::{emv::bitflags::TerminalVerificationResults, error::ParseError};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IssuerActionCodeDefault {
	pub tvr: TerminalVerificationResults,
}

impl Default for IssuerActionCodeDefault {
	/// From EMV Book 3:
	/// > If the `Issuer Action Code - Default` does not exist, a default
	/// > value with all bits set to `1` shall be used in its place.
	fn default() -> Self {
		Self {
			tvr: TerminalVerificationResults::try_from([0xFFu8; 5].as_slice())
				.expect("all-ones is always a valid TVR value"),
		}
	}
}

impl TryFrom<&[u8]> for IssuerActionCodeDefault {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::IssuerActionCodeDefault;
	use crate::emv::bitflags::TerminalVerificationResults;

	/// Ensures the parsed value here matches the same parsed value in the
	/// TVR.
	#[test]
	fn iac_matches_tvr() {
		let raw_value = [0xFF; 5];
		let expected = TerminalVerificationResults::try_from(raw_value.as_slice())
			.expect("not testing the TVR code here");
		let result = IssuerActionCodeDefault::try_from(raw_value.as_slice())
			.expect("any errors should already be tested by the TVR testing");

		assert_eq!(expected, result.tvr);
	}

	#[test]
	fn default_value_is_ok() {
		IssuerActionCodeDefault::default();
	}
}
