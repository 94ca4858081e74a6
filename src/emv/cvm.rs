//! Cardholder Verification Method List (tag `0x8E`, EMV Book 3 §10.5) and
//! the CV Rule byte catalog it's built from (§C3).
//!
//! These are present as typed lookups over the CVM List's bytes rather
//! than anything the session orchestrator itself consults; Cardholder
//! Verification Analysis isn't part of the state machine this kernel
//! drives (spec §4.G lists Processing Restrictions through the first
//! `GENERATE AC`, nothing in between for CVM selection).

use std::cmp::Ordering;

use crate::{error::ParseError, tlv::exact, util::byte_slice_to_u32};

const CV_RULE_LEN: usize = 2;
const LIST_HEADER_LEN: usize = 8;

/// Byte `1` bits `0011_1111` of a CV Rule (EMV Book 3 Annex C3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CvMethod {
	FailCvmProcessing,
	PlaintextPin,
	EncipheredPinOnline,
	PlaintextPinWithSignature,
	EncipheredPin,
	EncipheredPinWithSignature,
	Signature,
	NoCvmRequired,
	/// `3F`: "no CVM performed" (EMV Book 4 p.121) - distinct from
	/// `0b01_1111`'s "not available for use" (EMV Book 3 p.162), kept
	/// separate since both appear in real CVM lists with different meaning.
	NoCvmPerformed,
}

impl CvMethod {
	fn from_code(code: u8) -> Option<Self> {
		match code {
			0b00_0000 => Some(Self::FailCvmProcessing),
			0b00_0001 => Some(Self::PlaintextPin),
			0b00_0010 => Some(Self::EncipheredPinOnline),
			0b00_0011 => Some(Self::PlaintextPinWithSignature),
			0b00_0100 => Some(Self::EncipheredPin),
			0b00_0101 => Some(Self::EncipheredPinWithSignature),
			0b01_1110 => Some(Self::Signature),
			0b01_1111 => Some(Self::NoCvmRequired),
			0b11_1111 => Some(Self::NoCvmPerformed),
			_ => None,
		}
	}
}

/// Byte `2` of a CV Rule (EMV Book 3 Annex C3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CvmCondition {
	Always,
	UnattendedCash,
	NotUnattendedNotManualNotCashback,
	TerminalSupported,
	Manual,
	Cashback,
	InApplicationCurrencyUnderX,
	InApplicationCurrencyOverX,
	InApplicationCurrencyUnderY,
	InApplicationCurrencyOverY,
}

impl CvmCondition {
	fn from_code(code: u8) -> Option<Self> {
		match code {
			0x00 => Some(Self::Always),
			0x01 => Some(Self::UnattendedCash),
			0x02 => Some(Self::NotUnattendedNotManualNotCashback),
			0x03 => Some(Self::TerminalSupported),
			0x04 => Some(Self::Manual),
			0x05 => Some(Self::Cashback),
			0x06 => Some(Self::InApplicationCurrencyUnderX),
			0x07 => Some(Self::InApplicationCurrencyOverX),
			0x08 => Some(Self::InApplicationCurrencyUnderY),
			0x09 => Some(Self::InApplicationCurrencyOverY),
			_ => None,
		}
	}
}

/// One 2-byte CV Rule. `method`/`condition` are `None` for
/// issuer/payment-system-specific codes this kernel doesn't recognise -
/// that isn't a parse error, since unrecognised codes are expected in the
/// wild and the unrecognised-CVM TVR bit (spec §9) is how a caller is meant
/// to react to them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CardholderVerificationRule {
	pub continue_if_unsuccessful: bool,
	pub method:                   Option<CvMethod>,
	pub condition:                Option<CvmCondition>,
}

impl TryFrom<&[u8]> for CardholderVerificationRule {
	type Error = ParseError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		if bytes.len() != CV_RULE_LEN {
			return Err(exact(CV_RULE_LEN, bytes.len()));
		}
		Ok(Self {
			continue_if_unsuccessful: bytes[0] & 0b0100_0000 != 0,
			method:                   CvMethod::from_code(bytes[0] & 0b0011_1111),
			condition:                CvmCondition::from_code(bytes[1]),
		})
	}
}

/// The full CVM List: the `X`/`Y` amount fields (EMV Book 3 §10.5) followed
/// by an ordered sequence of [`CardholderVerificationRule`]s, applied in
/// order until one is satisfied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CardholderVerificationMethodList {
	pub amount_x: u32,
	pub amount_y: u32,
	pub rules:    Vec<CardholderVerificationRule>,
}

impl TryFrom<&[u8]> for CardholderVerificationMethodList {
	type Error = ParseError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		if bytes.len() < LIST_HEADER_LEN {
			return Err(ParseError::ByteCountIncorrect {
				r#type:   Ordering::Greater,
				expected: LIST_HEADER_LEN,
				found:    bytes.len(),
			});
		}
		let rule_bytes = &bytes[LIST_HEADER_LEN..];
		if rule_bytes.len() % CV_RULE_LEN != 0 {
			return Err(ParseError::NonCompliant);
		}
		let rules = rule_bytes
			.chunks_exact(CV_RULE_LEN)
			.map(CardholderVerificationRule::try_from)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			amount_x: byte_slice_to_u32(&bytes[0..4])?,
			amount_y: byte_slice_to_u32(&bytes[4..8])?,
			rules,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_single_signature_rule() {
		let mut bytes = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
		bytes.extend_from_slice(&[0b0101_1110, 0x00]);
		let list = CardholderVerificationMethodList::try_from(bytes.as_slice()).unwrap();
		assert_eq!(list.rules.len(), 1);
		assert!(!list.rules[0].continue_if_unsuccessful);
		assert_eq!(list.rules[0].method, Some(CvMethod::Signature));
		assert_eq!(list.rules[0].condition, Some(CvmCondition::Always));
	}

	#[test]
	fn unrecognised_codes_parse_as_none_rather_than_error() {
		let rule = CardholderVerificationRule::try_from([0x2A, 0xFF].as_slice()).unwrap();
		assert_eq!(rule.method, None);
		assert_eq!(rule.condition, None);
	}

	#[test]
	fn rejects_short_header() {
		assert_eq!(
			CardholderVerificationMethodList::try_from([0u8; 4].as_slice()),
			Err(ParseError::ByteCountIncorrect {
				r#type:   Ordering::Greater,
				expected: LIST_HEADER_LEN,
				found:    4,
			})
		);
	}

	#[test]
	fn rejects_rule_bytes_not_a_multiple_of_two() {
		let mut bytes = vec![0u8; LIST_HEADER_LEN];
		bytes.push(0x00);
		assert_eq!(
			CardholderVerificationMethodList::try_from(bytes.as_slice()),
			Err(ParseError::NonCompliant)
		);
	}
}
