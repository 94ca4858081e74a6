//! Component H: small field helpers shared by TAL, ODA, and risk management
//! - the Application File Locator iterator and the handful of byte-layout
//!   helpers the rest of the kernel builds on.

use crate::{error::ParseError, tlv::exact};

/// One 4-byte entry of the Application File Locator (tag `0x94`): spec
/// §6.5's `sfi_shifted | first | last | oda_count` layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AflEntry {
	pub sfi:              u8,
	pub first_record:     u8,
	pub last_record:      u8,
	pub oda_record_count: u8,
}

impl TryFrom<&[u8]> for AflEntry {
	type Error = ParseError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		if bytes.len() != 4 {
			return Err(exact(4, bytes.len()));
		}
		let sfi = bytes[0] >> 3;
		if !(1..=30).contains(&sfi) {
			return Err(ParseError::NonCompliantValue);
		}
		let first_record = bytes[1];
		let last_record = bytes[2];
		let oda_record_count = bytes[3];
		if last_record < first_record
			|| oda_record_count > last_record - first_record + 1
		{
			return Err(ParseError::NonCompliantValue);
		}
		Ok(Self {
			sfi,
			first_record,
			last_record,
			oda_record_count,
		})
	}
}

impl AflEntry {
	/// The number of records this entry covers (`last - first + 1`).
	pub fn record_count(&self) -> u8 {
		self.last_record - self.first_record + 1
	}
}

/// Parses the Application File Locator (spec §3, §6.5): a sequence of
/// 4-byte entries, whose total length must therefore be a multiple of 4.
pub fn parse_afl(bytes: &[u8]) -> Result<Vec<AflEntry>, ParseError> {
	if bytes.len() % 4 != 0 {
		return Err(ParseError::NonCompliant);
	}
	bytes.chunks_exact(4).map(AflEntry::try_from).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scenario_s3_afl_iterator() {
		let entries = parse_afl(&[0x08, 0x01, 0x01, 0x00]).unwrap();
		assert_eq!(entries, vec![AflEntry {
			sfi:              1,
			first_record:     1,
			last_record:      1,
			oda_record_count: 0,
		}]);
	}

	#[test]
	fn rejects_non_multiple_of_four() {
		assert_eq!(parse_afl(&[0x08, 0x01, 0x01]), Err(ParseError::NonCompliant));
	}

	#[test]
	fn rejects_oda_count_exceeding_range() {
		assert_eq!(
			AflEntry::try_from([0x08, 0x01, 0x01, 0x02].as_slice()),
			Err(ParseError::NonCompliantValue)
		);
	}
}
