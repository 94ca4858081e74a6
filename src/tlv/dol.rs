//! Data Object List parsing and the DOL builder (spec §4.B).
//!
//! Follows the same tag-length-walking idiom as the rest of this crate's
//! TLV code, and `artemist-emvsign`'s AFL/GPO field assembly
//! (`other_examples/13393c2e_...processing_options.rs.rs`) for the "read
//! ahead, then copy/pad/truncate per field" shape.

use super::{
	ber_tlv::decode_tag,
	tag::{element_format, ElementFormat},
	DataSources,
};
use crate::error::ParseError;

/// One `{tag, length}` pair from a Data Object List (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DolEntry {
	pub tag:    u32,
	pub length: usize,
}

/// Parses a DOL buffer (a concatenation of BER tags each followed by a
/// single length byte) into its entries, in order.
///
/// # Errors
/// Returns [`ParseError::NonCompliant`] if a tag is truncated.
pub fn parse_dol(bytes: &[u8]) -> Result<Vec<DolEntry>, ParseError> {
	let mut entries = Vec::new();
	let mut offset = 0usize;
	while offset < bytes.len() {
		let remaining = &bytes[offset..];
		// DOL entries use a one-byte length (spec §4.B), so only the tag
		// portion of the BER-TLV decoder is reused here.
		let (tag, _constructed, tag_len) = decode_tag(remaining)?;
		if tag_len >= remaining.len() {
			return Err(ParseError::NonCompliant);
		}
		let length = remaining[tag_len] as usize;
		entries.push(DolEntry { tag, length });
		offset += tag_len + 1;
	}
	Ok(entries)
}

/// Sums the declared lengths across a parsed DOL, rejecting overflow (spec
/// §4.B).
pub fn compute_data_length(entries: &[DolEntry]) -> Result<usize, ParseError> {
	let mut total = 0usize;
	for entry in entries {
		total = total.checked_add(entry.length).ok_or(ParseError::Overflow)?;
	}
	Ok(total)
}

/// Builds the byte string a DOL describes by pulling each field from the
/// first matching source in `sources`, truncating or padding per spec
/// §4.B, and writing the result into `buf`. Returns the number of bytes
/// written, which always equals `compute_data_length(entries)`.
pub fn build_dol(entries: &[DolEntry], sources: &DataSources<'_>, buf: &mut Vec<u8>) -> usize {
	let start_len = buf.len();
	for entry in entries {
		match sources.find(entry.tag) {
			Some(field) if field.value.len() == entry.length => {
				buf.extend_from_slice(&field.value);
			}
			Some(field) if field.value.len() > entry.length => {
				let value = &field.value;
				match element_format(entry.tag) {
					ElementFormat::Numeric | ElementFormat::CompressedNumeric => {
						// Left-truncate: keep the least-significant bytes.
						let skip = value.len() - entry.length;
						buf.extend_from_slice(&value[skip..]);
					}
					ElementFormat::Binary | ElementFormat::Alphanumeric => {
						buf.extend_from_slice(&value[..entry.length]);
					}
				}
			}
			Some(field) => {
				let value = &field.value;
				let pad_len = entry.length - value.len();
				match element_format(entry.tag) {
					ElementFormat::Numeric | ElementFormat::CompressedNumeric => {
						buf.resize(buf.len() + pad_len, 0x00);
						buf.extend_from_slice(value);
					}
					ElementFormat::Binary => {
						buf.extend_from_slice(value);
						buf.resize(buf.len() + pad_len, 0x00);
					}
					ElementFormat::Alphanumeric => {
						buf.extend_from_slice(value);
						buf.resize(buf.len() + pad_len, 0x20);
					}
				}
			}
			None => {
				buf.resize(buf.len() + entry.length, 0x00);
			}
		}
	}
	buf.len() - start_len
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tlv::{TlvField, TlvList};

	#[test]
	fn parses_single_byte_and_two_byte_tags() {
		// 9F 02 06 (Amount, Authorised, 6 bytes), 5F 2A 02 (currency code, 2
		// bytes)
		let bytes = [0x9F, 0x02, 0x06, 0x5F, 0x2A, 0x02];
		let entries = parse_dol(&bytes).unwrap();
		assert_eq!(entries, vec![
			DolEntry {
				tag:    0x9F02,
				length: 6,
			},
			DolEntry {
				tag:    0x5F2A,
				length: 2,
			},
		]);
		assert_eq!(compute_data_length(&entries).unwrap(), 8);
	}

	#[test]
	fn builds_exact_and_padded_and_missing_fields() {
		let entries = vec![
			DolEntry {
				tag:    0x9F02,
				length: 4,
			},
			DolEntry {
				tag:    0x5F2A,
				length: 2,
			},
			DolEntry {
				tag:    0x9F1A,
				length: 2,
			},
		];
		let mut params = TlvList::new();
		params.push(TlvField::new(0x9F02, vec![0x00, 0x00, 0x01, 0x00]));
		// 1-byte currency code value, needs right-padding with 0x20 since
		// it's treated as Binary (not in the Alphanumeric catalog).
		params.push(TlvField::new(0x5F2A, vec![0x08]));
		let sources = DataSources::new(vec![&params]);

		let mut buf = Vec::new();
		let written = build_dol(&entries, &sources, &mut buf);
		assert_eq!(written, compute_data_length(&entries).unwrap());
		assert_eq!(buf, vec![0x00, 0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00]);
	}

	#[test]
	fn numeric_overflow_left_truncates() {
		let entries = vec![DolEntry {
			tag:    0x9F02,
			length: 2,
		}];
		let mut params = TlvList::new();
		params.push(TlvField::new(0x9F02, vec![0x00, 0x00, 0x01, 0x00]));
		let sources = DataSources::new(vec![&params]);

		let mut buf = Vec::new();
		build_dol(&entries, &sources, &mut buf);
		assert_eq!(buf, vec![0x01, 0x00]);
	}
}
