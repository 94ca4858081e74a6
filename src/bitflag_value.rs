//! The trait implemented by every type generated with [`crate::bitflag_value`].

/// A value whose wire representation is a fixed number of bytes, each with
/// a fixed mask of bits that are actually defined (EMV Book 3 Annex C).
pub trait BitflagValue: for<'a> TryFrom<&'a [u8], Error = crate::error::ParseError> {
	/// The number of bytes the value occupies on the wire.
	const NUM_BYTES: usize;
	/// Per-byte mask of the bits that are actually defined. Bits outside
	/// this mask are ignored on parse and never set on encode.
	const USED_BITS_MASK: &'static [u8];

	/// Re-encode the value to its wire representation.
	fn get_binary_value(&self) -> Vec<u8>;

	/// The value as an unsigned integer, most-significant byte first. Only
	/// meaningful for values that are 8 bytes or fewer.
	fn get_numeric_value(&self) -> u64 {
		self.get_binary_value()
			.iter()
			.fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
	}
}
