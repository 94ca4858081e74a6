//! The error types used throughout the crate.
//!
//! Two families exist, matching the propagation policy in the EMV Book 4
//! terminal requirements this kernel implements: malformed wire data becomes
//! a [`ParseError`], while programmer faults (bad configuration, invalid
//! arguments, internal invariants) become a [`KernelError`]. The two are
//! never conflated - a parse failure partway through reading card data is
//! translated into a business [`crate::emv::Outcome`] by the
//! orchestrator, not reported back to the caller as a [`KernelError`].

// Uses
use std::{
	cmp::Ordering,
	fmt::{Display, Formatter, Result as FmtResult},
};

/// An error encountered while parsing EMV wire data: BER-TLV, a Data Object
/// List, or a fixed-format tag value (TVR, TSI, AIP, etc.).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
	/// A fixed-size value was given the wrong number of bytes.
	ByteCountIncorrect {
		r#type:   Ordering,
		expected: usize,
		found:    usize,
	},
	/// The BER-TLV encoding itself is malformed (truncated tag, truncated
	/// length, value longer than the remaining buffer).
	NonCompliant,
	/// The encoding is technically valid but exceeds what this
	/// implementation supports (e.g. a length requiring more than 4 bytes).
	Unsupported,
	/// A tag or enumerated value was not recognised.
	Unrecognised,
	/// A value failed a bitflag-valued tag's structural checks but isn't a
	/// simple byte-count mismatch.
	NonCompliantValue,
	/// A numeric (`n`) or compressed-numeric (`cn`) field contained a
	/// non-BCD nibble where one was required.
	InvalidBcdDigit,
	/// An integer computation would have overflowed.
	Overflow,
}

impl Display for ParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::ByteCountIncorrect {
				r#type,
				expected,
				found,
			} => {
				let comparison = match r#type {
					Ordering::Less => "fewer than",
					Ordering::Equal => "exactly",
					Ordering::Greater => "at least",
				};
				write!(
					f,
					"wrong number of bytes: expected {comparison} {expected}, found {found}"
				)
			}
			Self::NonCompliant => f.write_str("data does not comply with the BER-TLV encoding"),
			Self::Unsupported => f.write_str("data uses an encoding this kernel doesn't support"),
			Self::Unrecognised => f.write_str("value was not recognised"),
			Self::NonCompliantValue => f.write_str("value failed structural validation"),
			Self::InvalidBcdDigit => f.write_str("non-BCD nibble found where a digit was expected"),
			Self::Overflow => f.write_str("integer overflow while computing a length or offset"),
		}
	}
}

impl std::error::Error for ParseError {}

/// A programmer-fault error: something the *caller* of this library got
/// wrong, as opposed to something the card or transaction data did. Never
/// derived from card behaviour - see [`ParseError`] and
/// [`crate::session::Outcome`] for that.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KernelError {
	/// An out-of-memory condition or a cryptographic primitive failure
	/// (RSA/SHA-1 collaborator returned an error the kernel can't recover
	/// from).
	Internal,
	/// A null/empty/oversized argument was passed to a public entry point
	/// (e.g. an AID longer than 16 bytes).
	InvalidParameter,
	/// The terminal or transaction-parameter configuration is missing a
	/// mandatory field, or a field has the wrong length (spec §6.4).
	InvalidConfig,
}

impl Display for KernelError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(match self {
			Self::Internal => "internal error",
			Self::InvalidParameter => "invalid parameter",
			Self::InvalidConfig => "invalid or incomplete terminal configuration",
		})
	}
}

impl std::error::Error for KernelError {}

impl From<ParseError> for KernelError {
	/// Card data that fails to parse where no continuable path exists is an
	/// internal error from the caller's perspective - the orchestrator is
	/// expected to intercept [`ParseError`] before it reaches this
	/// conversion wherever a continuable `Outcome` applies instead.
	fn from(_: ParseError) -> Self {
		Self::Internal
	}
}
