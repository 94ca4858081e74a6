//! Convenience macros for defining the small closed enumerations and
//! bitflag-valued tags that EMV is built out of.
//!
//! The display-breakdown half of each macro (which rendered a
//! human-readable bit-by-bit explanation for a CLI) is dropped, since
//! pretty-printing is a UI-layer concern this kernel doesn't own (spec §1).
//! What's kept is the parsing half: `TryFrom<&[u8]>`/`TryFrom<u8>`, the
//! binary round-trip, and `Display` for logging.

/// A non-composite enum that doesn't assign each `value` to the variant's
/// discriminant, so multiple `value`s (or ranges) may map to one variant.
/// Fallible: unmatched values produce an error.
#[macro_export]
macro_rules! enum_no_repr_fallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty, $error_type:ty, {$error_fn:expr} {
			$(
				$(#[doc = $doc:expr])?
				$variant:ident = $pattern:pat => $string:literal,
			)*
		}
	) => {
		$(#[$outer])*
		$visibility enum $name {
			$(
				$(#[doc = $doc])?
				$variant,
			)*
		}

		impl TryFrom<$typ> for $name {
			type Error = $error_type;

			fn try_from(value: $typ) -> Result<Self, $error_type> {
				#[allow(clippy::redundant_closure_call)]
				match value {
					$($pattern => Ok(Self::$variant),)*
					_ => Err(($error_fn)(value)),
				}
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
	};
}

/// Like [`enum_no_repr_fallible`], but every `value` gets assigned to the
/// variant's discriminant, so there must be exactly one `value` per
/// variant. Fallible, since the source byte may be out of range.
#[macro_export]
macro_rules! enum_repr_fallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty, $error_type:ty, {$error_fn:expr} {
			$(
				$(#[doc = $doc:expr])?
				$variant:ident = $value:literal => $string:literal,
			)*
		}
	) => {
		#[repr($typ)]
		$(#[$outer])*
		$visibility enum $name {
			$(
				$(#[doc = $doc])?
				$variant = $value,
			)*
		}

		impl TryFrom<$typ> for $name {
			type Error = $error_type;

			fn try_from(value: $typ) -> Result<Self, $error_type> {
				#[allow(clippy::redundant_closure_call)]
				match value {
					$($value => Ok(Self::$variant),)*
					_ => Err(($error_fn)(value)),
				}
			}
		}

		impl From<$name> for $typ {
			fn from(value: $name) -> Self {
				value as $typ
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
	};
}

/// A value stored in a bitflag-style format per the EMV Books (TVR, TSI,
/// AIP, Terminal Capabilities, ...): a fixed number of bytes, each with a
/// fixed mask of bits that are actually defined.
#[macro_export]
macro_rules! bitflag_value {
	(
		$(#[$outer:meta])*
		$visibility:vis struct $name:ident: $byte_count:literal {
			$(
				$byte_num:literal {
					$(
						$(#[doc = $doc:expr])?
						$field_visibility:vis $field:ident: $typ:tt = $field_tt:tt => $string:literal,
					)*
				}
			)*
		}
	) => {
		$(#[$outer])*
		$visibility struct $name {
			$($(
				$(#[doc = $doc])?
				#[doc = $string]
				$field_visibility $field: $typ,
			)*)*
		}

		impl TryFrom<&[u8]> for $name {
			type Error = $crate::error::ParseError;

			fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
				use std::cmp::Ordering;

				use $crate::bitflag_value::BitflagValue;

				if raw_bytes.len() != Self::NUM_BYTES {
					return Err($crate::error::ParseError::ByteCountIncorrect {
						r#type: Ordering::Equal,
						expected: Self::NUM_BYTES,
						found: raw_bytes.len(),
					});
				}
				let mut bytes = [0u8; $byte_count];
				for (index, byte) in raw_bytes.iter().enumerate() {
					bytes[index] = byte & Self::USED_BITS_MASK[index];
				}

				#[allow(unused)]
				Ok(Self {
					$($(
						$field: bitflag_value!(@parse: $typ, bytes, $byte_num, $field_tt),
					)*)*
				})
			}
		}

		impl $crate::bitflag_value::BitflagValue for $name {
			const NUM_BYTES: usize = $byte_count;
			const USED_BITS_MASK: &'static [u8] = &[
				$(
					$(
						bitflag_value!(@byte_bits: $field_tt) |
					)* 0b0000_0000,
				)*
			];

			fn get_binary_value(&self) -> Vec<u8> {
				vec![
					$(
						$(
							bitflag_value!(@field_binary_repr: self, $field, $typ, $field_tt) |
						)* 0b0000_0000,
					)*
				]
			}
		}
	};

	// Pulling the binary literal out of a shifted token tree.
	(@byte_bits: $byte_bits:literal) => { $byte_bits };
	(@byte_bits: ($byte_bits:literal >> $shift_bit_count:literal)) => { $byte_bits };

	// Parsing.
	(@parse: bool, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		$byte_bits & $bytes[$byte_num] > 0
	};
	(@parse: u8, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		($byte_bits & $bytes[$byte_num]) as u8
	};
	(@parse: u8, $bytes:ident, $byte_num:literal, ($byte_bits:literal >> $shift:literal)) => {
		(($byte_bits & $bytes[$byte_num]) >> $shift) as u8
	};
	(@parse: $typ:ty, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		<$typ>::try_from($byte_bits & $bytes[$byte_num])?
	};
	(@parse: $typ:ty, $bytes:ident, $byte_num:literal, ($byte_bits:literal >> $shift:literal)) => {
		<$typ>::try_from(($byte_bits & $bytes[$byte_num]) >> $shift)?
	};

	// Binary round-trip.
	(@field_binary_repr: $self:ident, $field:ident, bool, $byte_bits:literal) => {
		if $self.$field { $byte_bits } else { 0b0000_0000 }
	};
	(@field_binary_repr: $self:ident, $field:ident, $typ:ty, $byte_bits:literal) => {
		u8::from($self.$field.clone())
	};
	(@field_binary_repr: $self:ident, $field:ident, $typ:ty, ($byte_bits:literal >> $shift:literal)) => {
		u8::from($self.$field.clone()) << $shift
	};
}
