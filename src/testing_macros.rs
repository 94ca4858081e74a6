//! Convenience macros for testing the small closed enumerations and
//! bitflag-valued tags defined with [`crate::bitflag_value`]/
//! [`crate::enum_repr_fallible`] and friends.
//!
//! `bitflag_display_bits!` is dropped along with the display-breakdown
//! machinery it exercised.

#![cfg(test)]

#[macro_export]
macro_rules! wrong_byte_count {
	($typ:path, $byte_count:literal) => {
		#[doc = concat!("Ensures an error is returned if the wrong number of bytes are provided when parsing [`", stringify!($typ), "`].")]
		#[test]
		fn wrong_byte_count() {
			let expected = Err($crate::error::ParseError::ByteCountIncorrect {
				r#type:   std::cmp::Ordering::Equal,
				expected: $byte_count,
				found:    $byte_count + 1,
			});
			let result = <$typ>::try_from([0x00; $byte_count + 1].as_slice());

			assert_eq!(expected, result);
		}
	};
}

#[macro_export]
macro_rules! bitflag_unique_values {
	($typ:path, $byte_count:literal) => {
		#[doc = concat!("Ensures no two bit values return the same final struct value for [`", stringify!($typ), "`].")]
		#[test]
		fn bitflag_unique_values() {
			use $crate::bitflag_value::BitflagValue;

			// Get the empty result to compare against
			let empty_result = <$typ>::try_from([0x00; $byte_count].as_slice())
				.expect("error checking will be done separately");

			// Step through every bit and confirm that each one has a unique value
			let mut results_hash_set = std::collections::HashSet::new();
			for byte_index in 0..$byte_count {
				for bit_index in 0..$crate::util::BITS_PER_BYTE {
					let mut testing_vec = vec![0x00u8; $byte_count];
					testing_vec[byte_index] |= 0b1u8 << (bit_index as u8);

					let result = <$typ>::try_from(testing_vec.as_slice())
						.expect("error checking will be done separately");
					// If the bit we're testing is something with no meaning here, there's
					// nothing to test
					if result == empty_result {
						continue;
					}

					assert_eq!(
						testing_vec.as_slice(),
						result.get_binary_value().as_slice(),
						"the bytes retrieved later should match the input"
					);

					assert!(
						results_hash_set.insert(result.clone()),
						"two different bit inputs led to the same bitflag result: {:?}",
						result
					);
				}
			}
		}
	};
}

#[macro_export]
macro_rules! enum_byte_slice_result_matches_true_value_result {
	($typ:path, $byte_count:literal, $test_true_value:expr, $test_byte_slice:expr) => {
		#[doc = concat!("Ensures that the byte slice parser returns the same value as the parser of the \"true\" format of the data, for [`", stringify!($typ), "`].")]
		#[test]
		fn enum_byte_slice_result_matches_true_value_result() {
			let expected = <$typ>::try_from($test_true_value);
			let result = <$typ>::try_from($test_byte_slice);

			assert_eq!(expected, result);
		}
	};
}
