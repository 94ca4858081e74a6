//! The cryptographic collaborator traits (spec §6.2): RSA modular
//! exponentiation, SHA-1, cryptographic randomness, constant-time compare,
//! and buffer cleansing. The raw primitives are external collaborators
//! per spec §1; [`software`] provides one concrete, pack-grounded
//! implementation so the kernel is usable without a caller having to
//! write their own from scratch.

pub mod software;

/// `rsa_mod_exp(modulus, exponent, cipher) -> plaintext` (spec §6.2).
/// Implementations may assume `modulus.len() == exponent.len() ==
/// cipher.len()` is not required by the caller - only that the result's
/// length matches the modulus length. Returns `None` on any internal
/// failure (mapped to [`crate::error::KernelError::Internal`] by callers).
pub trait RsaModExp {
	fn mod_exp(&self, modulus: &[u8], exponent: &[u8], cipher: &[u8]) -> Option<Vec<u8>>;
}

/// A streaming SHA-1 hasher (spec §6.2: `sha1_init/update/finish`).
pub trait Sha1Hasher {
	fn update(&mut self, data: &[u8]);
	fn finish(self: Box<Self>) -> [u8; 20];
}

/// Constructs a fresh [`Sha1Hasher`] and produces the 20-byte digest of
/// `data` in one call, for the common case where the whole input is
/// already assembled.
pub trait Sha1: Sha1Hasher + Sized {
	fn new() -> Self;

	fn digest(data: &[u8]) -> [u8; 20]
	where
		Self: 'static,
	{
		let mut hasher = Self::new();
		hasher.update(data);
		Box::new(hasher).finish()
	}
}

/// A cryptographic random source (spec §6.2: `rand`/`rand_byte_inclusive`).
pub trait CryptoRng {
	fn fill_bytes(&mut self, buf: &mut [u8]);

	/// A uniformly distributed byte in `[min, max]` inclusive, used by the
	/// random-online-selection draw in risk management (spec §4.F) and to
	/// generate the Unpredictable Number.
	fn byte_inclusive(&mut self, min: u8, max: u8) -> u8;
}

/// Compares two byte slices in constant time with respect to their
/// content (spec §6.2: `memcmp_constant_time`). Returns `false` immediately
/// on a length mismatch, since length is not considered secret here.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	let mut diff = 0u8;
	for (x, y) in a.iter().zip(b.iter()) {
		diff |= x ^ y;
	}
	diff == 0
}

/// Overwrites a buffer with zeroes before it's dropped (spec §6.2:
/// `cleanse`), used on every buffer that held cryptographic material or PAN
/// fragments (spec §5 "Cancellation").
pub fn cleanse(buf: &mut [u8]) {
	for byte in buf.iter_mut() {
		unsafe { std::ptr::write_volatile(byte, 0) };
	}
	std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn constant_time_eq_rejects_length_mismatch() {
		assert!(!constant_time_eq(&[1, 2, 3], &[1, 2]));
	}

	#[test]
	fn constant_time_eq_matches_equal_content() {
		assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
	}

	#[test]
	fn cleanse_zeroes_buffer() {
		let mut buf = vec![0xAAu8; 16];
		cleanse(&mut buf);
		assert_eq!(buf, vec![0u8; 16]);
	}
}
