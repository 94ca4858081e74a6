//! A default implementation of the cryptographic collaborator traits,
//! backed by `crypto-bigint` for RSA modular exponentiation, the `sha1`
//! crate, and `rand`'s OS-backed generator - the same crates
//! `artemist-emvsign` (the closest sibling project in the reference pack)
//! depends on for card-side cryptography.

use crypto_bigint::{
	modular::runtime_mod::{DynResidue, DynResidueParams},
	Encoding,
	U2048,
};
use rand::{Rng, RngCore};

use super::{CryptoRng, RsaModExp, Sha1, Sha1Hasher};

const MODULUS_BYTES: usize = U2048::BYTES;

fn pad_and_parse(bytes: &[u8]) -> Option<U2048> {
	if bytes.len() > MODULUS_BYTES {
		return None;
	}
	let mut buf = [0u8; MODULUS_BYTES];
	buf[MODULUS_BYTES - bytes.len()..].copy_from_slice(bytes);
	Some(U2048::from_be_bytes(buf))
}

/// RSA modular exponentiation over keys up to 2048 bytes - comfortably
/// larger than any modulus EMV Book 2 allows (1984 bits / 248 bytes).
#[derive(Copy, Clone, Debug, Default)]
pub struct SoftwareRsa;

impl RsaModExp for SoftwareRsa {
	fn mod_exp(&self, modulus: &[u8], exponent: &[u8], cipher: &[u8]) -> Option<Vec<u8>> {
		if modulus.is_empty() || cipher.len() > modulus.len() {
			return None;
		}
		let modulus_big = pad_and_parse(modulus)?;
		let cipher_big = pad_and_parse(cipher)?;
		let exponent_big = pad_and_parse(exponent)?;
		if bool::from(modulus_big.is_zero()) {
			return None;
		}

		let params = DynResidueParams::new(&modulus_big);
		let base = DynResidue::new(&cipher_big, params);
		let result = base.pow(&exponent_big).retrieve();

		let result_bytes = result.to_be_bytes();
		Some(result_bytes[MODULUS_BYTES - modulus.len()..].to_vec())
	}
}

/// A streaming SHA-1 hasher wrapping the `sha1` crate's implementation.
pub struct SoftwareSha1(sha1::Sha1);

impl Sha1Hasher for SoftwareSha1 {
	fn update(&mut self, data: &[u8]) {
		sha1::Digest::update(&mut self.0, data);
	}

	fn finish(self: Box<Self>) -> [u8; 20] {
		sha1::Digest::finalize(self.0).into()
	}
}

impl Sha1 for SoftwareSha1 {
	fn new() -> Self {
		Self(sha1::Digest::new())
	}
}

/// A cryptographic RNG backed by the operating system's source, via
/// `rand::rngs::OsRng`.
#[derive(Copy, Clone, Debug, Default)]
pub struct SoftwareRng;

impl CryptoRng for SoftwareRng {
	fn fill_bytes(&mut self, buf: &mut [u8]) {
		rand::rngs::OsRng.fill_bytes(buf);
	}

	fn byte_inclusive(&mut self, min: u8, max: u8) -> u8 {
		rand::rngs::OsRng.gen_range(min..=max)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mod_exp_identity_for_exponent_one() {
		let rsa = SoftwareRsa;
		let modulus = [0xFFu8; 4];
		let exponent = [0x01];
		let cipher = [0x12, 0x34, 0x56, 0x78];
		let result = rsa.mod_exp(&modulus, &exponent, &cipher).unwrap();
		assert_eq!(result.len(), modulus.len());
		assert_eq!(result, cipher);
	}

	#[test]
	fn sha1_digest_matches_known_vector() {
		// SHA-1("abc")
		let digest = SoftwareSha1::digest(b"abc");
		assert_eq!(
			digest,
			[
				0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78,
				0x50, 0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
			]
		);
	}

	#[test]
	fn rng_byte_inclusive_stays_in_range() {
		let mut rng = SoftwareRng;
		for _ in 0..100 {
			let draw = rng.byte_inclusive(1, 99);
			assert!((1..=99).contains(&draw));
		}
	}
}
