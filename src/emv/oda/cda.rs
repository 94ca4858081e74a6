//! Combined Data Authentication (spec §4.E, EMV Book 2 §6.6).
//!
//! CDA recovers the ICC public key the same way DDA does, but performs no
//! `INTERNAL AUTHENTICATE` of its own - the signature instead rides inside
//! the first `GENERATE AC` response (tag `9F4B`) and is verified after
//! that exchange, binding the ODA record buffer, the PDOL and CDOL1 data,
//! and the Unpredictable Number together (spec §4.E, §4.G).

use log::warn;

use super::{capk::CaPublicKey, certificate_not_expired, identifier_matches_pan, recover_certificate, RecoveredKey};
use crate::{crypto::{constant_time_eq, RsaModExp}, emv::bitflags::TerminalVerificationResults};

const ICC_IDENTIFIER_LEN: usize = 10;

pub struct CdaCertInput<'a> {
	pub icc_certificate:  &'a [u8],
	pub icc_remainder:    &'a [u8],
	pub icc_exponent:     &'a [u8],
	pub pan:              &'a [u8],
	pub transaction_date: &'a [u8],
}

/// Recovers the ICC public key from its certificate at ODA time, ahead of
/// the first `GENERATE AC` (spec §4.E "CDA description-level": "no
/// INTERNAL AUTHENTICATE call").
pub fn recover_icc_key<R: RsaModExp>(
	rsa: &R,
	issuer_key: &RecoveredKey,
	input: &CdaCertInput,
	tvr: &mut TerminalVerificationResults,
	digest_of: impl Fn(&[u8]) -> [u8; 20],
) -> Option<RecoveredKey> {
	let result = try_recover_icc_key(rsa, issuer_key, input, digest_of);
	if result.is_none() {
		warn!("CDA failed: ICC public key certificate recovery did not succeed");
		tvr.cda_failed = true;
	}
	result
}

fn try_recover_icc_key<R: RsaModExp>(
	rsa: &R,
	issuer_key: &RecoveredKey,
	input: &CdaCertInput,
	digest_of: impl Fn(&[u8]) -> [u8; 20],
) -> Option<RecoveredKey> {
	let signer_key = CaPublicKey {
		modulus:  issuer_key.modulus.clone(),
		exponent: issuer_key.exponent.clone(),
	};
	let cert = recover_certificate(rsa, &signer_key, input.icc_certificate, ICC_IDENTIFIER_LEN)?;

	if !identifier_matches_pan(&cert.identifier, input.pan) {
		return None;
	}
	if !certificate_not_expired(cert.expiration, input.transaction_date) {
		return None;
	}

	let mut modulus = cert.leftmost_modulus.clone();
	modulus.extend_from_slice(input.icc_remainder);
	if modulus.len() != cert.modulus_len {
		return None;
	}
	if cert.exponent_len != input.icc_exponent.len() {
		return None;
	}
	let exponent = input.icc_exponent.to_vec();

	let mut hashed = Vec::new();
	hashed.push(0x04);
	hashed.extend_from_slice(&cert.identifier);
	hashed.extend_from_slice(&cert.expiration);
	hashed.extend_from_slice(&cert.serial_number);
	hashed.push(0x01);
	hashed.push(0x01);
	hashed.push(cert.modulus_len as u8);
	hashed.push(cert.exponent_len as u8);
	hashed.extend_from_slice(&cert.leftmost_modulus);
	hashed.extend_from_slice(input.icc_remainder);
	hashed.extend_from_slice(&exponent);
	if !constant_time_eq(&digest_of(&hashed), &cert.embedded_hash) {
		return None;
	}

	Some(RecoveredKey { modulus, exponent })
}

/// Verifies the Signed Dynamic Application Data carried in tag `9F4B` of
/// the first `GENERATE AC` response, recovering it with `icc_key` and
/// binding the ODA record buffer, PDOL data, CDOL1 data, and the
/// Unpredictable Number together (spec §4.E, §4.G).
///
/// On success, returns the 20-byte digest embedded in the signature so the
/// orchestrator can compare it against the card's own transaction data
/// hash, along with any fields the card chose to push into the ICC list
/// rather than send in the clear (tags `9F4C` ICC Dynamic Number, and the
/// echoed Application Cryptogram/ATC already present in the GENERATE AC
/// response outside this signature).
pub fn verify_signed_dynamic_data<R: RsaModExp>(
	rsa: &R,
	icc_key: &RecoveredKey,
	signed_dynamic_data: &[u8],
	oda_record_buf: &[u8],
	pdol_data: &[u8],
	cdol1_data: &[u8],
	unpredictable_number: &[u8],
	tvr: &mut TerminalVerificationResults,
	digest_of: impl Fn(&[u8]) -> [u8; 20],
) -> bool {
	let ok = try_verify_signed_dynamic_data(
		rsa,
		icc_key,
		signed_dynamic_data,
		oda_record_buf,
		pdol_data,
		cdol1_data,
		unpredictable_number,
		digest_of,
	);
	if !ok {
		warn!("CDA failed: signed dynamic data verification did not succeed");
		tvr.cda_failed = true;
	}
	ok
}

fn try_verify_signed_dynamic_data<R: RsaModExp>(
	rsa: &R,
	icc_key: &RecoveredKey,
	signed_dynamic_data: &[u8],
	oda_record_buf: &[u8],
	pdol_data: &[u8],
	cdol1_data: &[u8],
	unpredictable_number: &[u8],
	digest_of: impl Fn(&[u8]) -> [u8; 20],
) -> bool {
	if signed_dynamic_data.len() != icc_key.modulus.len() {
		return false;
	}
	let Some(decrypted) = rsa.mod_exp(&icc_key.modulus, &icc_key.exponent, signed_dynamic_data) else {
		return false;
	};
	if decrypted.first().copied() != Some(0x6A) || decrypted.last().copied() != Some(0xBC) {
		return false;
	}
	if decrypted.get(1).copied() != Some(0x05) {
		return false;
	}

	let hash_len = 20;
	if decrypted.len() < 1 + 1 + 1 + 8 + hash_len + 1 {
		return false;
	}
	let embedded_hash = &decrypted[decrypted.len() - 1 - hash_len..decrypted.len() - 1];

	let dynamic_len = decrypted[2] as usize;
	let dynamic_end = 3 + dynamic_len;
	if decrypted.len() < dynamic_end {
		return false;
	}
	let dynamic_data = &decrypted[3..dynamic_end];

	let mut signed_hashed = Vec::new();
	signed_hashed.push(0x05);
	signed_hashed.push(decrypted[2]);
	signed_hashed.extend_from_slice(dynamic_data);
	signed_hashed.extend_from_slice(oda_record_buf);
	signed_hashed.extend_from_slice(pdol_data);
	signed_hashed.extend_from_slice(cdol1_data);
	signed_hashed.extend_from_slice(unpredictable_number);

	constant_time_eq(&digest_of(&signed_hashed), embedded_hash)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{crypto::software::SoftwareRsa, emv::bitflags::TerminalVerificationResults};

	fn digest(data: &[u8]) -> [u8; 20] {
		use crate::crypto::{software::SoftwareSha1, Sha1};
		SoftwareSha1::digest(data)
	}

	#[test]
	fn cda_fails_cleanly_on_length_mismatch() {
		let rsa = SoftwareRsa;
		let icc_key = RecoveredKey {
			modulus:  vec![0x01; 8],
			exponent: vec![0x01],
		};
		let mut tvr = TerminalVerificationResults::try_from([0x00u8; 5].as_slice()).unwrap();
		let ok = verify_signed_dynamic_data(
			&rsa,
			&icc_key,
			&[0u8; 4],
			&[],
			&[],
			&[],
			&[],
			&mut tvr,
			digest,
		);
		assert!(!ok);
		assert!(tvr.cda_failed);
	}
}
