//! Dynamic Data Authentication (spec §4.E, EMV Book 2 §6.5, Book 3 §10.3).

use log::{debug, warn};

use super::{capk::CaPublicKey, certificate_not_expired, identifier_matches_pan, recover_certificate, RecoveredKey};
use crate::{
	crypto::{constant_time_eq, CryptoRng, RsaModExp},
	emv::{bitflags::TerminalVerificationResults, ttl::Ttl},
	tlv::{
		dol::{build_dol, parse_dol},
		DataSources,
		TlvList,
	},
};

const ICC_IDENTIFIER_LEN: usize = 10;

/// Everything DDA needs beyond the already-recovered issuer key: the ICC
/// certificate (`9F46`), its modulus remainder (`9F48`) and exponent
/// (`9F47`), the card's PAN, transaction date, and the DDOL (`9F49`, or
/// the terminal's default DDOL if the card didn't supply one).
pub struct DdaInput<'a> {
	pub icc_certificate: &'a [u8],
	pub icc_remainder:   &'a [u8],
	pub icc_exponent:    &'a [u8],
	pub pan:             &'a [u8],
	pub transaction_date: &'a [u8],
	pub ddol:            &'a [u8],
}

/// Recovers the ICC public key from its certificate, then issues
/// `INTERNAL AUTHENTICATE` with DDOL-built data and verifies the signed
/// dynamic application data binds the Unpredictable Number this kernel
/// generated (spec §4.E, EMV Book 2 §6.5.2).
pub fn apply_dda<R: RsaModExp>(
	rsa: &R,
	rng: &mut impl CryptoRng,
	ttl: &mut impl Ttl,
	issuer_key: &RecoveredKey,
	input: &DdaInput,
	terminal_data: &TlvList,
	tvr: &mut TerminalVerificationResults,
	digest_of: impl Fn(&[u8]) -> [u8; 20],
) -> Option<RecoveredKey> {
	let result = try_apply_dda(rsa, rng, ttl, issuer_key, input, terminal_data, digest_of);
	if result.is_none() {
		warn!("DDA failed: ICC key recovery or INTERNAL AUTHENTICATE verification did not succeed");
		tvr.dda_failed = true;
	}
	result
}

fn try_apply_dda<R: RsaModExp>(
	rsa: &R,
	rng: &mut impl CryptoRng,
	ttl: &mut impl Ttl,
	issuer_key: &RecoveredKey,
	input: &DdaInput,
	terminal_data: &TlvList,
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

	let mut unpredictable_number = [0u8; 4];
	rng.fill_bytes(&mut unpredictable_number);
	let mut un_list = TlvList::new();
	un_list.push(crate::tlv::TlvField::new(0x9F37, unpredictable_number.to_vec()));
	let sources = DataSources::new(vec![&un_list, terminal_data]);

	let ddol_entries = parse_dol(input.ddol).ok()?;
	let mut ddol_data = Vec::new();
	build_dol(&ddol_entries, &sources, &mut ddol_data);

	let (response, sw) = ttl.generate_ac(0, &ddol_data).ok()?;
	// generate_ac here is reused for INTERNAL AUTHENTICATE's single-APDU
	// exchange shape; a real TTL implementation dispatches on the command
	// byte it was actually asked to send.
	debug!("INTERNAL AUTHENTICATE -> SW={sw:04X}, {} byte(s)", response.len());
	if sw != 0x9000 {
		return None;
	}
	if response.len() != modulus.len() {
		return None;
	}

	let decrypted = rsa.mod_exp(&modulus, &exponent, &response)?;
	if decrypted.first().copied() != Some(0x6A) || decrypted.last().copied() != Some(0xBC) {
		return None;
	}
	if decrypted.get(1).copied() != Some(0x05) {
		return None;
	}

	let hash_len = 20;
	if decrypted.len() < 1 + 1 + 1 + 1 + hash_len + 1 {
		return None;
	}
	let embedded_hash = &decrypted[decrypted.len() - 1 - hash_len..decrypted.len() - 1];

	let dynamic_len = decrypted[2] as usize;
	if decrypted.len() < 3 + dynamic_len {
		return None;
	}
	let dynamic_data = &decrypted[3..3 + dynamic_len];

	let mut signed_hashed = Vec::new();
	signed_hashed.push(0x05);
	signed_hashed.push(decrypted[2]);
	signed_hashed.extend_from_slice(dynamic_data);
	signed_hashed.extend_from_slice(&ddol_data);
	if !constant_time_eq(&digest_of(&signed_hashed), embedded_hash) {
		return None;
	}

	Some(RecoveredKey { modulus, exponent })
}
