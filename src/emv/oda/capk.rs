//! The Certification Authority Public Key (CAPK) store (spec §5: "the only
//! module-level read-only state"; §1: out of scope as a concrete store,
//! referenced only by trait interface).

/// One CA public key: modulus and exponent, identified externally by
/// `(RID, index)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaPublicKey {
	pub modulus:  Vec<u8>,
	pub exponent: Vec<u8>,
}

/// A read-only lookup of CA public keys by Registered Identifier and CA
/// key index (tag `0x8F`). Implementations own wherever the keys actually
/// live; this kernel only calls through the trait (spec §5).
pub trait CaPublicKeyStore {
	fn lookup(&self, rid: &[u8], index: u8) -> Option<&CaPublicKey>;
}

/// A CAPK store backed by an in-memory list, useful for tests and for
/// callers with a small, static key set.
#[derive(Clone, Debug, Default)]
pub struct StaticCaPublicKeyStore {
	entries: Vec<(Vec<u8>, u8, CaPublicKey)>,
}

impl StaticCaPublicKeyStore {
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	pub fn insert(&mut self, rid: Vec<u8>, index: u8, key: CaPublicKey) {
		self.entries.push((rid, index, key));
	}
}

impl CaPublicKeyStore for StaticCaPublicKeyStore {
	fn lookup(&self, rid: &[u8], index: u8) -> Option<&CaPublicKey> {
		self.entries
			.iter()
			.find(|(entry_rid, entry_index, _)| entry_rid == rid && *entry_index == index)
			.map(|(_, _, key)| key)
	}
}
