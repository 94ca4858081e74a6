//! A contact EMV terminal kernel.
//!
//! Implements the terminal-side behaviour of EMV 4.4 Books 1-4 for the
//! contact interface, plus RSA-based offline data authentication per Book 2:
//! the BER-TLV engine, the Terminal Application Layer (application
//! discovery, SELECT, GET PROCESSING OPTIONS, READ RECORD, GENERATE AC),
//! offline data authentication (SDA/DDA/CDA), terminal risk management, and
//! the session state machine that threads them together.
//!
//! The Terminal Transport Layer (APDU marshalling), ATR parsing, the raw
//! RSA/SHA-1 primitives, and every CLI/UI layer are deliberately left as
//! collaborators the caller supplies - see [`emv::ttl`] and [`crypto`] for
//! the trait boundaries.

#[macro_use]
pub mod macros;
#[macro_use]
pub mod testing_macros;

pub mod bitflag_value;
pub mod config;
pub mod crypto;
pub mod emv;
pub mod error;
pub mod tlv;
pub mod util;

pub use util::BITS_PER_BYTE;
