//! Deterministic random bit generators: block-cipher counter (§4.6),
//! cSHAKE-squeeze (§4.7), and HMAC-based (§4.8).

pub mod bcr;
pub mod csg;
pub mod hcg;

pub use bcr::Bcr;
pub use csg::Csg;
pub use hcg::Hcg;

/// Single-call request ceiling shared by every DRBG in this module
/// (spec §3 DRBG invariant 3; CSG names the concrete 100 MiB figure in
/// §4.7, adopted here as the common default for BCR/HCG too).
pub const MAX_REQUEST: usize = 100 * 1024 * 1024;
/// Reseed-request ceiling before an instance must be re-initialized
/// (spec §3 DRBG invariant 2 / §4.7).
pub const MAX_RESEED: usize = 1024;
