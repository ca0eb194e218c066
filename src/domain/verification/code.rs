use rand::rngs::OsRng;
use rand::Rng;

/// Six decimal digits from the OS entropy source. Leading zeros are
/// preserved, so the keyspace is exactly 10^6.
pub fn generate_code() -> String {
    format!("{:06}", OsRng.gen_range(0..1_000_000u32))
}
