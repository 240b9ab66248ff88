use rand::{rngs::OsRng, Rng};

/// One-time codes come from OS randomness, not the thread-local PRNG.
pub fn generate_otp(length: usize) -> String {
    let mut rng = OsRng;

    (0..length)
        .map(|_| rng.gen_range(0..10).to_string())
        .collect()
}
