use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random source of the randomized algorithms
/// Reproducible with a seed, seeded from the OS otherwise.
pub fn seeded(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_sequence() {
        let a: Vec<u32> = seeded(Some(7)).sample_iter(rand::distributions::Standard).take(4).collect();
        let b: Vec<u32> = seeded(Some(7)).sample_iter(rand::distributions::Standard).take(4).collect();
        assert_eq!(a, b);
    }
}
