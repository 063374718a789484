//! Random link identifiers.

use rand::Rng;
use thiserror::Error;

/// The 62 symbols a link may contain.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Errors produced by a [`LinkGenerator`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// Links must have at least one character.
    #[error("requested link length must be positive, got {0}")]
    InvalidLength(usize),
}

/// Produces candidate links.
///
/// Uniqueness is not the generator's job: the storage layer rejects
/// duplicates and the link service asks for another candidate.
#[cfg_attr(test, mockall::automock)]
pub trait LinkGenerator: Send + Sync {
    /// Generate a link of exactly `length` characters from [`ALPHABET`].
    fn generate(&self, length: usize) -> Result<String, GeneratorError>;
}

/// Uniform sampling from [`ALPHABET`] using the calling thread's RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLinkGenerator;

impl LinkGenerator for RandomLinkGenerator {
    fn generate(&self, length: usize) -> Result<String, GeneratorError> {
        if length == 0 {
            return Err(GeneratorError::InvalidLength(length));
        }
        let mut rng = rand::rng();
        let link = (0..length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabet_has_62_distinct_symbols() {
        let set: HashSet<_> = ALPHABET.iter().collect();
        assert_eq!(ALPHABET.len(), 62);
        assert_eq!(set.len(), 62);
    }

    #[test]
    fn generates_requested_length_from_alphabet() {
        let gen = RandomLinkGenerator;
        for length in [1, 6, 8, 32] {
            let link = gen.generate(length).unwrap();
            assert_eq!(link.len(), length);
            assert!(link.bytes().all(|b| ALPHABET.contains(&b)), "{link}");
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(
            RandomLinkGenerator.generate(0),
            Err(GeneratorError::InvalidLength(0))
        );
    }

    #[test]
    fn successive_links_differ() {
        let gen = RandomLinkGenerator;
        let links: HashSet<_> = (0..100).map(|_| gen.generate(12).unwrap()).collect();
        assert_eq!(links.len(), 100);
    }

    #[test]
    fn concurrent_generation_is_independent() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..50)
                        .map(|_| RandomLinkGenerator.generate(10).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for link in h.join().unwrap() {
                assert!(all.insert(link), "duplicate link across threads");
            }
        }
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn every_symbol_is_reachable() {
        let gen = RandomLinkGenerator;
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(gen.generate(32).unwrap().bytes());
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }
}
