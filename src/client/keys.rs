//! Credential pool partitioning and round-robin rotation
use crate::config::Credentials;
use crate::error::{AmbientError, Result};
use crate::models::KeyPair;

/// Ordered, immutable list of key pairs built for one fetch operation
#[derive(Debug, Clone)]
pub struct KeyPool {
    pairs: Vec<KeyPair>,
}

impl KeyPool {
    /// Partition API keys across application keys
    ///
    /// Each application key takes the next `ceil(|api| / |app|)` API keys in
    /// order, so the last application key may receive fewer (or none).
    /// Indices are dense and 0-based over the resulting pairs.
    pub fn build(api_keys: &[String], application_keys: &[String]) -> Result<Self> {
        if api_keys.is_empty() {
            return Err(AmbientError::configuration("API key list is empty"));
        }
        if application_keys.is_empty() {
            return Err(AmbientError::configuration("Application key list is empty"));
        }

        let per_app = api_keys.len().div_ceil(application_keys.len());
        let pairs = api_keys
            .chunks(per_app)
            .zip(application_keys.iter())
            .flat_map(|(chunk, app_key)| chunk.iter().map(move |api_key| (api_key, app_key)))
            .enumerate()
            .map(|(index, (api_key, app_key))| KeyPair {
                api_key: api_key.clone(),
                application_key: app_key.clone(),
                index,
            })
            .collect::<Vec<_>>();

        Ok(KeyPool { pairs })
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Self::build(&credentials.api_keys, &credentials.application_keys)
    }

    pub fn pairs(&self) -> &[KeyPair] {
        &self.pairs
    }

    /// Number of distinct credentials, which bounds in-flight requests
    pub fn width(&self) -> usize {
        self.pairs.len()
    }

    pub fn rotation(&self) -> KeyRotation<'_> {
        KeyRotation {
            pool: self,
            cursor: 0,
        }
    }
}

/// Round-robin cursor over a [`KeyPool`], wrapping past the last pair
#[derive(Debug)]
pub struct KeyRotation<'a> {
    pool: &'a KeyPool,
    cursor: usize,
}

impl<'a> KeyRotation<'a> {
    pub fn next_pair(&mut self) -> &'a KeyPair {
        let pair = &self.pool.pairs[self.cursor % self.pool.pairs.len()];
        self.cursor += 1;
        pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn triples(pool: &KeyPool) -> Vec<(&str, &str, usize)> {
        pool.pairs()
            .iter()
            .map(|p| (p.api_key.as_str(), p.application_key.as_str(), p.index))
            .collect()
    }

    #[test]
    fn three_api_keys_over_two_app_keys() {
        let pool = KeyPool::build(&keys(&["k1", "k2", "k3"]), &keys(&["a1", "a2"])).unwrap();
        assert_eq!(
            triples(&pool),
            vec![("k1", "a1", 0), ("k2", "a1", 1), ("k3", "a2", 2)]
        );
        assert_eq!(pool.width(), 3);
    }

    #[test]
    fn more_app_keys_than_api_keys() {
        let pool = KeyPool::build(&keys(&["k1", "k2"]), &keys(&["a1", "a2", "a3"])).unwrap();
        assert_eq!(triples(&pool), vec![("k1", "a1", 0), ("k2", "a2", 1)]);
    }

    #[test]
    fn even_split() {
        let pool =
            KeyPool::build(&keys(&["k1", "k2", "k3", "k4"]), &keys(&["a1", "a2"])).unwrap();
        assert_eq!(
            triples(&pool),
            vec![
                ("k1", "a1", 0),
                ("k2", "a1", 1),
                ("k3", "a2", 2),
                ("k4", "a2", 3)
            ]
        );
    }

    #[test]
    fn empty_lists_are_configuration_errors() {
        let err = KeyPool::build(&[], &keys(&["a1"])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        let err = KeyPool::build(&keys(&["k1"]), &[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn rotation_wraps_around() {
        let pool = KeyPool::build(&keys(&["k1", "k2"]), &keys(&["a1"])).unwrap();
        let mut rotation = pool.rotation();
        let seen: Vec<usize> = (0..5).map(|_| rotation.next_pair().index).collect();
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }
}
