use rand::seq::SliceRandom;

/// Immutable set of upstream credentials, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    keys: Vec<String>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated key list. Blank entries are dropped.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Decides the order in which keys are tried for a single call.
pub trait KeyOrder: Send + Sync {
    fn order<'a>(&self, keys: &'a [String]) -> Vec<&'a str>;
}

/// Fresh random permutation per call. No memory between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffledOrder;

impl KeyOrder for ShuffledOrder {
    fn order<'a>(&self, keys: &'a [String]) -> Vec<&'a str> {
        let mut order: Vec<&str> = keys.iter().map(String::as_str).collect();
        order.shuffle(&mut rand::thread_rng());
        order
    }
}

/// Keys in the order they were configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredOrder;

impl KeyOrder for DeclaredOrder {
    fn order<'a>(&self, keys: &'a [String]) -> Vec<&'a str> {
        keys.iter().map(String::as_str).collect()
    }
}

/// First 8 characters of a key, for logs.
pub(crate) fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_trims_and_drops_blanks() {
        let pool = KeyPool::from_csv(" aaa , ,bbb,,ccc ");
        assert_eq!(pool.keys(), &["aaa", "bbb", "ccc"]);
        assert!(KeyPool::from_csv("").is_empty());
        assert!(KeyPool::from_csv(" , ").is_empty());
    }

    #[test]
    fn shuffled_order_is_a_permutation() {
        let pool = KeyPool::from_csv("k1,k2,k3,k4,k5");
        for _ in 0..20 {
            let mut order = ShuffledOrder.order(pool.keys());
            order.sort_unstable();
            assert_eq!(order, vec!["k1", "k2", "k3", "k4", "k5"]);
        }
    }

    #[test]
    fn redact_keeps_prefix_only() {
        assert_eq!(redact("0123456789abcdef"), "01234567…");
        assert_eq!(redact("abc"), "abc…");
    }
}
