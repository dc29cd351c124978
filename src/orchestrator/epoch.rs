use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out one epoch per search. Starting a new search makes every older
/// epoch stale, and stale runs stop publishing.
#[derive(Debug, Clone, Default)]
pub struct EpochGate {
    current: Arc<AtomicU64>,
}

impl EpochGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Epoch {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Epoch {
            value,
            current: self.current.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Epoch {
    value: u64,
    current: Arc<AtomicU64>,
}

impl Epoch {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_epoch_supersedes() {
        let gate = EpochGate::new();
        let first = gate.begin();
        assert!(first.is_current());

        let second = gate.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(second.value(), first.value() + 1);
    }

    #[test]
    fn test_clones_share_state() {
        let gate = EpochGate::new();
        let other = gate.clone();
        let epoch = gate.begin();
        other.begin();
        assert!(!epoch.is_current());
    }
}
