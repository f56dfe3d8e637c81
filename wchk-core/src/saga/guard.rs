//! Per-checkout in-flight tracking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use wchk_sdk::objects::CheckoutToken;

/// The set of checkout tokens with a saga run outstanding.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    tokens: Arc<Mutex<HashSet<CheckoutToken>>>,
}

/// Marks a token as in flight until dropped.
pub struct InFlightGuard {
    tokens: Arc<Mutex<HashSet<CheckoutToken>>>,
    token: CheckoutToken,
}

impl InFlightRegistry {
    /// Claim `token`, or `None` if another run already holds it.
    pub fn try_acquire(&self, token: &CheckoutToken) -> Option<InFlightGuard> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if !tokens.insert(token.clone()) {
            return None;
        }
        Some(InFlightGuard {
            tokens: Arc::clone(&self.tokens),
            token: token.clone(),
        })
    }

    pub fn is_in_flight(&self, token: &CheckoutToken) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused_until_release() {
        let registry = InFlightRegistry::default();
        let t1 = CheckoutToken::new("T1");

        let guard = registry.try_acquire(&t1).unwrap();
        assert!(registry.try_acquire(&t1).is_none());
        assert!(registry.try_acquire(&CheckoutToken::new("T2")).is_some());
        assert!(registry.is_in_flight(&t1));

        drop(guard);
        assert!(!registry.is_in_flight(&t1));
        assert!(registry.try_acquire(&t1).is_some());
    }
}
