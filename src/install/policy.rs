use std::collections::HashSet;

use crate::error::{Result, StoreError};
use crate::models::ExtensionId;

/// Which extensions may be installed. The deny list wins over the allow list;
/// with no allow list every non-denied ID is permitted.
#[derive(Debug, Clone, Default)]
pub struct InstallPolicy {
    allow: Option<HashSet<ExtensionId>>,
    deny: HashSet<ExtensionId>,
}

impl InstallPolicy {
    pub fn new(allow: Option<HashSet<ExtensionId>>, deny: HashSet<ExtensionId>) -> Self {
        Self { allow, deny }
    }

    pub fn permits(&self, id: &ExtensionId) -> bool {
        if self.deny.contains(id) {
            return false;
        }
        self.allow.as_ref().is_none_or(|allow| allow.contains(id))
    }

    pub fn check(&self, id: &ExtensionId) -> Result<()> {
        if self.permits(id) {
            Ok(())
        } else {
            Err(StoreError::PolicyBlocked(id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ExtensionId {
        s.parse().unwrap()
    }

    #[test]
    fn test_deny_beats_allow() {
        let a = id("abcdefghijklmnopabcdefghijklmnop");
        let b = id("ponmlkjihgfedcbaponmlkjihgfedcba");

        let policy = InstallPolicy::new(
            Some([a.clone(), b.clone()].into_iter().collect()),
            [b.clone()].into_iter().collect(),
        );
        assert!(policy.permits(&a));
        assert!(matches!(policy.check(&b), Err(StoreError::PolicyBlocked(_))));
    }

    #[test]
    fn test_allow_list_restricts() {
        let a = id("abcdefghijklmnopabcdefghijklmnop");
        let b = id("ponmlkjihgfedcbaponmlkjihgfedcba");

        let policy = InstallPolicy::new(Some([a.clone()].into_iter().collect()), HashSet::new());
        assert!(policy.permits(&a));
        assert!(!policy.permits(&b));
        assert!(InstallPolicy::default().permits(&b));
    }
}
