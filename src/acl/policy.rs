use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;

use super::codec::{self, Ipv4Prefix};
use super::trie::{RuleEntry, Trie};
use crate::error::AclError;

/// Which of the two rule lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Allow list.
    White,
    /// Deny list.
    Black,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListKind::White => "white",
            ListKind::Black => "black",
        })
    }
}

/// Admission decision for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Covered by an allow rule.
    Allow(Ipv4Prefix),
    /// Not allowed explicitly and covered by a deny rule.
    Deny(Ipv4Prefix),
    /// No rule applies. Callers let the request through.
    Unspecified,
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }
}

#[derive(Debug, Serialize)]
pub struct PolicySnapshot {
    pub white: Vec<RuleEntry>,
    pub black: Vec<RuleEntry>,
}

/// Allow list and deny list, each behind its own readers-writer lock.
///
/// The allow list is consulted first and always overrides the deny list.
/// Within one list the broadest covering rule wins (see [`Trie::lookup`]).
#[derive(Debug, Default)]
pub struct AccessPolicy {
    white: RwLock<Trie>,
    black: RwLock<Trie>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from CIDR strings. Fails on the first invalid rule.
    pub fn from_rules<A, D>(allow: A, deny: D) -> Result<Self, AclError>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut white = Trie::new();
        for rule in allow {
            white.insert(rule.as_ref().parse()?);
        }
        let mut black = Trie::new();
        for rule in deny {
            black.insert(rule.as_ref().parse()?);
        }
        Ok(Self {
            white: RwLock::new(white),
            black: RwLock::new(black),
        })
    }

    fn trie(&self, kind: ListKind) -> &RwLock<Trie> {
        match kind {
            ListKind::White => &self.white,
            ListKind::Black => &self.black,
        }
    }

    pub async fn check(&self, addr: u32) -> Decision {
        if let Some(m) = self.white.read().await.lookup(addr) {
            return Decision::Allow(m.rule);
        }
        if let Some(m) = self.black.read().await.lookup(addr) {
            return Decision::Deny(m.rule);
        }
        Decision::Unspecified
    }

    pub async fn check_str(&self, text: &str) -> Result<Decision, AclError> {
        let addr = codec::parse_addr(text)?;
        Ok(self.check(addr).await)
    }

    /// Returns `true` if the rule was newly added.
    pub async fn insert(&self, kind: ListKind, prefix: Ipv4Prefix) -> bool {
        self.trie(kind).write().await.insert(prefix)
    }

    /// Returns `true` if a rule was removed.
    pub async fn delete(&self, kind: ListKind, prefix: Ipv4Prefix) -> bool {
        self.trie(kind).write().await.delete(prefix)
    }

    pub async fn insert_str(&self, kind: ListKind, text: &str) -> Result<bool, AclError> {
        let prefix = text.parse()?;
        Ok(self.insert(kind, prefix).await)
    }

    pub async fn delete_str(&self, kind: ListKind, text: &str) -> Result<bool, AclError> {
        let prefix = text.parse()?;
        Ok(self.delete(kind, prefix).await)
    }

    pub async fn insert_allow(&self, addr: u32, len: u8) -> Result<bool, AclError> {
        Ok(self.insert(ListKind::White, Ipv4Prefix::new(addr, len)?).await)
    }

    pub async fn insert_deny(&self, addr: u32, len: u8) -> Result<bool, AclError> {
        Ok(self.insert(ListKind::Black, Ipv4Prefix::new(addr, len)?).await)
    }

    pub async fn delete_allow(&self, addr: u32, len: u8) -> Result<bool, AclError> {
        Ok(self.delete(ListKind::White, Ipv4Prefix::new(addr, len)?).await)
    }

    pub async fn delete_deny(&self, addr: u32, len: u8) -> Result<bool, AclError> {
        Ok(self.delete(ListKind::Black, Ipv4Prefix::new(addr, len)?).await)
    }

    pub async fn list(&self, kind: ListKind) -> Vec<RuleEntry> {
        self.trie(kind).read().await.list()
    }

    pub async fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            white: self.list(ListKind::White).await,
            black: self.list(ListKind::Black).await,
        }
    }

    /// Rule counts as `(white, black)`.
    pub async fn stats(&self) -> (usize, usize) {
        let white = self.white.read().await.len();
        let black = self.black.read().await.len();
        (white, black)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn p(s: &str) -> Ipv4Prefix {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_allow_overrides_deny() {
        let policy = AccessPolicy::new();
        policy.insert_str(ListKind::Black, "10.0.0.0/8").await.unwrap();
        policy.insert_str(ListKind::White, "10.1.0.0/16").await.unwrap();

        assert_eq!(
            policy.check_str("10.1.2.3").await.unwrap(),
            Decision::Allow(p("10.1.0.0/16"))
        );
        assert_eq!(
            policy.check_str("10.2.0.1").await.unwrap(),
            Decision::Deny(p("10.0.0.0/8"))
        );
    }

    #[tokio::test]
    async fn test_ancestor_deny_shadows_nested_deny() {
        let policy = AccessPolicy::new();
        policy.insert_str(ListKind::Black, "10.0.0.0/8").await.unwrap();
        policy.insert_str(ListKind::Black, "10.1.0.0/16").await.unwrap();

        let decision = policy.check_str("10.1.2.3").await.unwrap();
        assert_eq!(decision, Decision::Deny(p("10.0.0.0/8")));

        let black = policy.list(ListKind::Black).await;
        assert_eq!(black[0].hits, 1);
        assert_eq!(black[1].hits, 0);
    }

    #[tokio::test]
    async fn test_private_range_scenario() {
        let policy = AccessPolicy::new();
        policy.insert_str(ListKind::Black, "192.168.0.0/16").await.unwrap();

        assert!(policy.check_str("192.168.5.5").await.unwrap().is_denied());
        assert_eq!(policy.check_str("192.167.5.5").await.unwrap(), Decision::Unspecified);

        policy.insert_str(ListKind::White, "192.168.5.0/24").await.unwrap();
        assert_eq!(
            policy.check_str("192.168.5.5").await.unwrap(),
            Decision::Allow(p("192.168.5.0/24"))
        );
        assert!(policy.check_str("192.168.6.5").await.unwrap().is_denied());
    }

    #[tokio::test]
    async fn test_delete_restores_default() {
        let policy = AccessPolicy::new();
        policy.insert_deny(0x0A00_0000, 8).await.unwrap();
        assert!(policy.check(0x0A01_0203).await.is_denied());

        assert!(policy.delete_deny(0x0A00_0000, 8).await.unwrap());
        assert!(!policy.delete_deny(0x0A00_0000, 8).await.unwrap());
        assert_eq!(policy.check(0x0A01_0203).await, Decision::Unspecified);
    }

    #[tokio::test]
    async fn test_allow_helpers() {
        let policy = AccessPolicy::new();
        assert!(policy.insert_allow(0x0808_0808, 32).await.unwrap());
        assert!(!policy.insert_allow(0x0808_0808, 32).await.unwrap());
        assert!(policy.insert_allow(0, 33).await.is_err());
        assert_eq!(policy.stats().await, (1, 0));
        assert!(policy.delete_allow(0x0808_0808, 32).await.unwrap());
        assert_eq!(policy.stats().await, (0, 0));
    }

    #[tokio::test]
    async fn test_invalid_input_is_reported() {
        let policy = AccessPolicy::new();
        assert!(policy.check_str("10.0.0.x").await.is_err());
        assert!(policy.insert_str(ListKind::Black, "10.0.0.0/40").await.is_err());
        assert!(policy.delete_str(ListKind::White, "garbage").await.is_err());
        // nothing was coerced into a 0.0.0.0 rule
        assert_eq!(policy.check_str("0.0.0.0").await.unwrap(), Decision::Unspecified);
    }

    #[tokio::test]
    async fn test_from_rules() {
        let policy = AccessPolicy::from_rules(["127.0.0.1"], ["10.0.0.0/8", "172.16.0.0/12"]).unwrap();
        assert_eq!(policy.stats().await, (1, 2));

        let err = AccessPolicy::from_rules(Vec::<String>::new(), vec!["10.0.0.256".to_string()]);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_json_shape() {
        let policy = AccessPolicy::from_rules(["1.2.3.4"], ["10.0.0.0/8"]).unwrap();
        policy.check_str("10.9.9.9").await.unwrap();

        let json = serde_json::to_value(policy.snapshot().await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "white": [{"addr": "1.2.3.4", "mask": 32, "count": 0}],
                "black": [{"addr": "10.0.0.0", "mask": 8, "count": 1}],
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_and_writers() {
        let policy = Arc::new(AccessPolicy::new());
        policy.insert_str(ListKind::Black, "10.0.0.0/8").await.unwrap();

        let mut tasks = Vec::new();
        for w in 0..4u32 {
            let policy = policy.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..200u32 {
                    let prefix = Ipv4Prefix::new(0xC0A8_0000 | (w << 8) | i, 32).unwrap();
                    policy.insert(ListKind::Black, prefix).await;
                    policy.delete(ListKind::Black, prefix).await;
                }
            }));
        }
        for _ in 0..4 {
            let policy = policy.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..500u32 {
                    assert!(policy.check(0x0A00_0000 | i).await.is_denied());
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let black = policy.list(ListKind::Black).await;
        assert_eq!(black.len(), 1);
        assert_eq!(black[0].hits, 2000);
    }
}
