//! IPv4 access control: address codec, rule trie and the allow/deny policy.

pub mod codec;
pub mod policy;
pub mod trie;

pub use codec::Ipv4Prefix;
pub use policy::{AccessPolicy, Decision, ListKind, PolicySnapshot};
pub use trie::{Match, RuleEntry, Trie};
