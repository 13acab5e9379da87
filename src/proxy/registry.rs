use std::collections::HashMap;

use log::debug;

use crate::proxy::{Proxy, UniqueKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Merged,
}

/// Insertion-ordered, key-deduplicated store of proxy records.
#[derive(Debug, Default)]
pub struct Registry {
    proxies: Vec<Proxy>,
    index: HashMap<UniqueKey, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &UniqueKey) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts `candidate` under `key`, or refines the record already stored there.
    ///
    /// The first record seen for a key keeps its name and nearly all of its fields; only
    /// TUIC's `skip-cert-verify` is taken from later observations.
    pub fn upsert(&mut self, key: UniqueKey, candidate: Proxy) -> Upsert {
        match self.index.get(&key) {
            Some(&i) => {
                refresh(&mut self.proxies[i], &candidate);
                debug!("[Registry] merged {} into {}", key, self.proxies[i].name());
                Upsert::Merged
            }
            None => {
                self.index.insert(key, self.proxies.len());
                self.proxies.push(candidate);
                Upsert::Inserted
            }
        }
    }

    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<String> {
        self.proxies.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

fn refresh(existing: &mut Proxy, candidate: &Proxy) {
    if let (Proxy::Tuic(existing), Proxy::Tuic(candidate)) = (existing, candidate) {
        existing.skip_cert_verify = candidate.skip_cert_verify;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Proxy {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn first_insert_wins_the_name() {
        let mut registry = Registry::new();
        let key = UniqueKey::typed("1.2.3.4", 443, "hysteria2");
        let first = yaml("{type: hysteria2, name: first, server: 1.2.3.4, port: 443, password: a}");
        let second = yaml("{type: hysteria2, name: second, server: 1.2.3.4, port: 443, password: b}");

        assert_eq!(registry.upsert(key.clone(), first), Upsert::Inserted);
        assert_eq!(registry.upsert(key, second), Upsert::Merged);
        assert_eq!(registry.len(), 1);

        let Proxy::Hysteria2(kept) = &registry.proxies()[0] else {
            panic!("expected hysteria2");
        };
        assert_eq!(kept.name, "first");
        assert_eq!(kept.password, "a");
    }

    #[test]
    fn tuic_merge_refreshes_skip_cert_verify_only() {
        let mut registry = Registry::new();
        let key = UniqueKey::typed("t.example", 443, "tuic");
        let first = yaml(
            "{type: tuic, name: keep, server: t.example, port: 443, uuid: u1, skip-cert-verify: false}",
        );
        let second = yaml(
            "{type: tuic, name: other, server: t.example, port: 443, uuid: u2, skip-cert-verify: true}",
        );

        registry.upsert(key.clone(), first);
        registry.upsert(key.clone(), second);
        assert!(registry.contains(&key));
        assert_eq!(registry.len(), 1);

        let Proxy::Tuic(kept) = &registry.proxies()[0] else {
            panic!("expected tuic");
        };
        assert!(kept.skip_cert_verify);
        assert_eq!(kept.name, "keep");
        assert_eq!(kept.uuid, "u1");
        assert_eq!(kept.server, "t.example");
        assert_eq!(kept.port, 443);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut registry = Registry::new();
        for (i, server) in ["c", "a", "b"].iter().enumerate() {
            let p = yaml(&format!(
                "{{type: ss, name: n{}, server: {}, port: 1, cipher: x, password: y}}",
                i, server
            ));
            registry.upsert(UniqueKey::for_proxy(&p), p);
        }
        assert_eq!(registry.names(), vec!["n0", "n1", "n2"]);
        assert!(!registry.is_empty());
    }
}
