#[cfg(test)]
mod tests {
    use crate::loadbalance::consistent::*;
    use crate::loadbalance::traits::Membership;
    use affinity_core::{AddressEndpoint, BalanceError, EndpointRef};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    /// 数字字符串按数值哈希，其余哈希到0
    fn numeric_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    fn create_test_consistent(load_factor: f64) -> Consistent {
        Consistent::new(ConsistentConfig::new("test-service", load_factor).with_hash_fn(numeric_hash))
            .unwrap()
    }

    fn endpoints(keys: &[&str]) -> Vec<EndpointRef> {
        keys.iter().map(|key| AddressEndpoint::shared(*key)).collect()
    }

    #[test]
    fn test_reference_scenario() {
        let consistent = create_test_consistent(1.25);

        assert_eq!(consistent.get("11").unwrap_err(), BalanceError::NoEndpoints);

        consistent.add_endpoints(&endpoints(&["4"]));
        assert_eq!(consistent.num_endpoints(), 1);

        consistent.add_endpoints(&endpoints(&["6", "2"]));
        assert_eq!(consistent.num_endpoints(), 3);
        assert_eq!(consistent.endpoint_keys(), vec!["2", "4", "6"]);

        // 11 超过所有哈希值，回绕到 "2"
        let first = consistent.get("11").unwrap();
        assert_eq!(first.key(), "2");

        // 同样回绕到 "2"，但 "2" 已达上限 ceil(1.25 * 2 / 3) = 1
        let second = consistent.get("33").unwrap();
        assert_eq!(second.key(), "4");

        assert_eq!(consistent.total_load(), 2);

        consistent.remove_endpoints(&endpoints(&["2", "4"]));
        assert_eq!(consistent.num_endpoints(), 1);
        assert_eq!(consistent.total_load(), 0);

        consistent.put(&AddressEndpoint::shared("2"));
        consistent.put(&AddressEndpoint::shared("4"));
        assert_eq!(consistent.total_load(), 0);
        assert_eq!(consistent.load_of("6"), Some(0));
        consistent.verify_invariants().unwrap();
    }

    #[test]
    fn test_add_endpoints_is_idempotent() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["2", "4"]));

        let held = consistent.get("2").unwrap();
        assert_eq!(held.key(), "2");

        consistent.add_endpoints(&endpoints(&["2", "4"]));
        assert_eq!(consistent.num_endpoints(), 2);
        assert_eq!(consistent.load_of("2"), Some(1));
        assert_eq!(consistent.total_load(), 1);
        consistent.verify_invariants().unwrap();
    }

    #[test]
    fn test_duplicate_keys_in_one_batch() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["3", "3", "3"]));
        assert_eq!(consistent.num_endpoints(), 1);
        consistent.verify_invariants().unwrap();
    }

    #[test]
    fn test_key_beyond_last_hash_wraps_to_smallest() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["100", "200", "300"]));

        assert_eq!(consistent.get("301").unwrap().key(), "100");
        assert_eq!(consistent.get(&u32::MAX.to_string()).unwrap().key(), "200");
    }

    #[test]
    fn test_same_key_sticks_while_under_capacity() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["100", "200", "300"]));

        for _ in 0..10 {
            let endpoint = consistent.get("150").unwrap();
            assert_eq!(endpoint.key(), "200");
            consistent.put(&endpoint);
        }
        assert_eq!(consistent.total_load(), 0);
    }

    #[test]
    fn test_put_after_removal_leaves_others_untouched() {
        let consistent = create_test_consistent(2.0);
        consistent.add_endpoints(&endpoints(&["10", "20", "30"]));

        let a = consistent.get("10").unwrap();
        let b = consistent.get("20").unwrap();
        assert_eq!(a.key(), "10");
        assert_eq!(b.key(), "20");

        consistent.remove_endpoints(&[a.clone()]);
        assert_eq!(consistent.total_load(), 1);

        consistent.put(&a);
        consistent.put(&a);
        assert_eq!(consistent.load_of("20"), Some(1));
        assert_eq!(consistent.total_load(), 1);

        consistent.put(&b);
        consistent.put(&b);
        assert_eq!(consistent.total_load(), 0);
        consistent.verify_invariants().unwrap();
    }

    #[test]
    fn test_remove_unknown_endpoint_is_ignored() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["1"]));
        consistent.remove_endpoints(&endpoints(&["2"]));
        assert_eq!(consistent.num_endpoints(), 1);
    }

    #[test]
    fn test_readded_endpoint_starts_from_zero() {
        let consistent = create_test_consistent(1.25);
        consistent.add_endpoints(&endpoints(&["5"]));
        consistent.get("5").unwrap();
        consistent.get("5").unwrap();

        consistent.remove_endpoints(&endpoints(&["5"]));
        consistent.add_endpoints(&endpoints(&["5"]));
        assert_eq!(consistent.load_of("5"), Some(0));
        assert_eq!(consistent.total_load(), 0);
    }

    #[test]
    fn test_load_never_exceeds_capacity() {
        let consistent = Consistent::new(ConsistentConfig::new("bounded", 1.25)).unwrap();
        let addresses: Vec<String> = (0..8).map(|i| format!("10.0.0.{}:4040", i)).collect();
        let pool: Vec<EndpointRef> = addresses.iter().map(AddressEndpoint::shared).collect();
        consistent.add_endpoints(&pool);

        // 所有请求使用同一个亲和键，迫使负载溢出到后继节点
        for _ in 0..200 {
            consistent.get("hot-session").unwrap();
        }

        let stats = consistent.stats();
        let limit = (1.25 * stats.total_load as f64 / stats.num_endpoints as f64).ceil() as u64;
        assert!(stats.endpoints.iter().all(|e| e.load <= limit));
        assert_eq!(stats.total_load, 200);
    }

    #[test]
    fn test_tight_load_factor_keeps_loads_level() {
        let consistent = create_test_consistent(1.0);
        consistent.add_endpoints(&endpoints(&["1", "2", "3", "4", "5"]));

        for i in 0..37 {
            consistent.get(&i.to_string()).unwrap();
            let stats = consistent.stats();
            let max = stats.endpoints.iter().map(|e| e.load).max().unwrap();
            let min = stats.endpoints.iter().map(|e| e.load).min().unwrap();
            assert!(max - min <= 1, "loads drifted apart: {:?}", stats.endpoints);
        }
        assert_eq!(consistent.total_load(), 37);
    }

    #[test]
    fn test_invariants_hold_for_random_operations() {
        let consistent = create_test_consistent(1.25);
        let mut rng = StdRng::seed_from_u64(7);
        let mut held: Vec<EndpointRef> = Vec::new();

        for step in 0..5000 {
            match rng.random_range(0..10) {
                0 | 1 => {
                    let key = rng.random_range(0..24u32).to_string();
                    consistent.add_endpoints(&endpoints(&[key.as_str()]));
                }
                2 => {
                    let key = rng.random_range(0..24u32).to_string();
                    consistent.remove_endpoints(&endpoints(&[key.as_str()]));
                }
                3..=6 => {
                    let key = rng.random_range(0..1000u32).to_string();
                    match consistent.get(&key) {
                        Ok(endpoint) => held.push(endpoint),
                        Err(e) => assert_eq!(e, BalanceError::NoEndpoints),
                    }
                }
                _ => {
                    if !held.is_empty() {
                        let index = rng.random_range(0..held.len());
                        let endpoint = held.swap_remove(index);
                        consistent.put(&endpoint);
                    }
                }
            }

            if let Err(violation) = consistent.verify_invariants() {
                panic!("invariant violated at step {}: {}", step, violation);
            }
        }

        for endpoint in held.drain(..) {
            consistent.put(&endpoint);
        }
        assert_eq!(consistent.total_load(), 0);
    }

    #[test]
    fn test_concurrent_get_put_with_membership_churn() {
        let consistent = Arc::new(Consistent::new(ConsistentConfig::new("stress", 1.25)).unwrap());
        let stable: Vec<EndpointRef> = (0..6)
            .map(|i| AddressEndpoint::shared(format!("10.1.0.{}:80", i)))
            .collect();
        let churn: Vec<EndpointRef> = (0..3)
            .map(|i| AddressEndpoint::shared(format!("10.2.0.{}:80", i)))
            .collect();
        consistent.add_endpoints(&stable);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let consistent = consistent.clone();
                scope.spawn(move || {
                    for i in 0..2000 {
                        let key = format!("session-{}-{}", worker, i % 50);
                        let endpoint = consistent.get(&key).unwrap();
                        consistent.put(&endpoint);
                    }
                });
            }

            let consistent = consistent.clone();
            let churn = churn.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    consistent.add_endpoints(&churn);
                    consistent.remove_endpoints(&churn);
                }
            });
        });

        assert_eq!(consistent.num_endpoints(), 6);
        assert_eq!(consistent.total_load(), 0);
        consistent.verify_invariants().unwrap();
    }
}
