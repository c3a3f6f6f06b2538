//! 负载均衡器测试

use std::collections::HashSet;
use std::sync::Arc;

use beacon_core::resolver::{Balancer, RoundRobinBalancer};

fn addrs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_round_robin_rotation_sequence() {
    let balancer = RoundRobinBalancer::new();
    let input = addrs(&["a", "b", "c"]);

    let expected = [
        addrs(&["b", "c", "a"]),
        addrs(&["c", "a", "b"]),
        addrs(&["a", "b", "c"]),
        addrs(&["b", "c", "a"]),
    ];
    for want in expected {
        assert_eq!(balancer.balance("svc", &input), want);
    }
    // 输入不会被修改
    assert_eq!(input, addrs(&["a", "b", "c"]));
}

#[test]
fn test_round_robin_empty_input() {
    let balancer = RoundRobinBalancer::new();
    let empty: Vec<String> = Vec::new();
    assert!(balancer.balance("svc", &empty).is_empty());
    assert!(balancer.balance("svc", &empty).is_empty());

    // 空输入不推进计数器
    assert_eq!(balancer.balance("svc", &addrs(&["a", "b"])), addrs(&["b", "a"]));
}

#[test]
fn test_round_robin_single_address() {
    let balancer = RoundRobinBalancer::new();
    for _ in 0..3 {
        assert_eq!(balancer.balance("svc", &addrs(&["only"])), addrs(&["only"]));
    }
}

#[test]
fn test_round_robin_counter_is_shared_across_services() {
    let balancer = RoundRobinBalancer::new();
    let input = addrs(&["a", "b", "c"]);

    assert_eq!(balancer.balance("svc-a", &input)[0], "b");
    assert_eq!(balancer.balance("svc-b", &input)[0], "c");
    assert_eq!(balancer.balance("svc-a", &input)[0], "a");
}

#[test]
fn test_round_robin_is_generic_over_element_type() {
    let balancer = RoundRobinBalancer::new();
    assert_eq!(balancer.balance("svc", [1u16, 2, 3].as_slice()), vec![2, 3, 1]);
}

#[test]
fn test_round_robin_concurrent_calls_cover_every_start() {
    const THREADS: usize = 8;
    const CALLS: usize = 300;

    let balancer = Arc::new(RoundRobinBalancer::new());
    let input = Arc::new(addrs(&["a", "b", "c"]));

    let firsts: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let balancer = balancer.clone();
                let input = input.clone();
                scope.spawn(move || {
                    (0..CALLS)
                        .map(|_| {
                            let balanced = balancer.balance("svc", &input);
                            assert_eq!(balanced.len(), 3);
                            let unique: HashSet<&String> = balanced.iter().collect();
                            assert_eq!(unique.len(), 3);
                            balanced[0].clone()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    // 计数器单调递增，总调用数可被 3 整除时每个起点出现次数相同
    for start in ["a", "b", "c"] {
        let count = firsts.iter().filter(|f| f.as_str() == start).count();
        assert_eq!(count, THREADS * CALLS / 3);
    }
}

#[test]
fn test_balancer_as_trait_object() {
    let balancer: Arc<dyn Balancer<String>> = Arc::new(RoundRobinBalancer::new());
    assert_eq!(balancer.balance("svc", &addrs(&["x", "y"])), addrs(&["y", "x"]));
}
