use lucky_draw::core::records;
use lucky_draw::{Configuration, DrawEngine, MemoryStore, StdRandom, Tier};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Toggle,
    Tick,
    Select(usize),
    Advance,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Toggle),
        2 => Just(Op::Tick),
        1 => (0usize..6).prop_map(Op::Select),
        1 => Just(Op::Advance),
    ]
}

fn config_strategy() -> impl Strategy<Value = Configuration> {
    (
        -50i64..50,
        1i64..30,
        proptest::collection::vec(1u32..5, 1..5),
    )
        .prop_map(|(min, width, capacities)| {
            let tiers = capacities
                .into_iter()
                .enumerate()
                .map(|(i, capacity)| Tier::new(format!("T{}", i + 1), capacity))
                .collect();
            Configuration::new("Prop", min, min + width, tiers)
        })
}

fn check_invariants(engine: &DrawEngine<MemoryStore, StdRandom>) {
    let config = engine.config();
    let ledger = engine.ledger();
    let pool = engine.pool();

    assert_eq!(ledger.len(), config.tier_count());

    let mut drawn = HashSet::new();
    for (index, tier) in config.tiers.iter().enumerate() {
        assert!(ledger.drawn_count(index) <= tier.capacity());
        for &number in ledger.drawn(index) {
            assert!(config.contains(number));
            assert!(drawn.insert(number), "{} drawn twice", number);
        }
    }

    for &number in pool.as_slice() {
        assert!(!drawn.contains(&number));
    }
    let range_len = (config.max_number - config.min_number + 1) as usize;
    assert_eq!(pool.len() + drawn.len(), range_len);

    let state = engine.state();
    assert!(state.current_tier_index < config.tier_count());
}

proptest! {
    #[test]
    fn draws_keep_ledger_and_pool_disjoint(
        config in config_strategy(),
        seed in any::<u64>(),
        ops in proptest::collection::vec(op_strategy(), 0..60),
    ) {
        let mut store = MemoryStore::new();
        records::save_config(&mut store, &config);
        let mut engine = DrawEngine::open(store, StdRandom::seeded(seed)).unwrap();
        check_invariants(&engine);

        let mut previous: Vec<usize> = vec![0; config.tier_count()];
        for op in ops {
            match op {
                Op::Toggle => { let _ = engine.request_draw(); }
                Op::Tick => {
                    let pool_before = engine.pool().clone();
                    if let Some(number) = engine.tick() {
                        prop_assert!(pool_before.contains(number));
                    }
                    prop_assert_eq!(engine.pool(), &pool_before);
                }
                Op::Select(index) => { let _ = engine.select_tier(index); }
                Op::Advance => { let _ = engine.advance_tier(); }
            }

            check_invariants(&engine);
            for (index, count) in previous.iter_mut().enumerate() {
                let now = engine.ledger().drawn_count(index);
                prop_assert!(now >= *count);
                *count = now;
            }
        }

        // Stop any roll in progress, then reload from the same records.
        let _ = engine.stop();
        let ledger = engine.ledger().clone();
        let pool = engine.pool().clone();
        let finished = engine.state().all_finished
            && ledger.is_complete(&engine.config().tiers);

        let reopened = DrawEngine::open(engine.into_store(), StdRandom::seeded(seed)).unwrap();
        check_invariants(&reopened);
        prop_assert_eq!(reopened.ledger(), &ledger);
        prop_assert_eq!(reopened.pool(), &pool);
        if finished {
            prop_assert!(reopened.state().all_finished);
        }
    }

    #[test]
    fn reset_twice_equals_reset_once(
        config in config_strategy(),
        seed in any::<u64>(),
        draws in 0usize..10,
    ) {
        let mut store = MemoryStore::new();
        records::save_config(&mut store, &config);
        let mut engine = DrawEngine::open(store, StdRandom::seeded(seed)).unwrap();
        for _ in 0..draws {
            let _ = engine.request_draw();
        }
        let _ = engine.stop();

        engine.reset().unwrap();
        let once = engine.snapshot();
        engine.reset().unwrap();
        prop_assert_eq!(engine.snapshot(), once);
        check_invariants(&engine);
    }
}
