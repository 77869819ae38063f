//! Check loop properties
//!
//! Properties about whole checks: where shrinking ends up, when discarding
//! gives up, and whether a replay token reproduces what it was issued for.

use crate::{arbitrary_seed, assert_property};
use galaxycheck::*;
use std::cell::Cell;
use std::rc::Rc;

/// Property: a check of `x < 10` always reports exactly 10
pub fn test_check_converges_on_smallest_failure() {
    let prop = for_all(arbitrary_seed(), |&seed| {
        let inner = for_all(Gen::int32().build(), |&x| x < 10);
        match inner.check(&Config::default().with_seed(seed)) {
            Ok(result) => result.counterexample.map(|c| c.value) == Some(10),
            Err(_) => false,
        }
    });
    assert_property("Check convergence", prop);
}

/// Property: a generator that always discards is given up on after exactly
/// 1000 attempts
pub fn test_discard_exhaustion_is_exact() {
    let prop = for_all(arbitrary_seed(), |&seed| {
        let attempts = Rc::new(Cell::new(0usize));
        let counter = attempts.clone();
        let gen = Gen::int32().build().filter(move |_| {
            counter.set(counter.get() + 1);
            false
        });
        let inner = for_all(gen, |_| true);
        let exhausted = matches!(
            inner.check(&Config::default().with_seed(seed)),
            Err(GalaxyError::Exhausted { discards: 1000 })
        );
        exhausted && attempts.get() == 1000
    });
    assert_property("Discard exhaustion", prop);
}

/// Property: replaying a counterexample's token reproduces its value and
/// failure message in a single iteration
pub fn test_replay_reproduces_counterexample() {
    let prop = for_all(arbitrary_seed(), |&seed| {
        let inner = for_all(Gen::int_range(0, 100).list().build(), |xs: &Vec<i32>| {
            let sum: i32 = xs.iter().sum();
            if sum < 150 {
                Ok(())
            } else {
                Err(format!("sum was {sum}"))
            }
        });
        let Ok(found) = inner.check(&Config::default().with_seed(seed)) else {
            return false;
        };
        let Some(counterexample) = found.counterexample else {
            // Nothing to replay.
            return true;
        };

        let replay_config = Config::default().with_replay(counterexample.replay.clone());
        match inner.check(&replay_config) {
            Ok(replayed) => {
                let again = replayed.counterexample;
                replayed.termination_reason == TerminationReason::IsReplay
                    && replayed.iterations == 1
                    && again.as_ref().map(|c| &c.value) == Some(&counterexample.value)
                    && again.and_then(|c| c.exception) == counterexample.exception
            }
            Err(_) => false,
        }
    });
    assert_property("Replay round trip", prop);
}
