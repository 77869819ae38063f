//! Generators choosing between values or other generators.
//!
//! Each choice shrinks towards the earliest alternative.

use super::{Bias, Gen};
use std::rc::Rc;

fn index(count: usize) -> Gen<u32> {
    Gen::uint32()
        .between(0, count.saturating_sub(1) as u32)
        .with_bias(Bias::None)
        .build()
}

impl Gen<bool> {
    /// Generate a random boolean. Shrinks to `false`.
    pub fn boolean() -> Self {
        Gen::byte()
            .between(0, 1)
            .with_bias(Bias::None)
            .build()
            .map(|value| *value == 1)
    }

    /// Alias matching the `Gen::bool()` spelling.
    pub fn bool() -> Self {
        Gen::boolean()
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Choose one of `choices`.
    pub fn element(choices: Vec<T>) -> Self {
        if choices.is_empty() {
            return Gen::error("ElementGen", "'choices' must not be empty");
        }
        let choices = Rc::new(choices);
        index(choices.len()).map(move |&i| choices[i as usize].clone())
    }

    /// Choose one of `gens` and run it.
    pub fn one_of(gens: Vec<Gen<T>>) -> Self {
        if gens.is_empty() {
            return Gen::error("OneOfGen", "'gens' must not be empty");
        }
        let gens = Rc::new(gens);
        index(gens.len()).bind(move |&i| gens[i as usize].clone())
    }

    /// Choose a generator with probability proportional to its weight.
    pub fn frequency(weighted: Vec<(u32, Gen<T>)>) -> Self {
        if weighted.is_empty() {
            return Gen::error("FrequencyGen", "'gens' must not be empty");
        }
        let total: u64 = weighted.iter().map(|(weight, _)| u64::from(*weight)).sum();
        if total == 0 {
            return Gen::error("FrequencyGen", "total weight must be greater than zero");
        }
        if total > u64::from(u32::MAX) {
            return Gen::error("FrequencyGen", "total weight must fit in 32 bits");
        }

        let weighted = Rc::new(weighted);
        let pick = Gen::uint32()
            .between(0, (total - 1) as u32)
            .with_bias(Bias::None)
            .build();
        pick.bind(move |&point| {
            let mut remaining = u64::from(point);
            for (weight, gen) in weighted.iter() {
                let weight = u64::from(*weight);
                if remaining < weight {
                    return gen.clone();
                }
                remaining -= weight;
            }
            // Unreachable while `point < total`.
            Gen::error("FrequencyGen", "weighted choice out of range")
        })
    }

    /// Wrap values in `Some`, occasionally producing `None`. Shrinks to `None`.
    pub fn option(&self) -> Gen<Option<T>> {
        Gen::frequency(vec![
            (1, Gen::constant(None)),
            (4, self.map(|value| Some(value.clone()))),
        ])
    }
}
