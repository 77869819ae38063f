//! Basic example demonstrating GalaxyCheck property-based testing.

use galaxycheck::*;

fn main() {
    println!("GalaxyCheck Property-Based Testing Examples");
    println!();

    // Example 1: A property that holds
    println!("Testing integer property: x + 0 = x");
    let addition_prop = for_all(Gen::int_range(-100, 100), |&x| x + 0 == x);
    match addition_prop.check(&Config::default()) {
        Ok(result) => println!("{result}"),
        Err(error) => println!("Check errored: {error}"),
    }
    println!();

    // Example 2: A property that fails, shrunk to the boundary
    println!("Testing property that should fail: all integers are below 50");
    let below_prop = for_all(Gen::int32().between(0, 100).build(), |&x| x < 50);
    let config = Config::default().with_seed(0);
    let replay = match below_prop.check(&config) {
        Ok(result) => {
            println!("{result}");
            result.counterexample.map(|counterexample| counterexample.replay)
        }
        Err(error) => {
            println!("Check errored: {error}");
            None
        }
    };
    println!();

    // Example 3: Replaying the counterexample skips straight to it
    if let Some(replay) = replay {
        println!("Replaying {replay}");
        match below_prop.check(&Config::default().with_replay(replay)) {
            Ok(result) => println!("{result} ({})", result.termination_reason),
            Err(error) => println!("Replay errored: {error}"),
        }
        println!();
    }

    // Example 4: Assertion failures carry their message
    println!("Testing list property with an assertion");
    let list_prop = for_all(Gen::int_range(0, 100).list().build(), |xs: &Vec<i32>| {
        let total: i32 = xs.iter().sum();
        assert!(total < 200, "total was {total}");
    });
    match list_prop.check(&Config::default().with_seed(3)) {
        Ok(result) => println!("{result}"),
        Err(error) => println!("Check errored: {error}"),
    }
    println!();

    // Example 5: Discarding inputs with a precondition
    println!("Testing division with a precondition");
    let pairs = Gen::int_range(-20, 20).zip(&Gen::int_range(-5, 5));
    let division_prop = for_all(pairs, |&(a, b)| {
        precondition(b != 0);
        (a / b) * b + a % b == a
    });
    match division_prop.check(&Config::default()) {
        Ok(result) => println!("{result} ({} discards)", result.discards),
        Err(error) => println!("Check errored: {error}"),
    }
    println!();

    // Example 6: Finding the smallest value with a predicate
    println!("Smallest list with a sum of at least 30");
    match minimal(
        &Gen::int_range(0, 20).list().build(),
        |xs: &Vec<i32>| xs.iter().sum::<i32>() >= 30,
        &Config::default().with_seed(1),
    ) {
        Ok(found) => println!("  {found:?}"),
        Err(error) => println!("  {error}"),
    }
}
