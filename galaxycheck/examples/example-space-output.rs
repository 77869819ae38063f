//! Demo of example space rendering.

use galaxycheck::*;

fn main() {
    println!("Example Space Rendering Demo");
    println!("============================");
    println!();

    let config = Config::default().with_seed(42).with_size(Size::new(60));

    // Example 1: Integer with shrinking
    println!("1. Integer Generator (range 0-20)");
    match sample_example_space(&Gen::int_range(0, 20), &config) {
        Ok(space) => {
            println!("Generated: {}", space.current().value);
            println!();
            println!("Tree down to depth 2:");
            print!("{}", space.render(2));
            println!("Compact: {}", space.render_compact(2));
            println!("Shrinks: {}", space.render_shrinks());
            println!("Nodes to depth 3: {}", space.count_to_depth(3));
        }
        Err(error) => println!("Error: {error}"),
    }
    println!();

    // Example 2: Shrinking towards a custom origin
    println!("2. Integer shrinking towards 100");
    let towards = Gen::int32().between(0, 200).shrink_towards(100).build();
    match sample_example_space(&towards, &config) {
        Ok(space) => println!("{}", space.render_shrinks()),
        Err(error) => println!("Error: {error}"),
    }
    println!();

    // Example 3: Lists expose their candidates in order
    println!("3. List Generator");
    let list = Gen::int_range(5, 15).list().with_count_between(1, 4).build();
    match sample_example_space(&list, &config) {
        Ok(space) => {
            println!("Generated: {:?}", space.current().value);
            for (index, child) in space.subspace().enumerate().take(8) {
                let example = child.current();
                println!("  [{index}] {:?} (distance {:.2})", example.value, example.distance);
            }
        }
        Err(error) => println!("Error: {error}"),
    }
    println!();

    // Example 4: Booleans shrink to false
    println!("4. Boolean Generator");
    match sample_example_space(&Gen::bool(), &config) {
        Ok(space) => println!("Boolean: {}", space.render_shrinks()),
        Err(error) => println!("Error: {error}"),
    }
}
