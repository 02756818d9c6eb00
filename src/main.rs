// Small measurement driver for Rbset instances. Loads a batch of
// random elements, audits the invariants and reports the leaf-depth
// distribution against the 2*log2(n+1) height guarantee.

use std::time::Instant;

use rand::prelude::random;

use rbset_index::Rbset;

fn main() {
    let count = 1_000_000;

    let mut index: Rbset<i64> = Rbset::new("measurement");
    let start = Instant::now();
    while index.len() < count {
        index.insert(random::<i64>()).ok();
    }
    println!(
        "loaded {} elements in {:?}",
        index.len(),
        start.elapsed()
    );

    let stats = index.validate().expect("invariants are broken");
    println!("entries: {}", stats.entries());
    println!("blacks: {:?}", stats.blacks());
    if let Some(depths) = stats.depths() {
        depths.pretty_print("measurement ");
        let bound = (2.0 * ((count + 1) as f64).log2()).ceil() as usize;
        println!("height {} within bound {}", depths.max(), bound);
    }
}
