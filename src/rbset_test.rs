use std::time::{SystemTime, UNIX_EPOCH};

use rand::prelude::random;
use rand::{rngs::SmallRng, SeedableRng};

use crate::error::RbsetError;
use crate::rbset::Rbset;

#[test]
fn test_id() {
    let index: Rbset<i64> = Rbset::new("test-rbset");
    assert_eq!(index.id(), "test-rbset".to_string());
}

#[test]
fn test_len() {
    let index: Rbset<i64> = Rbset::new("test-rbset");
    assert_eq!(index.len(), 0);
    assert!(index.is_empty());
}

#[test]
fn test_insert() {
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    let mut refns = RefSet::new(10);

    for element in [2, 1, 3, 6, 5, 4, 8, 0, 9, 7].iter() {
        assert!(index.insert(*element).is_ok());
        assert!(refns.insert(*element));
        assert!(index.validate().is_ok());
    }

    assert_eq!(index.len(), 10);
    assert!(!index.is_empty());

    // duplicate case, the rejected element comes back
    assert_eq!(index.insert(7), Err(RbsetError::DuplicateElement(7)));
    assert_eq!(index.len(), 10);
    assert!(index.validate().is_ok());

    // membership is untouched by the failed insert
    for i in 0..10 {
        assert_eq!(index.contains(&i), refns.contains(i));
    }
    assert!(!index.contains(&10));
    assert!(!index.contains(&-1));
}

#[test]
fn test_load_from() {
    let index = Rbset::load_from("test-rbset", 0..10).unwrap();
    assert_eq!(index.len(), 10);
    assert!(index.validate().is_ok());
    for i in 0..10 {
        assert!(index.contains(&i));
    }

    let res = Rbset::load_from("test-rbset", [1, 2, 1].iter().cloned());
    assert_eq!(res.err(), Some(RbsetError::DuplicateElement(1)));
}

#[test]
fn test_remove() {
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    let mut refns = RefSet::new(11);

    for element in [2, 1, 3, 6, 5, 4, 8, 0, 9, 7].iter() {
        assert!(index.insert(*element).is_ok());
        refns.insert(*element);
    }

    // remove a missing element.
    assert!(!index.remove(&10));
    assert!(!refns.remove(10));
    assert_eq!(index.len(), 10);
    assert!(index.validate().is_ok());

    // remove all elements, validating after every step.
    for i in 0..10 {
        assert_eq!(index.remove(&i), refns.remove(i));
        assert!(index.validate().is_ok());
    }
    assert_eq!(index.len(), 0);
    assert!(index.is_empty());
    assert_eq!(index.find_min(), None);
    assert_eq!(index.find_max(), None);

    // a second remove is a miss.
    assert!(!index.remove(&5));
}

#[test]
fn test_min_max() {
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    assert_eq!(index.find_min(), None);
    assert_eq!(index.find_max(), None);

    for element in [42, 7, 100, -3, 55].iter() {
        index.insert(*element).unwrap();
    }
    assert_eq!(index.find_min(), Some(-3));
    assert_eq!(index.find_max(), Some(100));

    index.remove(&-3);
    index.remove(&100);
    assert_eq!(index.find_min(), Some(7));
    assert_eq!(index.find_max(), Some(55));
}

#[test]
fn test_successor() {
    let index = Rbset::load_from("test-rbset", [1, 3, 5, 7].iter().cloned()).unwrap();

    assert_eq!(index.find_successor(&1), Some(3));
    assert_eq!(index.find_successor(&3), Some(5));
    assert_eq!(index.find_successor(&5), Some(7));
    // maximum has no successor
    assert_eq!(index.find_successor(&7), None);
    // absent element has no successor
    assert_eq!(index.find_successor(&4), None);
    assert_eq!(index.find_successor(&0), None);
}

#[test]
fn test_scenario() {
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    for element in [10, 20, 30, 15, 25, 5].iter() {
        index.insert(*element).unwrap();
    }

    assert_eq!(index.find_min(), Some(5));
    assert_eq!(index.find_max(), Some(30));
    assert!(index.contains(&15));

    assert!(index.remove(&20));
    assert!(!index.contains(&20));
    assert!(index.validate().is_ok());
    assert!(!index.remove(&20));
}

#[test]
fn test_clear() {
    let mut index = Rbset::load_from("test-rbset", 0..100).unwrap();
    index.clear();

    assert_eq!(index.len(), 0);
    assert!(index.is_empty());
    assert_eq!(index.find_min(), None);
    assert!(!index.contains(&42));

    // the instance is reusable after clear.
    for i in 0..10 {
        assert!(index.insert(i).is_ok());
    }
    assert_eq!(index.len(), 10);
    assert!(index.validate().is_ok());
}

#[test]
fn test_random() {
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    let mut rng = SmallRng::from_seed(make_seed().to_le_bytes());

    assert_eq!(index.random(&mut rng), None);

    index.insert(0).unwrap();
    assert_eq!(index.random(&mut rng), Some(0));
    assert_eq!(index.random(&mut rng), Some(0));

    for element in 1..1_000 {
        assert!(index.insert(element).is_ok());
    }
    for _i in 0..10_000 {
        let element = index.random(&mut rng).unwrap();
        assert!(element >= 0 && element < 1_000);
        assert!(index.contains(&element));
    }
}

#[test]
fn test_round_trip() {
    let size = 1_000;
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    let mut refns = RefSet::new(size);

    for _ in 0..(size * 4) {
        let element: i64 = (random::<i64>() % (size as i64)).abs();
        assert_eq!(index.insert(element).is_ok(), refns.insert(element));
    }
    assert_eq!(index.len(), refns.len());
    assert!(index.validate().is_ok());

    for element in refns.iter() {
        assert!(index.remove(&element));
    }
    assert!(index.is_empty());
    assert_eq!(index.find_min(), None);
    assert_eq!(index.find_max(), None);
    assert!(index.validate().is_ok());
}

#[test]
fn test_crud() {
    let size = 200;
    let mut index: Rbset<i64> = Rbset::new("test-rbset");
    let mut refns = RefSet::new(size);

    for _ in 0..20_000 {
        let element: i64 = (random::<i64>() % (size as i64)).abs();
        let op: i64 = (random::<i64>() % 4).abs();
        match op {
            0 => {
                let ok = refns.insert(element);
                assert_eq!(index.insert(element).is_ok(), ok);
            }
            1 => {
                assert_eq!(index.remove(&element), refns.remove(element));
            }
            2 => {
                assert_eq!(index.contains(&element), refns.contains(element));
            }
            3 => {
                assert_eq!(index.find_successor(&element), refns.find_successor(element));
            }
            op => panic!("unreachable {}", op),
        };

        assert_eq!(index.len(), refns.len());
        assert!(index.validate().is_ok());
    }

    assert_eq!(index.find_min(), refns.find_min());
    assert_eq!(index.find_max(), refns.find_max());

    // walk the successor chain, it must reproduce the sorted members.
    let mut walk = index.find_min();
    let mut iter_ref = refns.iter();
    while let Some(element) = walk {
        assert_eq!(Some(element), iter_ref.next());
        walk = index.find_successor(&element);
    }
    assert_eq!(iter_ref.next(), None);
}

#[test]
fn test_height_bound() {
    for size in [64_i64, 1_024].iter().cloned() {
        // ascending insertion order is the adversarial case.
        let index = Rbset::load_from("test-rbset", 0..size).unwrap();
        let stats = index.validate().unwrap();
        let height = stats.depths().unwrap().max();
        let bound = (2.0 * ((size + 1) as f64).log2()).ceil() as usize;
        assert!(height <= bound, "height {} bound {}", height, bound);

        // and a randomized set of the same cardinality.
        let mut index: Rbset<i64> = Rbset::new("test-rbset");
        while index.len() < (size as usize) {
            index.insert(random::<i64>()).ok();
        }
        let stats = index.validate().unwrap();
        let height = stats.depths().unwrap().max();
        assert!(height <= bound, "height {} bound {}", height, bound);
    }
}

fn make_seed() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

include!("./ref_test.rs");
