use super::*;

#[test]
fn preserves_insertion_order_across_removal_and_reinsertion() {
    let mut map = OrderedMap::new();
    map.insert("a".to_string(), 1);
    map.insert("b".to_string(), 2);
    map.insert("c".to_string(), 3);
    map.remove("b");
    map.insert("b".to_string(), 20);

    assert_eq!(map.ids(), vec!["a", "c", "b"]);
    assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![1, 3, 20]);
}

#[test]
fn drain_in_order_empties_the_map() {
    let mut map = OrderedMap::new();
    map.insert("x".to_string(), "first");
    map.insert("y".to_string(), "second");

    let drained = map.drain_in_order();
    assert_eq!(drained, vec![("x".to_string(), "first"), ("y".to_string(), "second")]);
    assert!(map.is_empty());
}
