use super::*;
use std::cell::RefCell;

#[test]
fn fires_handlers_in_registration_order() {
    let mut list: HandlerList<u32> = HandlerList::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let seen1 = seen.clone();
    list.register(move |n| seen1.borrow_mut().push(("first", *n)));
    let seen2 = seen.clone();
    list.register(move |n| seen2.borrow_mut().push(("second", *n)));

    fire(&list.snapshot(), &7);
    assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
}

#[test]
fn removed_handler_does_not_fire() {
    let mut list: HandlerList<u32> = HandlerList::new();
    let fired = Rc::new(RefCell::new(false));
    let fired_clone = fired.clone();
    let id = list.register(move |_| *fired_clone.borrow_mut() = true);

    list.remove(id);
    fire(&list.snapshot(), &1);

    assert!(!*fired.borrow());
}

#[test]
fn a_handler_may_register_another_handler_on_the_same_list() {
    let list: Rc<RefCell<HandlerList<u32>>> = Rc::new(RefCell::new(HandlerList::new()));
    let inner_fired = Rc::new(RefCell::new(false));

    let list_for_outer = list.clone();
    let inner_fired_for_outer = inner_fired.clone();
    list.borrow_mut().register(move |_n| {
        let inner_fired = inner_fired_for_outer.clone();
        list_for_outer.borrow_mut().register(move |_| *inner_fired.borrow_mut() = true);
    });

    let snapshot = list.borrow().snapshot();
    fire(&snapshot, &1);
    assert!(!*inner_fired.borrow(), "handler added during fan-out must not join the current fan-out");

    let snapshot = list.borrow().snapshot();
    fire(&snapshot, &1);
    assert!(*inner_fired.borrow(), "but fires on the next dispatch");
}
