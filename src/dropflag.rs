//! This module is for testing only

use std::cell::RefCell;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

#[derive(Debug, Default)]
pub struct Counters {
    pub drops: usize,
    pub clones: usize,
    /// Clones that may still succeed; `None` means unlimited.
    pub clones_left: Option<usize>,
}

pub fn counters() -> DropFlag<Counters> {
    DropFlag::new(RefCell::new(Counters::default()))
}

pub fn counters_failing_after(clones: usize) -> DropFlag<Counters> {
    DropFlag::new(RefCell::new(Counters {
        clones_left: Some(clones),
        ..Counters::default()
    }))
}

/// Element that records its drops and clones, and can be told to panic in `clone`.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    pub counters: DropFlag<Counters>,
}

impl Tracked {
    pub fn new(value: i32, counters: &DropFlag<Counters>) -> Tracked {
        Tracked { value, counters: counters.clone() }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        {
            let mut counters = self.counters.borrow_mut();
            match counters.clones_left {
                Some(0) => {
                    drop(counters);
                    panic!("clone of {} refused", self.value);
                }
                Some(left) => counters.clones_left = Some(left - 1),
                None => (),
            }
            counters.clones += 1;
        }
        Tracked { value: self.value, counters: self.counters.clone() }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counters.borrow_mut().drops += 1;
    }
}

/// Number of `Tracked` values created through `new` or `clone` that are still alive.
pub fn alive(counters: &DropFlag<Counters>, created_with_new: usize) -> usize {
    let c = counters.borrow();
    created_with_new + c.clones - c.drops
}

#[test]
fn dropflag() {
    let flag = counters_failing_after(1);
    let tracked = Tracked::new(7, &flag);
    let copy = tracked.clone();
    assert_eq!(7, copy.value);
    assert_eq!(2, alive(&flag, 1));
    let refused = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tracked.clone()));
    assert!(refused.is_err());
    std::mem::drop(tracked);
    std::mem::drop(copy);
    assert_eq!(0, alive(&flag, 1));
    assert_eq!(2, flag.borrow().drops);
}
