//! Per-thread "last raised error" slot used by status-code returning C entry points

use std::cell::RefCell;

use super::Error;

thread_local! {
    static RAISED: RefCell<Option<Error>> = const { RefCell::new(None) };
}

/// Store an error for the caller of the current C entry point, replacing any previous one
pub fn set_raised(error: Error) {
    RAISED.with(|slot| *slot.borrow_mut() = Some(error));
}

/// Move the raised error out of the slot
pub fn take_raised() -> Option<Error> {
    RAISED.with(|slot| slot.borrow_mut().take())
}

pub fn has_raised() -> bool {
    RAISED.with(|slot| slot.borrow().is_some())
}
