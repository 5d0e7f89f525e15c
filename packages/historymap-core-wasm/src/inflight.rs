// In-flight fetch table: while a record's first fetch/create sequence runs,
// its promise lives here so concurrent callers for the same id join it
// instead of issuing a duplicate fetch. Promises are not Send, so this
// lives in thread-local storage rather than the shared registry global.
use js_sys::Promise;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static IN_FLIGHT: RefCell<HashMap<String, Promise>> = RefCell::new(HashMap::new());
}

pub fn get(record_id: &str) -> Option<Promise> {
    IN_FLIGHT.with(|table| table.borrow().get(record_id).cloned())
}

pub fn insert(record_id: &str, promise: Promise) {
    IN_FLIGHT.with(|table| {
        table.borrow_mut().insert(record_id.to_string(), promise);
    });
}

/// Remove the marker once creation settles, success or failure, so a failed
/// fetch can be retried by the user.
pub fn remove(record_id: &str) {
    IN_FLIGHT.with(|table| {
        table.borrow_mut().remove(record_id);
    });
}

pub fn count() -> usize {
    IN_FLIGHT.with(|table| table.borrow().len())
}
