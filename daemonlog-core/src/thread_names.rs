use std::{
    collections::HashMap,
    thread::{self, ThreadId},
};

use parking_lot::RwLock;

/// Human readable labels for the threads logging through an engine.
///
/// A thread only ever registers its own name. Threads that never register
/// render with an empty label.
#[derive(Default, Debug)]
pub struct ThreadNames {
    names: RwLock<HashMap<ThreadId, String>>,
}

impl ThreadNames {
    pub fn set_current(&self, name: &str) {
        self.names
            .write()
            .insert(thread::current().id(), name.to_owned());
    }

    pub fn current(&self) -> String {
        self.names
            .read()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.names.write().clear();
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unregistered_thread_is_empty() {
        let names = ThreadNames::default();
        assert_eq!(names.current(), "");
    }

    #[test]
    fn test_names_are_per_thread() {
        let names = Arc::new(ThreadNames::default());
        names.set_current("main");
        let other = Arc::clone(&names);
        let seen = thread::spawn(move || {
            let before = other.current();
            other.set_current("worker");
            (before, other.current())
        })
        .join()
        .unwrap();
        assert_eq!(seen, (String::new(), "worker".to_string()));
        assert_eq!(names.current(), "main");
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_rename_and_clear() {
        let names = ThreadNames::default();
        names.set_current("first");
        names.set_current("second");
        assert_eq!(names.current(), "second");
        assert_eq!(names.len(), 1);
        names.clear();
        assert!(names.is_empty());
        assert_eq!(names.current(), "");
    }
}
