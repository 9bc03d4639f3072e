use std::fmt;

type Callback<T> = Box<dyn FnOnce(Option<T>) + Send + 'static>;

/// Single-assignment result slot for an asynchronous platform call.
///
/// `resolve` consumes the slot, so a value can be delivered at most once.
/// Dropping an unresolved slot delivers `None`, which lets the receiver treat
/// the request as abandoned instead of waiting forever.
pub struct Completion<T> {
    callback: Option<Callback<T>>,
}

impl<T> Completion<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Option<T>) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn resolve(mut self, value: T) {
        if let Some(callback) = self.callback.take() {
            callback(Some(value));
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            log::debug!("completion dropped without a result");
            callback(None);
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}
