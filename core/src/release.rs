/// A cleanup action that runs at most once, on demand or on drop.
pub(crate) struct Release {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl Release {
    pub(crate) fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    pub(crate) const fn noop() -> Self {
        Self { action: None }
    }

    pub(crate) fn run(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.run();
    }
}
