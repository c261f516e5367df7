//! Auth lifecycle events
//!
//! Auth routes emit a closed set of events after the identity provider
//! confirms an operation. Listeners run synchronously, in registration
//! order, before the success response goes out, so a client that receives
//! 200 can immediately query data the listeners created.

use async_trait::async_trait;

/// Events emitted by the auth lifecycle routes
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedUp {
        subject_id: String,
        email: String,
    },
    SignedIn {
        subject_id: String,
        email: String,
    },
    ThirdPartySignedIn {
        subject_id: String,
        email: String,
        /// (provider id, provider user id), when the provider reported one
        provider: Option<(String, String)>,
    },
    PasswordReset {
        subject_id: String,
    },
}

/// Listener for auth events
#[async_trait]
pub trait AuthListener: Send + Sync {
    async fn on_event(&self, event: &AuthEvent) -> anyhow::Result<()>;
}

/// Ordered dispatcher for auth events
///
/// Listeners run in registration order; the first failure aborts dispatch
/// and surfaces to the caller.
#[derive(Default)]
pub struct AuthHooks {
    listeners: Vec<Box<dyn AuthListener>>,
}

impl AuthHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn AuthListener>) {
        self.listeners.push(listener);
    }

    pub async fn dispatch(&self, event: &AuthEvent) -> anyhow::Result<()> {
        for listener in &self.listeners {
            listener.on_event(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl AuthListener for Recorder {
        async fn on_event(&self, _event: &AuthEvent) -> anyhow::Result<()> {
            self.log.lock().push(self.tag);
            if self.fail {
                anyhow::bail!("listener {} failed", self.tag);
            }
            Ok(())
        }
    }

    fn event() -> AuthEvent {
        AuthEvent::SignedIn {
            subject_id: "s1".to_string(),
            email: "a@b.c".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = AuthHooks::new();
        hooks.register(Box::new(Recorder {
            tag: "first",
            log: Arc::clone(&log),
            fail: false,
        }));
        hooks.register(Box::new(Recorder {
            tag: "second",
            log: Arc::clone(&log),
            fail: false,
        }));

        hooks.dispatch(&event()).await.unwrap();
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_dispatch_aborts_on_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = AuthHooks::new();
        hooks.register(Box::new(Recorder {
            tag: "failing",
            log: Arc::clone(&log),
            fail: true,
        }));
        hooks.register(Box::new(Recorder {
            tag: "unreached",
            log: Arc::clone(&log),
            fail: false,
        }));

        assert!(hooks.dispatch(&event()).await.is_err());
        assert_eq!(*log.lock(), vec!["failing"]);
    }

    #[tokio::test]
    async fn test_each_listener_runs_exactly_once_per_event() {
        struct Counter(Arc<AtomicUsize>);

        #[async_trait]
        impl AuthListener for Counter {
            async fn on_event(&self, _event: &AuthEvent) -> anyhow::Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let mut hooks = AuthHooks::new();
        hooks.register(Box::new(Counter(Arc::clone(&count))));

        hooks.dispatch(&event()).await.unwrap();
        hooks.dispatch(&event()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
