use std::{
    cell::RefCell,
    fmt::Display,
    sync::{Arc, OnceLock},
};

use parking_lot::RwLock;

use crate::{
    dispatch::ProcessingReceipt, error::ConfigError, notifier::Notifier, request::Request,
};

static GLOBAL_HUB: OnceLock<Hub> = OnceLock::new();

thread_local! {
    static TL_HUB: RefCell<Option<Arc<Notifier>>> = RefCell::new(None);
}

#[derive(Default)]
struct Hub {
    notifier: RwLock<Option<Arc<Notifier>>>,
}

/// The notifier reports go to from this thread: the thread-local one if
/// configured, the process-wide one otherwise.
pub(crate) fn current() -> Option<Arc<Notifier>> {
    // the thread-local slot is gone while the thread is being torn down
    TL_HUB
        .try_with(|hub| hub.borrow().clone())
        .ok()
        .flatten()
        .or_else(|| GLOBAL_HUB.get_or_init(Default::default).notifier.read().clone())
}

/// Registers `notifier` for the whole process.
#[must_use = "the notifier is unregistered when the guard is dropped"]
pub fn configure(notifier: Notifier) -> ConfiguredNotifierGuard {
    let notifier = Arc::new(notifier);
    GLOBAL_HUB
        .get_or_init(Default::default)
        .notifier
        .write()
        .replace(notifier.clone());
    ConfiguredNotifierGuard {
        notifier,
        scope: Scope::Global,
    }
}

/// Registers `notifier` for the current thread only, taking precedence over the
/// process-wide one.
#[must_use = "the notifier is unregistered when the guard is dropped"]
pub fn configure_thread_local(notifier: Notifier) -> ConfiguredNotifierGuard {
    let notifier = Arc::new(notifier);
    TL_HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        assert!(
            hub.is_none(),
            "Attempted to configure an already-configured thread-local notifier"
        );
        hub.replace(notifier.clone());
    });
    ConfiguredNotifierGuard {
        notifier,
        scope: Scope::ThreadLocal,
    }
}

enum Scope {
    Global,
    ThreadLocal,
}

pub struct ConfiguredNotifierGuard {
    notifier: Arc<Notifier>,
    scope: Scope,
}

impl ConfiguredNotifierGuard {
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl Drop for ConfiguredNotifierGuard {
    fn drop(&mut self) {
        let is_ours = |registered: &Option<Arc<Notifier>>| {
            registered
                .as_ref()
                .map_or(false, |n| Arc::ptr_eq(n, &self.notifier))
        };

        match self.scope {
            Scope::Global => {
                if let Some(hub) = GLOBAL_HUB.get() {
                    let mut registered = hub.notifier.write();
                    if is_ours(&registered) {
                        registered.take();
                    }
                }
            }
            Scope::ThreadLocal => {
                let _ = TL_HUB.try_with(|hub| {
                    let mut registered = hub.borrow_mut();
                    if is_ours(&registered) {
                        registered.take();
                    }
                });
            }
        }

        log::debug!("Airbrake: flushing notices...");
        self.notifier.flush();
    }
}

/// Reports `err` through the current notifier, with a backtrace starting at
/// the caller. Fails with [`ConfigError::MissingApiKey`] when no notifier is
/// configured.
#[inline(never)]
pub fn notify<E: Display + ?Sized>(err: &E) -> Result<ProcessingReceipt, ConfigError> {
    report(err, None, 1)
}

/// Like [`notify`], attaching the request being served.
#[inline(never)]
pub fn report_error<E: Display + ?Sized>(
    err: &E,
    request: Option<&Request>,
) -> Result<ProcessingReceipt, ConfigError> {
    report(err, request, 1)
}

/// Runs `f` under [`Notifier::capture_panic`] of the current notifier, or just
/// runs it when none is configured.
pub fn capture_panic<F, R>(request: Option<&Request>, f: F) -> R
where
    F: FnOnce() -> R,
{
    match current() {
        Some(notifier) => notifier.capture_panic(request, f),
        None => f(),
    }
}

#[inline(never)]
pub(crate) fn report<E: Display + ?Sized>(
    err: &E,
    request: Option<&Request>,
    skip: usize,
) -> Result<ProcessingReceipt, ConfigError> {
    match current() {
        Some(notifier) => notifier.report(
            std::any::type_name::<E>(),
            err.to_string(),
            request,
            skip + 1,
        ),
        None => Err(ConfigError::MissingApiKey),
    }
}
