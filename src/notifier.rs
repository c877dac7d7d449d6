use std::{
    fmt::Display,
    panic::AssertUnwindSafe,
    sync::{Arc, OnceLock},
};

use parking_lot::Mutex;

use crate::{
    config::Config,
    dispatch::{Dispatch, ProcessingReceipt},
    error::ConfigError,
    notice::Notice,
    panic_hook::PanicRecord,
    request::Request,
    transport::{HttpTransport, Transport},
};

/// Reports errors and panics to the configured endpoint.
///
/// Reporting calls only assemble a [`Notice`] and queue it; a background
/// worker, started by the first report, renders and posts queued notices one
/// at a time. Dropping the notifier waits for that worker to drain.
///
/// ```no_run
/// let notifier = airbrake::Notifier::new(
///     airbrake::Config::builder().api_key("0123456789abcdef").build(),
/// );
///
/// if let Err(e) = std::fs::read("settings.toml") {
///     notifier.notify(&e).expect("api key is set");
/// }
/// ```
pub struct Notifier {
    config: Arc<Config>,
    transport: Mutex<Option<Box<dyn Transport + Send>>>,
    dispatch: OnceLock<Dispatch>,
}

impl Notifier {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, HttpTransport::default())
    }

    pub fn with_transport<T: Transport + Send + 'static>(config: Config, transport: T) -> Self {
        crate::panic_hook::install();
        Self {
            config: Arc::new(config),
            transport: Mutex::new(Some(Box::new(transport))),
            dispatch: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reports `err` with a backtrace starting at the caller.
    #[inline(never)]
    pub fn notify<E: Display + ?Sized>(&self, err: &E) -> Result<ProcessingReceipt, ConfigError> {
        self.report(std::any::type_name::<E>(), err.to_string(), None, 1)
    }

    /// Reports `err` along with the request that was being served.
    #[inline(never)]
    pub fn report_error<E: Display + ?Sized>(
        &self,
        err: &E,
        request: Option<&Request>,
    ) -> Result<ProcessingReceipt, ConfigError> {
        self.report(std::any::type_name::<E>(), err.to_string(), request, 1)
    }

    /// Runs `f`, reporting a panic escaping it before letting the panic
    /// continue with its original payload.
    pub fn capture_panic<F, R>(&self, request: Option<&Request>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        crate::panic_hook::take_record();
        match std::panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                // `resume_unwind` bypasses the hook, so a record may be left
                // over from a panic `f` caught itself
                let record = crate::panic_hook::take_record()
                    .filter(|record| record.describes(&*payload))
                    .unwrap_or_else(|| PanicRecord::new(&*payload, crate::stack::capture(0)));
                self.report_panic(record, request);
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Returns a guard reporting the panic that unwinds through its scope.
    ///
    /// ```no_run
    /// # let notifier = airbrake::Notifier::new(airbrake::Config::builder().api_key("k").build());
    /// fn handle(notifier: &airbrake::Notifier) {
    ///     let _guard = notifier.panic_guard(None);
    ///     // a panic here is reported, then keeps unwinding
    /// }
    /// handle(&notifier);
    /// ```
    pub fn panic_guard(&self, request: Option<Request>) -> PanicGuard<'_> {
        crate::panic_hook::take_record();
        PanicGuard {
            notifier: self,
            request,
        }
    }

    /// Blocks until every notice queued so far has been handled.
    pub fn flush(&self) {
        if let Some(dispatch) = self.dispatch.get() {
            dispatch.flush();
        }
    }

    /// Assembles and queues a notice; `skip` counts the frames above `report`
    /// that belong to the reporting API.
    #[inline(never)]
    pub(crate) fn report(
        &self,
        class: &str,
        message: String,
        request: Option<&Request>,
        skip: usize,
    ) -> Result<ProcessingReceipt, ConfigError> {
        if !self.config.has_api_key() {
            return Err(ConfigError::MissingApiKey);
        }

        let notice = Notice::assemble(&self.config, class, message, request, skip + 1);
        Ok(self.dispatch().enqueue(notice))
    }

    fn report_panic(&self, record: PanicRecord, request: Option<&Request>) {
        log::error!("Airbrake: recording panic {:?}", record.message);
        if !self.config.has_api_key() {
            log::warn!("Airbrake: {}", ConfigError::MissingApiKey);
            return;
        }

        let notice = Notice::new(
            &self.config,
            &record.class,
            record.message,
            record.backtrace,
            request,
        );
        self.dispatch().enqueue(notice);
    }

    fn dispatch(&self) -> &Dispatch {
        self.dispatch.get_or_init(|| {
            log::debug!("Airbrake: starting delivery worker");
            let transport = self
                .transport
                .lock()
                .take()
                .unwrap_or_else(|| Box::new(HttpTransport::default()));
            crate::dispatch::spawn_worker(self.config.clone(), transport)
        })
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        if let Some(dispatch) = self.dispatch.get() {
            log::debug!("Airbrake: flushing notices...");
            dispatch.terminate();
        }
    }
}

/// Reports a panic unwinding through the scope that holds it. See
/// [`Notifier::panic_guard`].
#[must_use = "the guard reports panics only while it is alive"]
pub struct PanicGuard<'a> {
    notifier: &'a Notifier,
    request: Option<Request>,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let record = crate::panic_hook::take_record().unwrap_or_else(|| PanicRecord {
            class: String::new(),
            message: "unknown panic".to_owned(),
            backtrace: crate::stack::capture(0),
        });
        self.notifier.report_panic(record, self.request.as_ref());
    }
}
