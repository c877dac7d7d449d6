use std::fmt::Display;

/// Reports the `Err` of a `Result` through the current notifier and hands the
/// result back untouched.
pub trait AirbrakeResult<E>: Sized {
    fn airbrake_drop(self);

    fn airbrake_if<F: Fn(&E) -> bool>(self, f: F) -> Self;

    fn airbrake(self) -> Self;
}

impl<T, E: Display + 'static> AirbrakeResult<E> for Result<T, E> {
    #[inline(never)]
    fn airbrake(self) -> Self {
        if let Err(e) = &self {
            report(e);
        }
        self
    }

    #[inline(never)]
    fn airbrake_if<F: Fn(&E) -> bool>(self, f: F) -> Self {
        if let Err(e) = &self {
            if f(e) {
                report(e);
            }
        }
        self
    }

    #[inline(never)]
    fn airbrake_drop(self) {
        if let Err(e) = &self {
            report(e);
        }
    }
}

/// Skips itself and the trait method that called it.
#[inline(never)]
fn report<E: Display + 'static>(e: &E) {
    log::error!("Airbrake: handling error {e}");
    if let Err(config_error) = crate::hub::report(e, None, 2) {
        log::debug!("Airbrake: error not reported: {config_error}");
    }
}
