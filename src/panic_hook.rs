use std::{any::Any, cell::RefCell, sync::Once};

use crate::stack::StackFrame;

static INSTALL: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicRecord>> = RefCell::new(None);
}

/// What the hook saw of the most recent panic on a thread.
#[derive(Debug)]
pub(crate) struct PanicRecord {
    pub(crate) class: String,
    pub(crate) message: String,
    pub(crate) backtrace: Vec<StackFrame>,
}

impl PanicRecord {
    pub(crate) fn new(payload: &(dyn Any + Send), backtrace: Vec<StackFrame>) -> Self {
        let (class, message) = describe_payload(payload);
        Self {
            class,
            message,
            backtrace,
        }
    }

    /// Whether this record was taken for a panic carrying `payload`.
    pub(crate) fn describes(&self, payload: &(dyn Any + Send)) -> bool {
        let (class, message) = describe_payload(payload);
        self.class == class && self.message == message
    }
}

/// Chains a hook in front of the current one that records the panic site of
/// every panic for the panicking thread. Installed at most once per process.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let next = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let record = PanicRecord::new(info.payload(), crate::stack::capture_panic_site());
            // the slot is gone while the thread is being torn down
            let _ = LAST_PANIC.try_with(|slot| slot.replace(Some(record)));
            next(info);
        }))
    })
}

/// Takes the record of the latest panic on this thread.
pub(crate) fn take_record() -> Option<PanicRecord> {
    LAST_PANIC
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}

macro_rules! describe_display {
    ($payload:expr, $($ty:ty),+) => {
        $(
            if let Some(value) = $payload.downcast_ref::<$ty>() {
                return (String::new(), value.to_string());
            }
        )+
    };
}

/// Splits a panic payload into an error class and message. Payloads that are
/// not errors get an empty class.
pub(crate) fn describe_payload(payload: &(dyn Any + Send)) -> (String, String) {
    if let Some(e) = payload.downcast_ref::<anyhow::Error>() {
        return ("anyhow::Error".to_owned(), e.to_string());
    }
    if let Some(e) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        return ("std::error::Error".to_owned(), e.to_string());
    }

    describe_display!(
        payload, &'static str, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
        usize, f32, f64, bool, char
    );

    (String::new(), "Box<dyn Any>".to_owned())
}
