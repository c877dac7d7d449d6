//! Call-stack capture for notices.

use backtrace::{Backtrace, BacktraceFrame};

/// Function name recorded for frames whose symbol cannot be resolved.
pub const UNKNOWN_FUNCTION: &str = "???";

const WALK_FUNCTION: &str = concat!(module_path!(), "::walk");

/// Frames implementing panic dispatch and recovery. They carry no information
/// about where the application failed.
const PANIC_MACHINERY: &[&str] = &[
    "std::panicking::",
    "std::panic::",
    "core::panicking::",
    "core::panic::",
    "core::option::expect_failed",
    "core::option::unwrap_failed",
    "core::result::unwrap_failed",
    "std::sys::backtrace::",
    "std::sys_common::backtrace::",
    "panic_unwind::",
    "rust_begin_unwind",
    "rust_panic",
    "__rust_",
    "_rust_",
];

/// `Option`/`Result` accessors that only show up on the stack when they panic.
const PANICKING_ACCESSORS: &[&str] = &[
    "core::option::Option<T>::unwrap",
    "core::option::Option<T>::expect",
    "core::result::Result<T,E>::unwrap",
    "core::result::Result<T,E>::expect",
    "core::result::Result<T,E>::unwrap_err",
    "core::result::Result<T,E>::expect_err",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// Captures the current call stack, innermost call first.
///
/// `skip` counts frames above the caller of `capture` to leave out, so
/// `capture(0)` starts at the function that called it. Panic machinery frames
/// are never included.
#[inline(never)]
pub fn capture(skip: usize) -> Vec<StackFrame> {
    walk()
        .into_iter()
        .skip(skip + 1)
        .filter(|frame| !is_panic_machinery(&frame.function))
        .collect()
}

/// Captures the stack from inside a panic hook, starting at the frame that
/// raised the panic.
#[inline(never)]
pub(crate) fn capture_panic_site() -> Vec<StackFrame> {
    let frames = walk();
    let start = match frames
        .iter()
        .position(|frame| is_panic_machinery(&frame.function))
    {
        Some(first) => {
            first
                + frames[first..]
                    .iter()
                    .take_while(|frame| is_panic_machinery(&frame.function))
                    .count()
        }
        None => 1,
    };

    frames
        .into_iter()
        .skip(start)
        .filter(|frame| !is_panic_machinery(&frame.function))
        .collect()
}

/// Resolves every logical frame (inlined calls included) above `walk` itself.
#[inline(never)]
fn walk() -> Vec<StackFrame> {
    let backtrace = Backtrace::new();
    let mut frames: Vec<StackFrame> = backtrace.frames().iter().flat_map(resolve).collect();

    let start = own_frames(&frames);
    frames.split_off(start)
}

/// Number of leading frames belonging to `walk` and the capturer it calls.
fn own_frames(frames: &[StackFrame]) -> usize {
    let end = match frames.iter().position(|f| f.function == WALK_FUNCTION) {
        Some(own) => own + 1,
        // `walk` cannot be named without symbols; it sits right below the capturer
        None => {
            frames
                .iter()
                .take_while(|f| is_capture_machinery(&f.function))
                .count()
                + 1
        }
    };
    end.min(frames.len())
}

fn resolve(frame: &BacktraceFrame) -> Vec<StackFrame> {
    let symbols = frame.symbols();
    if symbols.is_empty() {
        return vec![StackFrame {
            function: UNKNOWN_FUNCTION.to_owned(),
            file: String::new(),
            line: 0,
        }];
    }

    symbols
        .iter()
        .map(|symbol| StackFrame {
            function: symbol
                .name()
                .map(|name| normalize(&format!("{:#}", name)))
                .unwrap_or_else(|| UNKNOWN_FUNCTION.to_owned()),
            file: symbol
                .filename()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_default(),
            line: symbol.lineno().unwrap_or(0),
        })
        .collect()
}

/// Reduces a symbol name to its last path segment, turning the center dot
/// some toolchains use in generated names into a period.
///
/// ```
/// assert_eq!(airbrake::stack::normalize("net/http.func·011"), "http.func.011");
/// assert_eq!(airbrake::stack::normalize("runtime.panic"), "runtime.panic");
/// ```
pub fn normalize(name: &str) -> String {
    let name = match name.rfind('/') {
        Some(separator) => &name[separator + 1..],
        None => name,
    };
    name.replace('·', ".")
}

pub(crate) fn is_panic_machinery(function: &str) -> bool {
    // newer toolchains export the panic entry points under `__rustc::`
    let function = function.strip_prefix("__rustc::").unwrap_or(function);
    PANIC_MACHINERY
        .iter()
        .any(|prefix| function.starts_with(prefix))
        || PANICKING_ACCESSORS.contains(&function)
}

fn is_capture_machinery(function: &str) -> bool {
    function.starts_with("backtrace::") || function.starts_with("<backtrace::")
}
