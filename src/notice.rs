use crate::{
    config::Config,
    request::{Request, RequestContext},
    stack::StackFrame,
};

/// Class reported for failures whose type name is empty.
pub const PANIC_CLASS: &str = "Panic";

/// One assembled error report. A notice is a plain value: once it has been
/// queued for delivery nothing touches it again.
#[derive(Clone, Debug)]
pub struct Notice {
    pub(crate) api_key: String,
    pub(crate) error_class: String,
    pub(crate) error_message: String,
    pub(crate) backtrace: Vec<StackFrame>,
    pub(crate) hostname: String,
    pub(crate) project_root: String,
    pub(crate) environment: String,
    pub(crate) version: String,
    pub(crate) request: Option<RequestContext>,
}

impl Notice {
    /// Assembles a notice, capturing the backtrace `skip` frames above the
    /// caller of `assemble`.
    #[inline(never)]
    pub(crate) fn assemble(
        config: &Config,
        class: &str,
        message: String,
        request: Option<&Request>,
        skip: usize,
    ) -> Self {
        let backtrace = crate::stack::capture(skip + 1);
        Self::new(config, class, message, backtrace, request)
    }

    pub(crate) fn new(
        config: &Config,
        class: &str,
        message: String,
        backtrace: Vec<StackFrame>,
        request: Option<&Request>,
    ) -> Self {
        let request = request.and_then(
            |request| match RequestContext::parse(request, config.pretty_params) {
                Ok(context) => Some(context),
                Err(e) => {
                    log::warn!(
                        "Airbrake: leaving request {} out of notice: {e}",
                        request.url
                    );
                    None
                }
            },
        );

        Self {
            api_key: config.api_key.clone(),
            error_class: error_class(class),
            error_message: message,
            backtrace,
            hostname: config.hostname.clone(),
            project_root: config.project_root.clone(),
            environment: config.environment.clone(),
            version: config.version.clone(),
            request,
        }
    }

    pub fn error_class(&self) -> &str {
        &self.error_class
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn backtrace(&self) -> &[StackFrame] {
        &self.backtrace
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }
}

/// Maps a type name to the class reported for it.
pub fn error_class(type_name: &str) -> String {
    if type_name.is_empty() {
        PANIC_CLASS.to_owned()
    } else {
        type_name.to_owned()
    }
}
