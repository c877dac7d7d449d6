use airbrake::{
    prelude::*,
    transport::{Response, Transport},
    Config, Notifier,
};
use std::{panic::AssertUnwindSafe, sync::Arc};

#[derive(Default, Clone)]
pub struct TestTransport {
    target: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl Transport for TestTransport {
    fn post(&mut self, _url: &str, _content_type: &str, body: Vec<u8>) -> anyhow::Result<Response> {
        self.target.lock().push(String::from_utf8(body)?);
        Ok(Response {
            status: 200,
            body: String::new(),
        })
    }
}

fn configure() -> (
    airbrake::ConfiguredNotifierGuard,
    Arc<parking_lot::Mutex<Vec<String>>>,
) {
    let transport = TestTransport::default();
    let target = transport.target.clone();
    let guard = airbrake::configure_thread_local(Notifier::with_transport(
        Config::builder().api_key("key").build(),
        transport,
    ));
    (guard, target)
}

fn first_method(body: &str) -> &str {
    const LINE: &str = r#"<line method=""#;
    let rest = &body[body.find(LINE).expect("No backtrace line") + LINE.len()..];
    &rest[..rest.find('"').expect("Unterminated method")]
}

#[test]
fn test_unconfigured() {
    assert_eq!(
        airbrake::notify("nobody listens").err(),
        Some(airbrake::ConfigError::MissingApiKey)
    );
    assert_eq!(airbrake::capture_panic(None, || 5), 5);

    let res: Result<(), &str> = Err("nobody listens");
    assert_eq!(res.airbrake(), Err("nobody listens"));
}

#[test]
fn test_notify() {
    let (_guard, target) = configure();

    airbrake::notify("from hub").unwrap().wait_processed();

    let bodies = target.lock();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("<message>from hub</message>"));
    assert!(first_method(&bodies[0]).ends_with("test_hub::test_notify"));
}

#[test]
fn test_result_extension() {
    let (guard, target) = configure();

    let missing = std::fs::read("/definitely/not/here").airbrake();
    assert!(missing.is_err());
    Err::<(), _>(std::fmt::Error).airbrake_if(|_| false).ok();
    Err::<(), _>(std::fmt::Error).airbrake_drop();
    guard.notifier().flush();

    let bodies = target.lock();
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].contains(&format!(
        "<class>{}</class>",
        std::any::type_name::<std::io::Error>()
    )));
    assert!(first_method(&bodies[0]).ends_with("test_result_extension"));
    assert!(bodies[1].contains(&format!(
        "<class>{}</class>",
        std::any::type_name::<std::fmt::Error>()
    )));
    assert!(first_method(&bodies[1]).ends_with("test_result_extension"));
}

#[test]
fn test_capture_panic() {
    let (guard, target) = configure();

    let res = std::panic::catch_unwind(AssertUnwindSafe(|| {
        airbrake::capture_panic(None, || -> u8 { panic!("worker crashed") })
    }));
    guard.notifier().flush();

    assert_eq!(res.unwrap_err().downcast_ref::<&str>(), Some(&"worker crashed"));
    let bodies = target.lock();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("<class>Panic</class>"));
    assert!(bodies[0].contains("<message>worker crashed</message>"));
}

#[test]
fn test_guard_unregisters() {
    let (guard, _target) = configure();
    drop(guard);

    assert_eq!(
        airbrake::notify("gone").err(),
        Some(airbrake::ConfigError::MissingApiKey)
    );
    // a new thread-local notifier can be configured again
    let (_guard, _target) = configure();
}

struct NotifyOnExit(crossbeam::channel::Sender<bool>);

impl Drop for NotifyOnExit {
    fn drop(&mut self) {
        let unconfigured = airbrake::notify("thread exiting").is_err();
        let _ = self.0.send(unconfigured);
    }
}

thread_local! {
    static ON_EXIT: std::cell::RefCell<Option<NotifyOnExit>> = std::cell::RefCell::new(None);
}

#[test]
fn test_notify_during_thread_teardown() {
    let (sender, receiver) = crossbeam::channel::bounded(1);

    std::thread::spawn(move || {
        ON_EXIT.with(|slot| *slot.borrow_mut() = Some(NotifyOnExit(sender)));
        // registered after `ON_EXIT`, so torn down before it
        assert!(airbrake::notify("still running").is_err());
    })
    .join()
    .unwrap();

    assert_eq!(receiver.recv().ok(), Some(true));
}
