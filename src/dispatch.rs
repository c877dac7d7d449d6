use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use crossbeam::channel::{bounded, Sender};

use crate::{
    config::Config,
    error::DeliveryError,
    notice::Notice,
    render::{render, CONTENT_TYPE},
    transport::Transport,
};

pub(crate) enum Message {
    Notice(Notice, ProcessingReceipt),
    Flush(ProcessingReceipt),
    Terminate(ProcessingReceipt),
}

/// Producer side of the delivery queue. The single worker thread behind it
/// delivers notices in the order they were enqueued.
pub(crate) struct Dispatch {
    sender: Sender<Message>,
}

impl Dispatch {
    /// Queues `notice` without blocking. A full queue drops the notice.
    pub(crate) fn enqueue(&self, notice: Notice) -> ProcessingReceipt {
        let receipt = ProcessingReceipt::default();
        if let Err(e) = self
            .sender
            .try_send(Message::Notice(notice, receipt.clone()))
        {
            let reason = if e.is_full() {
                "queue is full"
            } else {
                "worker is gone"
            };
            log::error!("Airbrake: dropping notice, {reason}");
            receipt.mark_processed();
        }
        receipt
    }

    /// Blocks until everything queued before this call has been handled.
    pub(crate) fn flush(&self) {
        self.control(Message::Flush)
    }

    pub(crate) fn terminate(&self) {
        self.control(Message::Terminate)
    }

    fn control(&self, message: fn(ProcessingReceipt) -> Message) {
        let receipt = ProcessingReceipt::default();
        if self.sender.send(message(receipt.clone())).is_ok() {
            receipt.wait_processed();
        }
    }
}

pub(crate) fn spawn_worker(config: Arc<Config>, mut transport: Box<dyn Transport + Send>) -> Dispatch {
    let (sender, receiver) = bounded(config.queue_capacity());
    std::thread::spawn(move || {
        while let Ok(msg) = receiver.recv() {
            match msg {
                Message::Notice(notice, receipt) => {
                    let res = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        deliver(&config, transport.as_mut(), &notice)
                    }));
                    match res {
                        Ok(Ok(())) => log::debug!(
                            "Airbrake: delivered notice {:?} ({})",
                            notice.error_message,
                            notice.error_class
                        ),
                        Ok(Err(e)) => log::error!("Airbrake: failed delivering notice: {e}"),
                        Err(_) => log::error!("Airbrake: transport panicked while delivering notice"),
                    }
                    receipt.mark_processed();
                }
                Message::Flush(receipt) => receipt.mark_processed(),
                Message::Terminate(receipt) => {
                    log::debug!("Airbrake: worker received termination signal");
                    receipt.mark_processed();
                    break;
                }
            }
        }

        log::debug!("Airbrake: worker thread terminating")
    });

    Dispatch { sender }
}

fn deliver(config: &Config, transport: &mut dyn Transport, notice: &Notice) -> Result<(), DeliveryError> {
    let body = render(notice)?;

    if config.verbose {
        log::info!(
            "Airbrake payload for endpoint {}: {}",
            config.endpoint,
            String::from_utf8_lossy(&body)
        );
    }

    let response = transport
        .post(&config.endpoint, CONTENT_TYPE, body)
        .map_err(DeliveryError::Transport)?;

    if config.verbose || !response.is_success() {
        log::info!("Airbrake response: {}", response.body);
        log::info!(
            "Airbrake post: {:?} ({}) status code: {}",
            notice.error_message,
            notice.error_class,
            response.status
        );
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::BadResponse {
            status: response.status,
        })
    }
}

/// Marked once the worker is done with a notice, whether it was delivered,
/// failed or dropped.
#[derive(Default, Clone)]
pub struct ProcessingReceipt {
    cond: Arc<(parking_lot::Mutex<bool>, parking_lot::Condvar)>,
}

impl ProcessingReceipt {
    pub(crate) fn mark_processed(&self) {
        let mut locked = self.cond.0.lock();
        *locked = true;
        self.cond.1.notify_all();
    }

    pub fn is_processed(&self) -> bool {
        *self.cond.0.lock()
    }

    pub fn wait_processed(&self) {
        let mut finished = self.cond.0.lock();
        while !*finished {
            self.cond.1.wait(&mut finished);
        }
    }

    /// Returns whether the notice was processed before `timeout` elapsed.
    pub fn wait_processed_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut finished = self.cond.0.lock();
        while !*finished {
            if self.cond.1.wait_until(&mut finished, deadline).timed_out() {
                break;
            }
        }
        *finished
    }
}
