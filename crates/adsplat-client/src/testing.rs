//! Test doubles for the client's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{ClientError, Failure, InvokeError};
use crate::invoke::Invoker;
use crate::notify::{BusyHandle, BusyIndicator, NoticeLevel, Notifier};
use crate::single_flight::Loader;

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

pub struct CountingLoader<T> {
    items: Mutex<Vec<T>>,
    calls: AtomicUsize,
    delay: Mutex<Duration>,
    failing: AtomicBool,
    panicking: AtomicBool,
}

impl<T: Clone> CountingLoader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
            failing: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_items(&self, items: Vec<T>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Loader<T> for CountingLoader<T> {
    async fn load(&self) -> Result<Vec<T>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.panicking.load(Ordering::SeqCst) {
            panic!("loader blew up");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::NoData {
                endpoint: "test",
                failure: Failure::Transport,
            });
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Scripted {
    Body(String),
    Fail(u16),
}

/// Answers each endpoint with a fixed reply; unscripted endpoints are unknown.
#[derive(Default)]
pub struct ScriptedInvoker {
    replies: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    delay: Mutex<Duration>,
}

impl ScriptedInvoker {
    pub fn reply(&self, name: &str, body: Value) {
        self.reply_raw(name, &body.to_string());
    }

    pub fn reply_raw(&self, name: &str, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(name.to_string(), Scripted::Body(body.to_string()));
    }

    /// Fail `name` as an HTTP error status with no body would.
    pub fn fail(&self, name: &str, status: u16) {
        self.replies
            .lock()
            .unwrap()
            .insert(name.to_string(), Scripted::Fail(status));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<String, InvokeError> {
        self.calls.lock().unwrap().push((name.to_string(), args));

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.replies.lock().unwrap().get(name).cloned();
        match scripted {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Fail(status)) => Err(InvokeError::Status(status)),
            None => Err(InvokeError::UnknownEndpoint(name.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingBusy {
    counters: std::sync::Arc<(AtomicUsize, AtomicUsize)>,
}

impl RecordingBusy {
    pub fn created(&self) -> usize {
        self.counters.0.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.counters.1.load(Ordering::SeqCst)
    }
}

struct RecordingBusyHandle(std::sync::Arc<(AtomicUsize, AtomicUsize)>);

impl BusyHandle for RecordingBusyHandle {
    fn destroy(&mut self) {
        self.0 .1.fetch_add(1, Ordering::SeqCst);
    }
}

impl BusyIndicator for RecordingBusy {
    fn create(&self, _description: &str) -> Box<dyn BusyHandle> {
        self.counters.0.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingBusyHandle(self.counters.clone()))
    }
}
