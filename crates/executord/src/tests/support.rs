//! Harness for driving the input loop against scripted workers.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use executor_worker::{CallOutput, CallRequest, WorkerError, WorkerHandle};
use mockall::mock;

use crate::dispatch::{DispatchError, Dispatcher, DispatcherThread, serve};

/// How long a test waits for the loop before giving up.
const PATIENCE: Duration = Duration::from_secs(5);

mock! {
    pub Worker {}
    impl WorkerHandle for Worker {
        fn ensure_child(&mut self) -> Result<(), WorkerError>;
        fn prepare_for_course(&mut self, course_root: &Path) -> Result<(), WorkerError>;
        fn call(&mut self, request: &CallRequest) -> Result<CallOutput, WorkerError>;
        fn restart(&mut self) -> Result<bool, WorkerError>;
        fn done(&mut self);
    }
}

/// A worker that starts cleanly and accepts any course root.
pub fn ready_worker() -> MockWorker {
    let mut worker = MockWorker::new();
    worker.expect_ensure_child().returning(|| Ok(()));
    worker.expect_prepare_for_course().returning(|_| Ok(()));
    worker
}

/// Workers handed out in order each time the dispatcher needs one.
#[derive(Clone, Default)]
pub struct WorkerQueue {
    workers: Arc<Mutex<VecDeque<MockWorker>>>,
}

impl WorkerQueue {
    pub fn new(workers: impl IntoIterator<Item = MockWorker>) -> Self {
        Self {
            workers: Arc::new(Mutex::new(workers.into_iter().collect())),
        }
    }

    pub fn push(&self, worker: MockWorker) {
        self.workers.lock().expect("worker queue lock").push_back(worker);
    }

    pub fn factory(&self) -> impl Fn() -> MockWorker + Send + 'static {
        let workers = Arc::clone(&self.workers);
        move || {
            workers
                .lock()
                .expect("worker queue lock")
                .pop_front()
                .expect("test supplied too few workers")
        }
    }

    pub fn remaining(&self) -> usize {
        self.workers.lock().expect("worker queue lock").len()
    }
}

/// Response stream shared between the dispatcher and the test.
#[derive(Clone, Default)]
pub struct SharedOutput {
    inner: Arc<(Mutex<Vec<u8>>, Condvar)>,
}

impl SharedOutput {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.inner.0.lock().expect("output lock");
        split_lines(&bytes)
    }

    /// Blocks until at least `count` complete lines have been written.
    pub fn wait_for_lines(&self, count: usize) -> Vec<String> {
        let (buffer, written) = &*self.inner;
        let guard = buffer.lock().expect("output lock");
        let (guard, timeout) = written
            .wait_timeout_while(guard, PATIENCE, |bytes| {
                bytes.iter().filter(|byte| **byte == b'\n').count() < count
            })
            .expect("output lock");
        assert!(
            !timeout.timed_out(),
            "expected {count} response lines, got {:?}",
            split_lines(&guard)
        );
        split_lines(&guard)
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (buffer, written) = &*self.inner;
        buffer.lock().expect("output lock").extend_from_slice(buf);
        written.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Line source that reports every time the loop asks for the next line.
///
/// A pull means the loop has finished admitting or discarding the previous
/// line, which lets tests sequence input without sleeping.
pub struct ScriptedInput {
    lines: Receiver<io::Result<Vec<u8>>>,
    pulls: Sender<()>,
}

impl Iterator for ScriptedInput {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        drop(self.pulls.send(()));
        self.lines.recv().ok()
    }
}

/// Runs [`serve`] on a background thread over scripted input.
pub struct ServeHarness {
    lines: Option<Sender<io::Result<Vec<u8>>>>,
    pulls: Receiver<()>,
    output: SharedOutput,
    serving: Option<JoinHandle<Result<DispatcherThread, DispatchError>>>,
}

impl ServeHarness {
    pub fn start(workers: &WorkerQueue) -> Self {
        let output = SharedOutput::default();
        Self::start_writing_to(workers, output.clone(), output)
    }

    /// Starts the loop writing responses to `sink` instead of the shared
    /// output.
    pub fn start_writing_to<O>(workers: &WorkerQueue, sink: O, output: SharedOutput) -> Self
    where
        O: Write + Send + 'static,
    {
        let (line_sender, line_receiver) = mpsc::channel();
        let (pull_sender, pull_receiver) = mpsc::channel();
        let input = ScriptedInput {
            lines: line_receiver,
            pulls: pull_sender,
        };
        let dispatcher = Dispatcher::start(workers.factory(), "/course", sink);
        let serving = thread::spawn(move || serve(input, dispatcher));

        let harness = Self {
            lines: Some(line_sender),
            pulls: pull_receiver,
            output,
            serving: Some(serving),
        };
        harness.wait_for_pull();
        harness
    }

    /// Sends a line and waits until the loop has admitted or discarded it.
    pub fn feed(&self, line: &str) {
        self.feed_bytes(line.as_bytes());
    }

    /// Sends raw bytes as one line and waits until the loop has taken it.
    pub fn feed_bytes(&self, line: &[u8]) {
        self.send(Ok(line.to_vec()));
        self.wait_for_pull();
    }

    /// Sends a line and waits for the response it produces.
    pub fn request(&self, line: &str) -> String {
        self.request_bytes(line.as_bytes())
    }

    /// Sends raw bytes as one line and waits for the response.
    pub fn request_bytes(&self, line: &[u8]) -> String {
        let expected = self.output.lines().len() + 1;
        self.feed_bytes(line);
        self.output
            .wait_for_lines(expected)
            .pop()
            .expect("a response was written")
    }

    /// Makes the next read fail.
    pub fn fail_read(&self) {
        self.send(Err(io::Error::other("stdin vanished")));
    }

    pub const fn output(&self) -> &SharedOutput {
        &self.output
    }

    /// Whether input is still open.
    pub const fn is_serving(&self) -> bool {
        self.serving.is_some()
    }

    /// Closes input and returns what the loop returned.
    pub fn close_input(&mut self) -> Result<DispatcherThread, DispatchError> {
        self.lines.take();
        self.serving
            .take()
            .expect("input closed once")
            .join()
            .expect("serve thread panicked")
    }

    /// Closes input and waits for every admitted request to be answered.
    pub fn finish(&mut self) -> Result<(), DispatchError> {
        self.close_input()?.join()
    }

    fn send(&self, line: io::Result<Vec<u8>>) {
        self.lines
            .as_ref()
            .expect("input still open")
            .send(line)
            .expect("serve loop is reading");
    }

    fn wait_for_pull(&self) {
        self.pulls
            .recv_timeout(PATIENCE)
            .expect("serve loop asked for the next line");
    }
}
