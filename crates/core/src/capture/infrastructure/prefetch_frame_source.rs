use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

type Item = Result<Option<Frame>, CaptureError>;

struct Worker {
    rx: crossbeam_channel::Receiver<Item>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn FrameSource>>,
}

/// Decodes frames on a dedicated thread ahead of the consumer.
///
/// Layout: `reader thread → bounded channel → next_frame`
///
/// The reader thread owns the wrapped source between `open` and `close`;
/// frames arrive in the order the source produced them and the stream ends
/// after the first end-of-stream or error item.
pub struct PrefetchFrameSource {
    inner: Option<Box<dyn FrameSource>>,
    capacity: usize,
    worker: Option<Worker>,
    opened_at: Option<Instant>,
    finished: bool,
}

impl PrefetchFrameSource {
    pub fn new(inner: Box<dyn FrameSource>) -> Self {
        Self::with_capacity(inner, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(inner: Box<dyn FrameSource>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            worker: None,
            opened_at: None,
            finished: false,
        }
    }
}

impl FrameSource for PrefetchFrameSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        let inner = self.inner.take().ok_or_else(|| CaptureError::Open {
            source_name: "prefetch".into(),
            reason: "already open".into(),
        })?;

        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);
        let (tx, rx) = crossbeam_channel::bounded::<Item>(self.capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_reader(inner, open_tx, tx, stop.clone());

        match open_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker { rx, stop, handle });
                self.opened_at = Some(Instant::now());
                self.finished = false;
                Ok(())
            }
            Ok(Err(e)) => {
                if let Ok(inner) = handle.join() {
                    self.inner = Some(inner);
                }
                Err(e)
            }
            Err(_) => Err(CaptureError::Open {
                source_name: "prefetch".into(),
                reason: "reader thread exited before opening".into(),
            }),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let worker = self.worker.as_ref().ok_or(CaptureError::NotOpen)?;
        if self.finished {
            return Ok(None);
        }
        match worker.rx.recv() {
            Ok(item) => {
                if !matches!(item, Ok(Some(_))) {
                    self.finished = true;
                }
                item
            }
            Err(_) => {
                self.finished = true;
                Err(CaptureError::Read("reader thread stopped unexpectedly".into()))
            }
        }
    }

    fn elapsed(&self) -> Duration {
        self.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Relaxed);
        drop(worker.rx);
        match worker.handle.join() {
            Ok(inner) => self.inner = Some(inner),
            Err(_) => log::error!("Prefetch reader thread panicked"),
        }
        self.opened_at = None;
    }
}

impl Drop for PrefetchFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_reader(
    mut inner: Box<dyn FrameSource>,
    open_tx: crossbeam_channel::Sender<Result<(), CaptureError>>,
    frame_tx: crossbeam_channel::Sender<Item>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn FrameSource>> {
    std::thread::spawn(move || {
        let opened = inner.open();
        let ok = opened.is_ok();
        let _ = open_tx.send(opened);
        if ok {
            while !stop.load(Ordering::Relaxed) {
                let item = inner.next_frame();
                let last = !matches!(item, Ok(Some(_)));
                if frame_tx.send(item).is_err() || last {
                    break;
                }
            }
        }
        inner.close();
        inner
    })
}
