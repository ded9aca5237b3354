//! Real pointer injection through `enigo`.
//!
//! `Enigo` handles are not `Send` on every platform, so the handle lives on a
//! dedicated `pointer-injector` thread and commands reach it over a channel.

use super::{InjectionError, InjectionResult, MouseButton, PointerSink};
use crate::motion::{MonitorGeometry, MonitorTarget};
use enigo::{Enigo, MouseControllable};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

enum Request {
    MoveTo(i32, i32),
    Click(MouseButton, u32),
    Press(MouseButton),
    Release(MouseButton),
    Location(Sender<(i32, i32)>),
    Shutdown,
}

fn to_enigo(button: MouseButton) -> enigo::MouseButton {
    match button {
        MouseButton::Left => enigo::MouseButton::Left,
        MouseButton::Right => enigo::MouseButton::Right,
        MouseButton::Middle => enigo::MouseButton::Middle,
    }
}

/// OS pointer backed by `enigo`.
pub struct EnigoPointer {
    requests: Mutex<Sender<Request>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    geometry: Option<MonitorGeometry>,
}

impl EnigoPointer {
    /// Spawn the injector thread and query the main display size.
    pub fn new() -> InjectionResult<Self> {
        let (tx, rx) = mpsc::channel::<Request>();
        let (size_tx, size_rx) = mpsc::channel::<(i32, i32)>();

        let handle = thread::Builder::new()
            .name("pointer-injector".into())
            .spawn(move || {
                let mut enigo = Enigo::new();
                let _ = size_tx.send(enigo.main_display_size());
                for request in rx {
                    match request {
                        Request::MoveTo(x, y) => enigo.mouse_move_to(x, y),
                        Request::Click(button, count) => {
                            for _ in 0..count {
                                enigo.mouse_click(to_enigo(button));
                            }
                        }
                        Request::Press(button) => enigo.mouse_down(to_enigo(button)),
                        Request::Release(button) => enigo.mouse_up(to_enigo(button)),
                        Request::Location(reply) => {
                            let _ = reply.send(enigo.mouse_location());
                        }
                        Request::Shutdown => break,
                    }
                }
            })
            .map_err(|e| InjectionError::Unavailable(format!("Failed to spawn injector thread: {}", e)))?;

        let geometry = match size_rx.recv_timeout(REPLY_TIMEOUT) {
            Ok((w, h)) if w > 0 && h > 0 => Some(MonitorGeometry::new(w as u32, h as u32)),
            Ok((w, h)) => {
                warn!(width = w, height = h, "Display reported an empty size");
                None
            }
            Err(_) => {
                return Err(InjectionError::Unavailable(
                    "Injector thread did not start".into(),
                ))
            }
        };

        info!(?geometry, "Enigo pointer backend ready");
        Ok(Self {
            requests: Mutex::new(tx),
            worker: Mutex::new(Some(handle)),
            geometry,
        })
    }

    fn send(&self, request: Request) -> InjectionResult<()> {
        self.requests
            .lock()
            .send(request)
            .map_err(|_| InjectionError::Unavailable("Injector thread has exited".into()))
    }
}

impl PointerSink for EnigoPointer {
    fn move_to(&self, x: i32, y: i32) -> InjectionResult<()> {
        self.send(Request::MoveTo(x, y))
    }

    fn click(&self, button: MouseButton, count: u32) -> InjectionResult<()> {
        self.send(Request::Click(button, count))
    }

    fn press(&self, button: MouseButton) -> InjectionResult<()> {
        self.send(Request::Press(button))
    }

    fn release(&self, button: MouseButton) -> InjectionResult<()> {
        self.send(Request::Release(button))
    }

    fn position(&self) -> InjectionResult<MonitorTarget> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(Request::Location(reply_tx))?;
        let (x, y) = reply_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| InjectionError::Unavailable("No cursor location reply".into()))?;
        Ok(MonitorTarget::new(x, y))
    }

    fn display_geometry(&self) -> Option<MonitorGeometry> {
        self.geometry
    }
}

impl Drop for EnigoPointer {
    fn drop(&mut self) {
        let _ = self.send(Request::Shutdown);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}
