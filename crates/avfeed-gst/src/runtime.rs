//! GLib main loop on a dedicated thread.
//!
//! Some video sinks (the macOS one in particular) only render while a
//! default-context main loop is running.

use std::io;
use std::thread::JoinHandle;

use gst::glib;
use tracing::{debug, warn};

pub struct PipelineRuntime {
    main_loop: glib::MainLoop,
    handle: Option<JoinHandle<()>>,
}

impl Default for PipelineRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRuntime {
    pub fn new() -> Self {
        Self {
            main_loop: glib::MainLoop::new(None, false),
            handle: None,
        }
    }

    /// Spawns the loop thread. Calling it again while running is a no-op.
    pub fn start(&mut self) -> io::Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let main_loop = self.main_loop.clone();
        let handle = std::thread::Builder::new()
            .name("avfeed-glib".into())
            .spawn(move || {
                debug!("glib main loop running");
                main_loop.run();
                debug!("glib main loop exited");
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Quits the loop and joins its thread.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // Dispatched by the loop itself, so a quit issued before `run` starts is not lost.
        let main_loop = self.main_loop.clone();
        glib::idle_add_once(move || main_loop.quit());
        if handle.join().is_err() {
            warn!("glib main loop thread panicked");
        }
    }
}

impl Drop for PipelineRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
