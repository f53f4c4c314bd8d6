use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Wakes the janitor thread early when the cache is torn down.
#[derive(Debug, Default)]
struct StopSignal {
  stopped: Mutex<bool>,
  condvar: Condvar,
}

/// The background task that rotates cache generations on a fixed period.
///
/// The thread never keeps the process alive and never keeps the cache
/// alive: the tick closure is expected to hold only a weak reference and
/// to return `false` once the cache is gone.
#[derive(Debug)]
pub(crate) struct Janitor {
  handle: JoinHandle<()>,
  signal: Arc<StopSignal>,
}

impl Janitor {
  /// Spawns a janitor that calls `tick` every `period`, starting one
  /// period from now.
  pub(crate) fn spawn<F>(period: Duration, mut tick: F) -> io::Result<Self>
  where
    F: FnMut() -> bool + Send + 'static,
  {
    let signal = Arc::new(StopSignal::default());
    let thread_signal = signal.clone();

    let handle = thread::Builder::new()
      .name("authcache-janitor".to_string())
      .spawn(move || {
        trace!(?period, "Eviction janitor started");
        let mut stopped = thread_signal.stopped.lock();
        let mut next_run = Instant::now() + period;

        while !*stopped {
          let timed_out = thread_signal
            .condvar
            .wait_until(&mut stopped, next_run)
            .timed_out();
          if *stopped {
            break;
          }
          if !timed_out {
            continue;
          }

          // Run the tick without the signal lock so `stop` never waits on it.
          let keep_running = parking_lot::MutexGuard::unlocked(&mut stopped, &mut tick);
          if !keep_running {
            break;
          }
          next_run = Instant::now() + period;
        }
        trace!("Eviction janitor stopped");
      })?;

    Ok(Self { handle, signal })
  }

  /// Signals the thread to stop and waits for it to exit.
  ///
  /// When called from the janitor thread itself (the cache was dropped
  /// during a tick), the thread is left to exit on its own.
  pub(crate) fn stop(self) {
    *self.signal.stopped.lock() = true;
    self.signal.condvar.notify_all();

    if self.handle.thread().id() != thread::current().id() {
      let _ = self.handle.join();
    }
  }
}
