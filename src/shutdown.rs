use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Process wide stop signal shared by the long running loops
///
/// Cloning is cheap and every clone observes the same signal. Waiting is done on a condition
/// variable so a sleeping loop wakes up as soon as the signal fires.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal and wakes every waiter
    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks for at most the given timeout, returns true if the signal has fired
    ///
    /// # Arguments
    ///
    /// * 'timeout' - max time to wait
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());

        while !*stopped {
            stopped = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    cvar.wait_timeout(stopped, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                },
                // unrepresentable deadline, only the signal ends the wait
                None => cvar.wait(stopped).unwrap_or_else(|e| e.into_inner()),
            };
        }

        *stopped
    }
}
