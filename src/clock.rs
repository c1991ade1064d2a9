use std::sync::Arc;
use chrono::{DateTime, Utc};

/// Source of the current time, injected wherever "now" matters
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of the host
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;
    use chrono::{DateTime, TimeDelta, Utc};
    use super::Clock;

    /// Clock that only moves when told to
    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(Mutex::new(start))
        }

        pub fn advance(&self, delta: TimeDelta) {
            let mut now = self.0.lock().unwrap();
            *now = *now + delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }
}
