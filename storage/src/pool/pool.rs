use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{info, warn};
use parking_lot::{Condvar, Mutex};

use crate::driver::{Endpoint, Row, StorageDriver, Value};
use crate::error::{DriverError, StorageError};

use super::config::PoolConfig;
use super::session::Session;

struct PoolInner {
    /// Front = most recently released. Acquire pops the front so hot
    /// sessions stay hot and cold ones age out.
    idle: VecDeque<Session>,
    /// Live sessions, idle plus checked out.
    total: usize,
}

/// A bounded set of validated, recyclable storage sessions.
///
/// `acquire` waits up to its timeout on a condition variable; `release`
/// happens automatically when the returned guard drops. Two background
/// workers validate idle sessions and evict idle/expired ones; both exit
/// promptly on shutdown.
pub struct ConnectionPool {
    config: PoolConfig,
    endpoint: Endpoint,
    driver: Arc<dyn StorageDriver>,
    inner: Mutex<PoolInner>,
    available: Condvar,
    shutdown: AtomicBool,
    next_session_id: AtomicU64,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// Builds the pool and eagerly creates `initial` sessions. Creation
    /// failures are tolerated here: the pool starts degraded and fills
    /// lazily.
    pub fn new(config: PoolConfig, driver: Arc<dyn StorageDriver>) -> Arc<Self> {
        let endpoint = Endpoint::new(&config.host, config.port);
        let pool = Arc::new(Self {
            endpoint,
            driver,
            inner: Mutex::new(PoolInner {
                idle: VecDeque::new(),
                total: 0,
            }),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
            next_session_id: AtomicU64::new(1),
            workers: Mutex::new(Vec::new()),
            config,
        });

        {
            let mut inner = pool.inner.lock();
            for _ in 0..pool.config.initial.min(pool.config.max) {
                match pool.create_session() {
                    Ok(session) => {
                        inner.idle.push_back(session);
                        inner.total += 1;
                    }
                    Err(error) => {
                        warn!(
                            "pool '{}': initial session creation failed: {error}",
                            pool.config.name
                        );
                        break;
                    }
                }
            }
        }

        pool
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn idle_count(&self) -> usize {
        self.inner.lock().idle.len()
    }

    pub fn total_count(&self) -> usize {
        self.inner.lock().total
    }

    fn create_session(&self) -> Result<Session, StorageError> {
        if !self
            .driver
            .validate(&self.endpoint, &self.config.validation_query)
        {
            return Err(StorageError::Unreachable {
                endpoint: self.endpoint.to_string(),
            });
        }
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        Ok(Session::new(id, self.endpoint.clone()))
    }

    /// Waits up to `timeout` for a free session, validating on borrow when
    /// configured. A zero timeout returns immediately with a session or
    /// `Exhausted`.
    pub fn acquire(self: &Arc<Self>, timeout: Duration) -> Result<SessionGuard, StorageError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(StorageError::InvalidState {
                    reason: format!("pool '{}' is shut down", self.config.name),
                });
            }

            // reuse the most recently released healthy session
            while let Some(mut session) = inner.idle.pop_front() {
                if session.is_broken() || session.expired(self.config.max_lifetime) {
                    inner.total -= 1;
                    continue;
                }
                if self.config.test_on_borrow
                    && !self
                        .driver
                        .validate(&self.endpoint, &self.config.validation_query)
                {
                    // validation-on-borrow failure: discard and retry with
                    // the next candidate
                    inner.total -= 1;
                    continue;
                }
                session.touch();
                return Ok(SessionGuard {
                    pool: Arc::clone(self),
                    session: Some(session),
                });
            }

            if inner.total < self.config.max {
                inner.total += 1;
                drop(inner);
                match self.create_session() {
                    Ok(session) => {
                        return Ok(SessionGuard {
                            pool: Arc::clone(self),
                            session: Some(session),
                        });
                    }
                    Err(error) => {
                        self.inner.lock().total -= 1;
                        return Err(error);
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StorageError::Exhausted {
                    pool: self.config.name.clone(),
                });
            }
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                // loop once more: a session may have been released exactly
                // at the deadline
            }
        }
    }

    fn release(&self, mut session: Session) {
        session.touch();
        let discard = session.is_broken()
            || session.expired(self.config.max_lifetime)
            || (self.config.test_on_return
                && !self
                    .driver
                    .validate(&self.endpoint, &self.config.validation_query));

        let mut inner = self.inner.lock();
        if discard || self.shutdown.load(Ordering::Acquire) {
            inner.total -= 1;
        } else {
            inner.idle.push_front(session);
        }
        drop(inner);
        self.available.notify_one();
    }

    fn discard(&self, session: Session) {
        drop(session);
        let mut inner = self.inner.lock();
        inner.total -= 1;
        drop(inner);
        self.available.notify_one();
    }

    /// Starts the idle-validation and eviction workers.
    pub fn start_workers(self: &Arc<Self>) {
        let validator = {
            let pool = Arc::clone(self);
            std::thread::spawn(move || pool.validation_loop())
        };
        let evictor = {
            let pool = Arc::clone(self);
            std::thread::spawn(move || pool.eviction_loop())
        };
        self.workers.lock().extend([validator, evictor]);
    }

    fn sleep_interval(&self, interval: Duration) -> bool {
        // sliced sleep so shutdown is observed promptly
        let slice = Duration::from_millis(50);
        let mut remaining = interval;
        while remaining > Duration::ZERO {
            if self.shutdown.load(Ordering::Acquire) {
                return false;
            }
            std::thread::sleep(slice.min(remaining));
            remaining = remaining.saturating_sub(slice);
        }
        !self.shutdown.load(Ordering::Acquire)
    }

    fn validation_loop(self: Arc<Self>) {
        while self.sleep_interval(self.config.validation_interval) {
            if !self.config.test_while_idle {
                continue;
            }
            let mut inner = self.inner.lock();
            let mut kept = VecDeque::with_capacity(inner.idle.len());
            while let Some(session) = inner.idle.pop_front() {
                if self
                    .driver
                    .validate(&self.endpoint, &self.config.validation_query)
                {
                    kept.push_back(session);
                } else {
                    warn!(
                        "pool '{}': idle session {} failed validation, discarding",
                        self.config.name,
                        session.id()
                    );
                    inner.total -= 1;
                }
            }
            inner.idle = kept;
        }
    }

    fn eviction_loop(self: Arc<Self>) {
        while self.sleep_interval(Duration::from_secs(1)) {
            let mut inner = self.inner.lock();
            let min = self.config.min;
            let idle_timeout = self.config.idle_timeout;
            let max_lifetime = self.config.max_lifetime;

            let mut kept = VecDeque::with_capacity(inner.idle.len());
            while let Some(session) = inner.idle.pop_front() {
                let evictable_idle =
                    session.idle_for() >= idle_timeout && inner.total > min;
                if session.expired(max_lifetime) || evictable_idle {
                    inner.total -= 1;
                } else {
                    kept.push_back(session);
                }
            }
            inner.idle = kept;
        }
    }

    /// Wakes all acquirers (they observe the shutdown), closes idle
    /// sessions and joins the workers.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("pool '{}': shutting down", self.config.name);

        {
            let mut inner = self.inner.lock();
            let closed = inner.idle.len();
            inner.total -= closed;
            inner.idle.clear();
        }
        self.available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

/// Encapsulates acquire + automatic release on every exit path. Guards
/// cannot be copied; moving one transfers session ownership.
pub struct SessionGuard {
    pool: Arc<ConnectionPool>,
    session: Option<Session>,
}

impl SessionGuard {
    pub fn session(&self) -> &Session {
        self.session.as_ref().expect("guard holds a session until drop")
    }

    /// Executes a query on this session through the pool's driver. Errors
    /// that indicate a dead connection mark the session broken so release
    /// discards it.
    pub fn execute(&mut self, query: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let session = self.session.as_mut().expect("guard holds a session until drop");
        session.touch();
        let endpoint = session.endpoint().clone();
        match self.pool.driver.execute(&endpoint, query, params) {
            Ok(rows) => Ok(rows),
            Err(error) => {
                if matches!(
                    error,
                    DriverError::Unreachable { .. } | DriverError::Timeout { .. }
                ) {
                    session.mark_broken();
                }
                Err(StorageError::from_driver(error))
            }
        }
    }

    /// Explicitly discards the session instead of recycling it.
    pub fn discard(mut self) {
        if let Some(session) = self.session.take() {
            self.pool.discard(session);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // release is idempotent with respect to already-discarded sessions:
        // the option is taken exactly once
        if let Some(session) = self.session.take() {
            self.pool.release(session);
        }
    }
}
