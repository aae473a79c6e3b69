//! Session-scoped environment provisioning
//!
//! An [`EnvironmentSession`] is a scoped acquisition: entering it applies the
//! defaults, closing it runs teardown. Teardown runs exactly once, whether
//! the session is closed explicitly, dropped normally, or dropped while a
//! panicking test unwinds.
//!
//! [`ensure_test_environment`] holds the process-wide session every fixture
//! depends on. One test binary is one session, closed when the process exits.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use atlas_shared_config::{ConfigResult, ServiceConfig};

use crate::env::{load_config_env_lenient, AppliedDefaults, EnvDefaults};
use crate::logging::init_test_tracing;
use crate::paths::{session_paths, TestPaths};

/// File in the config directory loaded after the defaults
pub const CONFIG_ENV_FILE: &str = "test.env";

type TeardownHook = Box<dyn FnOnce() + Send>;

/// Scoped application of environment defaults
#[must_use = "dropping the session runs its teardown"]
pub struct EnvironmentSession {
    applied: AppliedDefaults,
    restore_on_exit: bool,
    hooks: Mutex<Vec<TeardownHook>>,
    closed: AtomicBool,
}

impl EnvironmentSession {
    /// Apply `defaults` to the process environment and open the session
    pub fn enter(defaults: &EnvDefaults) -> Self {
        let applied = defaults.apply();
        tracing::debug!(
            applied = applied.applied().count(),
            preserved = applied.preserved().count(),
            "environment session opened"
        );
        Self {
            applied,
            restore_on_exit: false,
            hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// On close, remove the variables this session introduced
    ///
    /// Variables that were already set are never touched.
    pub fn restore_on_exit(mut self, restore: bool) -> Self {
        self.restore_on_exit = restore;
        self
    }

    pub fn applied(&self) -> &AppliedDefaults {
        &self.applied
    }

    /// Register cleanup to run when the session closes
    ///
    /// Hooks run in reverse registration order. A hook registered after the
    /// session closed runs immediately.
    pub fn on_teardown(&self, hook: impl FnOnce() + Send + 'static) {
        if self.is_closed() {
            run_hook(Box::new(hook));
            return;
        }
        self.lock_hooks().push(Box::new(hook));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run teardown; later calls do nothing
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let hooks = std::mem::take(&mut *self.lock_hooks());
        for hook in hooks.into_iter().rev() {
            run_hook(hook);
        }

        if self.restore_on_exit {
            for name in self.applied.applied() {
                std::env::remove_var(name);
                tracing::debug!(name, "removed session default");
            }
        }

        tracing::debug!("environment session closed");
    }

    fn lock_hooks(&self) -> std::sync::MutexGuard<'_, Vec<TeardownHook>> {
        self.hooks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for EnvironmentSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EnvironmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentSession")
            .field("applied", &self.applied)
            .field("restore_on_exit", &self.restore_on_exit)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// A failing hook must not stop the rest of teardown.
fn run_hook(hook: TeardownHook) {
    if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
        tracing::error!("session teardown hook panicked");
    }
}

/// Run `body` inside a session, guaranteeing teardown before returning
///
/// If `body` panics, teardown still runs and the panic is then resumed.
/// Intended for `harness = false` test binaries that drive their own main.
pub fn run_session<F, R>(defaults: &EnvDefaults, body: F) -> R
where
    F: FnOnce(&EnvironmentSession) -> R,
{
    let session = EnvironmentSession::enter(defaults);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&session)));
    session.close();
    match outcome {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// The provisioned process-wide test environment
#[derive(Debug)]
pub struct TestEnvironment {
    session: EnvironmentSession,
    from_config_file: Vec<String>,
}

impl TestEnvironment {
    /// What the session did for each recognised variable
    pub fn applied(&self) -> &AppliedDefaults {
        self.session.applied()
    }

    /// Variables loaded from the config directory's `test.env`
    pub fn from_config_file(&self) -> &[String] {
        &self.from_config_file
    }

    pub fn paths(&self) -> &'static TestPaths {
        session_paths()
    }

    /// Typed configuration built from the provisioned environment
    pub fn config(&self) -> ConfigResult<ServiceConfig> {
        ServiceConfig::from_env()
    }

    /// Register cleanup for the process-wide session
    ///
    /// Hooks run once when the test process exits, or earlier if something
    /// calls [`TestEnvironment::shutdown`].
    pub fn on_teardown(&self, hook: impl FnOnce() + Send + 'static) {
        self.session.on_teardown(hook);
    }

    /// Close the process-wide session; safe to call more than once
    pub fn shutdown(&self) {
        self.session.close();
    }

    // Defaults first, then the env file, so the file only fills variables
    // the defaults do not name.
    fn provision(defaults: &EnvDefaults, env_file: &Path) -> Self {
        let session = EnvironmentSession::enter(defaults);
        init_test_tracing();
        let from_config_file = load_config_env_lenient(env_file, defaults);

        for entry in session.applied().iter() {
            tracing::debug!(name = %entry.name, value = %entry.value, origin = ?entry.origin, "test environment");
        }
        tracing::info!(
            applied = session.applied().applied().count(),
            from_config_file = from_config_file.len(),
            "test environment ready"
        );

        Self {
            session,
            from_config_file,
        }
    }
}

static TEST_ENVIRONMENT: OnceLock<TestEnvironment> = OnceLock::new();

/// Provision the process-wide test environment, once
///
/// Applies [`EnvDefaults::standard`] to whatever is unset, initialises test
/// tracing, then loads `config/test.env` (if present) for any other
/// variables. Every fixture calls this first, so the defaults exist before
/// any fixture reads the environment. Never fails.
pub fn ensure_test_environment() -> &'static TestEnvironment {
    TEST_ENVIRONMENT.get_or_init(|| {
        let env_file = session_paths().config_dir().join(CONFIG_ENV_FILE);
        TestEnvironment::provision(&EnvDefaults::standard(), &env_file)
    })
}

// Statics are never dropped, so the process-wide session is closed on exit.
// Unwinding out of an exit handler aborts, hence the catch_unwind.
#[ctor::dtor]
fn close_test_environment_at_exit() {
    if let Some(environment) = TEST_ENVIRONMENT.get() {
        if panic::catch_unwind(AssertUnwindSafe(|| environment.shutdown())).is_err() {
            eprintln!("atlas test environment teardown panicked at exit");
        }
    }
}
