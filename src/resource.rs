//! Resource envelope: CPU-time rlimit, SIGXCPU trapping, and the
//! `getrusage`-backed `status` command.
//!
//! Grounded the way a PVF prepare-worker bounds its own CPU budget: a single
//! `setrlimit(RLIMIT_CPU, ...)` call at startup plus a signal handler that
//! flips a flag rather than unwinding, so the evaluator's cooperative
//! `on_progress` poll can abort the running script on its own terms instead
//! of being torn down mid-allocation by an asynchronous signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use nix::sys::resource::{getrusage, setrlimit, Resource, UsageWho};
use serde::Serialize;

static CPU_LIMIT_HIT: AtomicBool = AtomicBool::new(false);
static SIGXCPU_INSTALLED: OnceLock<()> = OnceLock::new();

/// Reads `RECURSE_CPU_LIMIT_SEC` and, if set, installs both the rlimit and
/// the SIGXCPU handler. Absent or malformed env var: no limit is installed
/// and a warning is logged — configuration problems degrade, they never
/// crash the worker.
pub fn install_cpu_limit() {
    let Ok(raw) = std::env::var("RECURSE_CPU_LIMIT_SEC") else {
        return;
    };
    let Ok(seconds) = raw.parse::<u64>() else {
        tracing::warn!(value = %raw, "RECURSE_CPU_LIMIT_SEC is not a valid integer, ignoring");
        return;
    };
    if seconds == 0 {
        tracing::warn!("RECURSE_CPU_LIMIT_SEC is 0, ignoring");
        return;
    }

    if let Err(e) = setrlimit(Resource::RLIMIT_CPU, seconds, seconds) {
        tracing::warn!(error = %e, "failed to install RLIMIT_CPU, continuing without a hard cap");
    }

    install_sigxcpu_handler();
}

fn install_sigxcpu_handler() {
    SIGXCPU_INSTALLED.get_or_init(|| {
        use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
        extern "C" fn on_sigxcpu(_: i32) {
            CPU_LIMIT_HIT.store(true, Ordering::SeqCst);
        }
        let action = SigAction::new(SigHandler::Handler(on_sigxcpu), SaFlags::empty(), SigSet::empty());
        // SAFETY: `on_sigxcpu` only performs an atomic store, which is
        // signal-safe; no allocation or locking occurs in the handler.
        if let Err(e) = unsafe { sigaction(Signal::SIGXCPU, &action) } {
            tracing::warn!(error = %e, "failed to install SIGXCPU handler");
        }
    });
}

/// Polled by the evaluator's `on_progress` callback to decide whether to
/// abort the in-flight script. Once tripped it stays tripped — the process
/// is expected to shut down shortly after a CPU-limit abort.
pub fn cpu_limit_hit() -> bool {
    CPU_LIMIT_HIT.load(Ordering::SeqCst)
}

#[derive(Debug, Serialize)]
pub struct StatusRecord {
    pub running: bool,
    pub memory_used_mb: f64,
    pub uptime_seconds: f64,
    pub exec_count: u64,
    pub user_cpu_ms: i64,
    pub sys_cpu_ms: i64,
    pub total_cpu_ms: i64,
}

/// `status` command handler. Uses `RUSAGE_SELF` since the worker reports on
/// its own process, unlike a supervising parent that would ask about a
/// child via `RUSAGE_CHILDREN`.
pub fn status(uptime_ms: u128, exec_count: u64) -> StatusRecord {
    let (memory_used_mb, user_cpu_ms, sys_cpu_ms) = match getrusage(UsageWho::RUSAGE_SELF) {
        Ok(usage) => {
            // Linux reports ru_maxrss in KiB already; macOS reports bytes.
            // This worker only ships on Linux, so no unit correction is
            // needed here, unlike the original implementation's
            // cross-platform branch.
            let mb = usage.max_rss() as f64 / 1024.0;
            let user = usage.user_time();
            let sys = usage.system_time();
            (mb, user.tv_sec() * 1000 + user.tv_usec() / 1000, sys.tv_sec() * 1000 + sys.tv_usec() / 1000)
        }
        Err(e) => {
            tracing::warn!(error = %e, "getrusage failed, reporting zeroed resource stats");
            (0.0, 0, 0)
        }
    };

    StatusRecord {
        running: true,
        memory_used_mb,
        uptime_seconds: uptime_ms as f64 / 1000.0,
        exec_count,
        user_cpu_ms,
        sys_cpu_ms,
        total_cpu_ms: user_cpu_ms + sys_cpu_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_panics_without_a_limit_installed() {
        let record = status(1000, 3);
        assert_eq!(record.uptime_seconds, 1.0);
        assert_eq!(record.exec_count, 3);
        assert!(record.running);
    }

    #[test]
    fn missing_env_var_is_a_silent_noop() {
        std::env::remove_var("RECURSE_CPU_LIMIT_SEC");
        install_cpu_limit();
    }
}
