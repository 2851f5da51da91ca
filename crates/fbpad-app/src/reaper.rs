//! SIGCHLD handling: reap finished children and nothing else.

use std::io;
use std::ptr;

extern "C" fn reap_children(_signal: libc::c_int) {
    // SAFETY: only async-signal-safe calls; errno is restored for the code
    // that was interrupted.
    unsafe {
        let errno = libc::__errno_location();
        let saved = *errno;
        while libc::waitpid(-1, ptr::null_mut(), libc::WNOHANG) > 0 {}
        *errno = saved;
    }
}

/// Install the SIGCHLD handler.
pub fn install() -> io::Result<()> {
    // SAFETY: the sigaction struct is fully initialized before use and the
    // handler only reaps.
    let ret = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = reap_children as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART | libc::SA_NOCLDSTOP;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGCHLD, &action, ptr::null_mut())
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    log::debug!("SIGCHLD handler installed");
    Ok(())
}
