//! Per-PID Accessibility observers hosted on a dedicated run-loop thread.
//!
//! `AXObserver` delivers callbacks through a CFRunLoop source, so every
//! observer lives on one background thread that spins its run loop in short
//! slices and drains a command channel between slices. Callbacks forward
//! window-created / element-destroyed notifications as [`AxSignal`]s.
//!
//! `subscribe` only queues the install and returns; it never waits on the
//! host thread. Install failures are logged there, and the poll tick covers
//! any process left without an observer.

use std::{
    collections::HashMap,
    ffi::c_void,
    ptr,
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use core_foundation::{
    base::{CFRelease, CFTypeRef, TCFType},
    runloop::{CFRunLoop, CFRunLoopGetCurrent, CFRunLoopSourceRef, kCFRunLoopDefaultMode},
    string::{CFString, CFStringRef},
};
use crossbeam_channel::{Receiver, Sender};
use notimover_engine::{AxEvents, AxResult, AxSignal, Subscription};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::{
    ax::AXElem,
    error::{Error, K_AX_ERROR_NOTIFICATION_ALREADY_REGISTERED, Result},
};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXObserverCreate(
        pid: i32,
        callback: extern "C" fn(*mut c_void, *mut c_void, CFStringRef, *mut c_void),
        out: *mut *mut c_void,
    ) -> i32;
    fn AXObserverAddNotification(
        observer: *mut c_void,
        element: *mut c_void,
        notification: CFStringRef,
        refcon: *mut c_void,
    ) -> i32;
    fn AXObserverRemoveNotification(
        observer: *mut c_void,
        element: *mut c_void,
        notification: CFStringRef,
    ) -> i32;
    fn AXObserverGetRunLoopSource(observer: *mut c_void) -> *mut c_void;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFEqual(a: CFTypeRef, b: CFTypeRef) -> bool;
    fn CFRunLoopAddSource(rl: *mut c_void, source: CFRunLoopSourceRef, mode: CFStringRef);
    fn CFRunLoopRemoveSource(rl: *mut c_void, source: CFRunLoopSourceRef, mode: CFStringRef);
}

/// Run-loop slice between command drains.
const RUN_SLICE: Duration = Duration::from_millis(50);

/// App-level notifications every observer registers.
const NOTIFICATIONS: [&str; 2] = ["AXWindowCreated", "AXUIElementDestroyed"];

/// CF-backed RAII for AXObserverRef.
struct AxObserver(*mut c_void);

impl AxObserver {
    #[inline]
    fn from_create(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr)) }
    }

    #[inline]
    fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

impl Drop for AxObserver {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) }
    }
}

/// Callback context; owned by [`Installed`] and reclaimed on drop.
struct Ctx {
    /// Observed process.
    pid: i32,
    /// Signal sink.
    sink: UnboundedSender<AxSignal>,
    /// `AXWindowCreated`.
    created: CFString,
    /// `AXUIElementDestroyed`.
    destroyed: CFString,
}

extern "C" fn ax_callback(
    _observer: *mut c_void,
    _element: *mut c_void,
    notification: CFStringRef,
    refcon: *mut c_void,
) {
    if refcon.is_null() {
        return;
    }
    // SAFETY: refcon is the Ctx installed alongside this observer and
    // outlives it.
    let ctx = unsafe { &*(refcon as *const Ctx) };
    let equals = |s: &CFString| unsafe {
        CFEqual(notification as CFTypeRef, s.as_concrete_TypeRef() as CFTypeRef)
    };
    let signal = if equals(&ctx.created) {
        AxSignal::WindowCreated { pid: ctx.pid }
    } else if equals(&ctx.destroyed) {
        AxSignal::ElementDestroyed { pid: ctx.pid }
    } else {
        return;
    };
    trace!(pid = ctx.pid, ?signal, "ax notification");
    let _ = ctx.sink.send(signal);
}

/// One observer installed on the host thread's run loop.
struct Installed {
    /// Observer reference.
    observer: AxObserver,
    /// Application element the notifications are registered on.
    app: AXElem,
    /// Host run loop.
    rl: *mut c_void,
    /// Observer's run-loop source.
    source: CFRunLoopSourceRef,
    /// Registered notification names.
    subs: Vec<&'static str>,
    /// Boxed [`Ctx`].
    ctx: *mut Ctx,
}

impl Installed {
    fn install(pid: i32, sink: UnboundedSender<AxSignal>) -> Result<Self> {
        let mut obs_ptr: *mut c_void = ptr::null_mut();
        let err = unsafe { AXObserverCreate(pid, ax_callback, &mut obs_ptr) };
        if err != 0 {
            return Err(Error::AxCode(err));
        }
        let observer = AxObserver::from_create(obs_ptr).ok_or(Error::AxCode(err))?;
        let app = AXElem::application(pid)?;
        let source = unsafe { AXObserverGetRunLoopSource(observer.as_ptr()) } as CFRunLoopSourceRef;
        if source.is_null() {
            return Err(Error::ObserverHost("observer has no run-loop source".into()));
        }
        let ctx = Box::into_raw(Box::new(Ctx {
            pid,
            sink,
            created: CFString::from_static_string(NOTIFICATIONS[0]),
            destroyed: CFString::from_static_string(NOTIFICATIONS[1]),
        }));
        let rl = unsafe { CFRunLoopGetCurrent() } as *mut c_void;
        unsafe { CFRunLoopAddSource(rl, source, kCFRunLoopDefaultMode) };
        let mut me = Self {
            observer,
            app,
            rl,
            source,
            subs: Vec::new(),
            ctx,
        };
        for name in NOTIFICATIONS {
            let cf = CFString::from_static_string(name);
            let err = unsafe {
                AXObserverAddNotification(
                    me.observer.as_ptr(),
                    me.app.as_ptr(),
                    cf.as_concrete_TypeRef(),
                    me.ctx as *mut c_void,
                )
            };
            match err {
                0 | K_AX_ERROR_NOTIFICATION_ALREADY_REGISTERED => me.subs.push(name),
                e => warn!(pid, notification = name, code = e, "AXObserverAddNotification failed"),
            }
        }
        if me.subs.is_empty() {
            return Err(Error::ObserverHost(format!("no notifications registered for pid {pid}")));
        }
        Ok(me)
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        unsafe {
            for name in self.subs.drain(..) {
                let cf = CFString::from_static_string(name);
                let _ = AXObserverRemoveNotification(
                    self.observer.as_ptr(),
                    self.app.as_ptr(),
                    cf.as_concrete_TypeRef(),
                );
            }
            CFRunLoopRemoveSource(self.rl, self.source, kCFRunLoopDefaultMode);
            if !self.ctx.is_null() {
                drop(Box::from_raw(self.ctx));
                self.ctx = ptr::null_mut();
            }
        }
    }
}

/// Request to the host thread.
enum HostCmd {
    /// Install an observer for `pid` under `token`.
    Add {
        token: u64,
        pid: i32,
        sink: UnboundedSender<AxSignal>,
    },
    /// Remove the observer registered under `token`.
    Remove { token: u64 },
}

fn host_loop(rx: &Receiver<HostCmd>) {
    let mut installed: HashMap<u64, Installed> = HashMap::new();
    loop {
        loop {
            match rx.try_recv() {
                Ok(HostCmd::Add { token, pid, sink }) => match Installed::install(pid, sink) {
                    Ok(obs) => {
                        debug!(pid, token, "observer installed");
                        installed.insert(token, obs);
                    }
                    Err(e) => warn!(pid, token, error = %e, "observer install failed"),
                },
                Ok(HostCmd::Remove { token }) => {
                    installed.remove(&token);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    debug!(observers = installed.len(), "observer host exiting");
                    return;
                }
            }
        }
        let _ = CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_SLICE, false);
    }
}

/// [`AxEvents`] implementation owning the observer host thread.
pub struct ObserverHost {
    /// Command channel to the host thread.
    tx: Sender<HostCmd>,
    /// Token source for subscriptions.
    next: AtomicU64,
}

impl ObserverHost {
    /// Start the host thread.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("notimover-ax-observer".into())
            .spawn(move || host_loop(&rx))
            .map_err(|e| Error::ObserverHost(e.to_string()))?;
        Ok(Self {
            tx,
            next: AtomicU64::new(1),
        })
    }
}

impl AxEvents for ObserverHost {
    fn subscribe(
        &self,
        pid: i32,
        sink: UnboundedSender<AxSignal>,
    ) -> AxResult<Box<dyn Subscription>> {
        let token = self.next.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(HostCmd::Add { token, pid, sink })
            .map_err(|_| Error::ObserverHost("host thread exited".into()))?;
        trace!(pid, token, "observer install queued");
        Ok(Box::new(ObserverGuard {
            token,
            tx: self.tx.clone(),
        }))
    }
}

/// Live observer registration; removes the observer on drop.
struct ObserverGuard {
    /// Registration token.
    token: u64,
    /// Host command channel.
    tx: Sender<HostCmd>,
}

impl Subscription for ObserverGuard {}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(HostCmd::Remove { token: self.token });
    }
}

#[cfg(test)]
mod tests {
    use std::{process, time::Instant};

    use super::*;

    #[test]
    fn subscribe_returns_without_waiting_for_install() {
        let host = ObserverHost::spawn().unwrap();
        let (sink, _rx) = tokio::sync::mpsc::unbounded_channel();
        let started = Instant::now();
        let guard = host.subscribe(process::id() as i32, sink).unwrap();
        assert!(started.elapsed() < RUN_SLICE);
        drop(guard);
    }

    #[test]
    fn subscribe_fails_once_host_is_gone() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let host = ObserverHost {
            tx,
            next: AtomicU64::new(1),
        };
        let (sink, _rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(host.subscribe(1, sink).is_err());
    }
}
