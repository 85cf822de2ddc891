//! Reads the simulator's shared-memory telemetry pages.
//!
//! The game publishes three fixed-layout pages; we read the physics page
//! (pedals, forces, wheels, engine) and the graphics page (session status,
//! lap times). Under Proton the Windows file mappings `Local\acpmf_*`
//! appear as POSIX shared memory objects, so we open them with `shm_open`
//! and map them read-only.
//!
//! Field offsets follow the game's published layout and must not be
//! rearranged. The page starts with a packet id that the game bumps on
//! every write; we read it before and after copying the page and discard
//! the snapshot if it moved underneath us.

use crate::telemetry::{SessionStatus, TelemetrySample, TelemetrySource, Wheels};

use log::{debug, info, warn};
use std::{
    ffi::CString,
    fmt, io,
    time::{Duration, Instant},
};

const PHYSICS_NAME: &str = "/acpmf_physics";
const GRAPHICS_NAME: &str = "/acpmf_graphics";

const PHYSICS_SIZE: usize = 732;
const GRAPHICS_SIZE: usize = 1420;

/// How long to wait between attempts to attach to a game that is not
/// running yet.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// A nice little error for everything that can go wrong while attaching
/// to the simulator's shared memory.
#[derive(Debug)]
pub enum ShmError {
    /// `shm_open` failed, usually because the game is not running.
    Open(String, io::Error),

    /// `mmap` failed after the object was opened.
    Map(String, io::Error),

    /// The shared memory name contained an interior NUL byte.
    BadName(String),
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShmError::Open(name, e) => write!(f, "could not open {}: {}", name, e),
            ShmError::Map(name, e) => write!(f, "could not map {}: {}", name, e),
            ShmError::BadName(name) => write!(f, "invalid shared memory name {:?}", name),
        }
    }
}

impl std::error::Error for ShmError {}

/// One mapped, read-only shared memory page.
struct Page {
    ptr: *const u8,
    len: usize,
}

// The mapping is read-only and never mutated through this pointer.
unsafe impl Send for Page {}

impl Page {
    fn open(name: &str, len: usize) -> Result<Self, ShmError> {
        let c_name =
            CString::new(name).map_err(|_| ShmError::BadName(name.to_owned()))?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if fd < 0 {
            return Err(ShmError::Open(name.to_owned(), io::Error::last_os_error()));
        }

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        // The fd is no longer needed once the mapping exists.
        unsafe { libc::close(fd) };

        if ptr == libc::MAP_FAILED {
            return Err(ShmError::Map(name.to_owned(), io::Error::last_os_error()));
        }

        Ok(Page {
            ptr: ptr as *const u8,
            len,
        })
    }

    /// The page's leading packet id, read volatile so the two reads that
    /// bracket a snapshot are not collapsed.
    fn packet_id(&self) -> i32 {
        unsafe { std::ptr::read_volatile(self.ptr as *const i32) }
    }

    /// Copy the whole page into an owned buffer.
    fn snapshot(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.len];
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr, buf.as_mut_ptr(), self.len);
        }
        buf
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
    }
}

fn read_f32(buf: &[u8], offset: usize) -> f32 {
    let bytes: [u8; 4] = buf[offset..offset + 4]
        .try_into()
        .expect("offset within page");
    f32::from_le_bytes(bytes)
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let bytes: [u8; 4] = buf[offset..offset + 4]
        .try_into()
        .expect("offset within page");
    i32::from_le_bytes(bytes)
}

fn read_wheels(buf: &[u8], offset: usize) -> Wheels {
    Wheels {
        front_left: read_f32(buf, offset),
        front_right: read_f32(buf, offset + 4),
        rear_left: read_f32(buf, offset + 8),
        rear_right: read_f32(buf, offset + 12),
    }
}

/// Decode a physics-page snapshot plus a graphics-page snapshot into a
/// [`TelemetrySample`]. Offsets per the game's layout.
fn decode_sample(physics: &[u8], graphics: &[u8]) -> TelemetrySample {
    TelemetrySample {
        status: SessionStatus::from_raw(read_i32(graphics, 4)),

        throttle: read_f32(physics, 4),
        brake: read_f32(physics, 8),
        fuel: read_f32(physics, 12),
        gear: read_i32(physics, 16),
        rpm: read_i32(physics, 20),
        steer_angle: read_f32(physics, 24),
        speed_kmh: read_f32(physics, 28),

        g_lateral: read_f32(physics, 44),
        g_longitudinal: read_f32(physics, 48),
        g_vertical: read_f32(physics, 52),

        wheel_slip: read_wheels(physics, 56),
        tire_pressure: read_wheels(physics, 88),
        tire_temp: read_wheels(physics, 152),

        clutch: read_f32(physics, 344),

        tc_active: read_f32(physics, 204),
        abs_active: read_f32(physics, 244),
        turbo_boost: read_f32(physics, 252),
        water_temp: read_f32(physics, 644),

        current_lap: read_i32(graphics, 80),
        last_lap: read_i32(graphics, 84),
        best_lap: read_i32(graphics, 88),
    }
}

/// A [`TelemetrySource`] backed by the live game. Attaching is lazy and
/// retried on a timer, so the program can be started before the game.
pub struct SharedMemorySource {
    physics_name: String,
    graphics_name: String,
    physics: Option<Page>,
    graphics: Option<Page>,
    last_attempt: Option<Instant>,
}

impl Default for SharedMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMemorySource {
    pub fn new() -> Self {
        Self::with_names(PHYSICS_NAME, GRAPHICS_NAME)
    }

    fn with_names(physics_name: &str, graphics_name: &str) -> Self {
        Self {
            physics_name: physics_name.to_owned(),
            graphics_name: graphics_name.to_owned(),
            physics: None,
            graphics: None,
            last_attempt: None,
        }
    }

    /// Try to attach both pages. Failure is expected while the game is
    /// down and only logged at debug level.
    fn try_attach(&mut self) {
        if let Some(at) = self.last_attempt {
            if at.elapsed() < RECONNECT_INTERVAL {
                return;
            }
        }
        self.last_attempt = Some(Instant::now());

        match (
            Page::open(&self.physics_name, PHYSICS_SIZE),
            Page::open(&self.graphics_name, GRAPHICS_SIZE),
        ) {
            (Ok(p), Ok(g)) => {
                info!("attached to simulator shared memory");
                self.physics = Some(p);
                self.graphics = Some(g);
            }
            (Err(e), _) | (_, Err(e)) => {
                debug!("simulator not available yet: {}", e);
                self.physics = None;
                self.graphics = None;
            }
        }
    }

    /// Detach, so the next poll goes through the reconnect path.
    fn drop_pages(&mut self) {
        self.physics = None;
        self.graphics = None;
    }
}

impl Iterator for SharedMemorySource {
    type Item = TelemetrySample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.physics.is_none() || self.graphics.is_none() {
            self.try_attach();
        }
        let (physics, graphics) = match (&self.physics, &self.graphics) {
            (Some(p), Some(g)) => (p, g),
            _ => return None,
        };

        let phys_before = physics.packet_id();
        let graph_before = graphics.packet_id();
        let phys_buf = physics.snapshot();
        let graph_buf = graphics.snapshot();
        let graph_after = graphics.packet_id();
        let phys_after = physics.packet_id();

        if phys_before != phys_after || graph_before != graph_after {
            // The game wrote mid-copy. Skip this tick; the next one will
            // land between writes.
            warn!(
                "torn telemetry read (physics {} -> {}, graphics {} -> {})",
                phys_before, phys_after, graph_before, graph_after
            );
            return None;
        }
        if phys_before == 0 || graph_before == 0 {
            // Pages exist but the game has not published anything yet.
            self.drop_pages();
            return None;
        }

        Some(decode_sample(&phys_buf, &graph_buf))
    }
}

impl TelemetrySource for SharedMemorySource {
    fn connected(&self) -> bool {
        self.physics.is_some() && self.graphics.is_some()
    }
}
