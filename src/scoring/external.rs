use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;
use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use crate::core::error::{Error, ErrorKind, Result};
use crate::scoring::calculator::{Argument, ArgumentType, ScoreCalculator};

/// Argument passed across the library boundary; `kind` follows the
/// `ArgumentType` discriminant order.
#[repr(C)]
pub struct RawArgument {
    pub kind: u32,
    pub value: f64,
}

/// C-ABI calculator handed out by an external library. The engine owns
/// the pointer but releases it only through the library, never directly.
#[repr(C)]
pub struct RawScoreCalculator {
    pub state: *mut c_void,
    /// Fill `out` (capacity slots) with required argument kinds, return count
    pub argument_types:
        unsafe extern "C" fn(state: *mut c_void, out: *mut u32, capacity: usize) -> usize,
    pub prepare: unsafe extern "C" fn(state: *mut c_void, args: *const RawArgument, len: usize),
    pub first_step:
        unsafe extern "C" fn(state: *mut c_void, args: *const RawArgument, len: usize) -> f64,
    pub second_step:
        unsafe extern "C" fn(state: *mut c_void, args: *const RawArgument, len: usize) -> f64,
    pub copy: unsafe extern "C" fn(state: *mut c_void) -> *mut RawScoreCalculator,
    pub release: unsafe extern "C" fn(this: *mut RawScoreCalculator),
}

type GetFn = unsafe extern "C" fn(*const u16) -> *mut RawScoreCalculator;
type ReleaseFn = unsafe extern "C" fn(*mut RawScoreCalculator);

struct ExternalLibrary {
    // kept alive for the life of the process
    _library: Library,
    get: GetFn,
    release: ReleaseFn,
}

// Function pointers stay valid for as long as _library is held
unsafe impl Send for ExternalLibrary {}
unsafe impl Sync for ExternalLibrary {}

static LIBRARIES: Lazy<Mutex<HashMap<String, Arc<ExternalLibrary>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn get_or_load(path: &str) -> Result<Arc<ExternalLibrary>> {
    let mut map = LIBRARIES.lock();
    if let Some(lib) = map.get(path) {
        return Ok(lib.clone());
    }
    let library = unsafe { Library::new(path) }
        .map_err(|e| Error::new(ErrorKind::BadArgument, e.to_string()))?;
    let get = unsafe {
        *library
            .get::<GetFn>(b"DBGetScoreCalculator\0")
            .map_err(|e| Error::new(ErrorKind::FunctionNotFound, e.to_string()))?
    };
    let release = unsafe {
        *library
            .get::<ReleaseFn>(b"DBReleaseScoreCalculator\0")
            .map_err(|e| Error::new(ErrorKind::FunctionNotFound, e.to_string()))?
    };
    let lib = Arc::new(ExternalLibrary { _library: library, get, release });
    map.insert(path.to_string(), lib.clone());
    Ok(lib)
}

fn argument_kind(raw: u32) -> ArgumentType {
    match raw {
        0 => ArgumentType::TermFrequency,
        1 => ArgumentType::DocumentLength,
        2 => ArgumentType::AverageDocumentLength,
        3 => ArgumentType::DocumentFrequency,
        _ => ArgumentType::TotalDocumentFrequency,
    }
}

fn raw_kind(kind: ArgumentType) -> u32 {
    match kind {
        ArgumentType::TermFrequency => 0,
        ArgumentType::DocumentLength => 1,
        ArgumentType::AverageDocumentLength => 2,
        ArgumentType::DocumentFrequency => 3,
        ArgumentType::TotalDocumentFrequency => 4,
    }
}

fn raw_args(args: &[Argument]) -> Vec<RawArgument> {
    args.iter()
        .map(|a| RawArgument { kind: raw_kind(a.kind), value: a.value })
        .collect()
}

/// Wrapper around a calculator served by a dynamic library.
/// Parameter form "library-path:payload".
pub struct ExternalScoreCalculator {
    library: Option<Arc<ExternalLibrary>>,
    raw: *mut RawScoreCalculator,
}

// The raw calculator is confined to one wrapper; the library contract
// requires instances to be usable from the thread that owns them.
unsafe impl Send for ExternalScoreCalculator {}

impl ExternalScoreCalculator {
    pub fn load(params: &str) -> Result<Self> {
        let (path, payload) = match params.split_once(':') {
            Some((p, rest)) => (p, rest),
            None => (params, ""),
        };
        if path.is_empty() {
            return Err(Error::new(ErrorKind::WrongParameter, "empty library name"));
        }
        let library = get_or_load(path)?;
        let wide: Vec<u16> = payload.encode_utf16().chain(std::iter::once(0)).collect();
        let raw = unsafe { (library.get)(wide.as_ptr()) };
        if raw.is_null() {
            return Err(Error::new(
                ErrorKind::BadArgument,
                format!("calculator rejected payload: {}", payload),
            ));
        }
        Ok(ExternalScoreCalculator { library: Some(library), raw })
    }

    /// Wrap an already constructed raw calculator (used by copy and tests)
    pub fn from_raw(raw: *mut RawScoreCalculator) -> Self {
        ExternalScoreCalculator { library: None, raw }
    }
}

impl ScoreCalculator for ExternalScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        args.clear();
        let mut kinds = [0u32; 8];
        let n = unsafe {
            ((*self.raw).argument_types)((*self.raw).state, kinds.as_mut_ptr(), kinds.len())
        };
        for &k in &kinds[..n.min(kinds.len())] {
            args.push(Argument::new(argument_kind(k)));
        }
    }

    fn prepare(&mut self, args: &[Argument]) {
        let raw = raw_args(args);
        unsafe { ((*self.raw).prepare)((*self.raw).state, raw.as_ptr(), raw.len()) }
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        let raw = raw_args(args);
        unsafe { ((*self.raw).first_step)((*self.raw).state, raw.as_ptr(), raw.len()) }
    }

    fn second_step(&self, args: &[Argument]) -> f64 {
        let raw = raw_args(args);
        unsafe { ((*self.raw).second_step)((*self.raw).state, raw.as_ptr(), raw.len()) }
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        let raw = unsafe { ((*self.raw).copy)((*self.raw).state) };
        Box::new(ExternalScoreCalculator { library: self.library.clone(), raw })
    }
}

impl Drop for ExternalScoreCalculator {
    fn drop(&mut self) {
        unsafe {
            match &self.library {
                Some(lib) => (lib.release)(self.raw),
                None => ((*self.raw).release)(self.raw),
            }
        }
    }
}
