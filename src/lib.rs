//! # TunerSpecs Core
//!
//! Engine catalog and build configurator core, designed for FFI integration
//! with mobile and desktop front ends. Garage data is kept in a local LMDB
//! store; everything else is session state derived from the reference catalog.
//!
//! ## Features
//!
//! - **Calculators**: static compression ratio and piston-to-deck clearance
//! - **Selection**: make → model → engine drill-down with a reset cascade on engine change
//! - **Garage**: persisted user builds with a free-tier quota
//! - **Comparison**: side-by-side table over a fixed list of specifications
//! - **AI advisor**: request/response contract for a remote completion service
//!
//! ## Quick Start
//!
//! ```no_run
//! use tunerspecs_core::{create_app, dispatch_action, free_response};
//! use std::ffi::CString;
//!
//! let name = CString::new("garage").unwrap();
//! let catalog = CString::new(r#"{"engines":[]}"#).unwrap();
//! let app = create_app(name.as_ptr(), catalog.as_ptr());
//!
//! let action = CString::new(r#"{"type":"selectMake","make":"Honda"}"#).unwrap();
//! let result = dispatch_action(app, action.as_ptr());
//! free_response(result);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_app`] - Open the garage store and load the catalog
//! - [`dispatch_action`] - Apply one [`app_state::Action`] and return the new snapshot
//! - [`get_snapshot`] - Current [`app_state::AppSnapshot`]
//! - [`close_app`] - Flush the store and release the instance
//! - [`free_response`] - Release a string returned by any of the above

pub mod advisory;
pub mod app_response;
pub mod app_state;
pub mod build_model;
pub mod build_repository;
pub mod calculator;
pub mod catalog;
pub mod catalog_model;
pub mod comparison;
pub mod config;
pub mod kv_store;
pub mod selection;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};

use crate::advisory::AdvisoryGateway;
use crate::app_response::AppResponse;
use crate::app_state::{Action, AppStore};
use crate::catalog::ReferenceCatalog;
use crate::config::AppConfig;
use crate::kv_store::LmdbStore;

/// Application instance handed across the FFI boundary.
pub type AppHandle = AppStore<LmdbStore>;

/// Creates an application instance.
///
/// Opens (or creates) the LMDB store `<name>.lmdb` and loads the reference
/// catalog from `catalog_json`. The AI advisor is configured with the models
/// from [`AppConfig::from_env`] and stays unavailable until a Rust host
/// installs its transport with [`AppStore::set_transport`].
///
/// # Returns
///
/// A pointer to the instance, or null when an argument is invalid, the
/// catalog does not parse or the store cannot be opened. Release it with
/// [`close_app`].
///
/// # Safety
///
/// Both arguments must be null or valid null-terminated UTF-8 strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_app(name: *const c_char, catalog_json: *const c_char) -> *mut AppHandle {
    if name.is_null() || catalog_json.is_null() {
        warn!("Null pointer passed to create_app");
        return std::ptr::null_mut();
    }

    let (name_c, catalog_c) = unsafe { (CStr::from_ptr(name), CStr::from_ptr(catalog_json)) };
    let (name_str, catalog_str) = match (name_c.to_str(), catalog_c.to_str()) {
        (Ok(name), Ok(catalog)) => (name, catalog),
        _ => {
            warn!("Invalid UTF-8 passed to create_app");
            return std::ptr::null_mut();
        }
    };

    let config = AppConfig::from_env();
    let store_name = if name_str.trim().is_empty() {
        config.store_name.as_str()
    } else {
        name_str
    };

    let catalog = match ReferenceCatalog::from_json(catalog_str) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Failed to load catalog: {e}");
            return std::ptr::null_mut();
        }
    };

    let store = match LmdbStore::init(store_name) {
        Ok(store) => store,
        Err(e) => {
            warn!("Failed to open store {store_name}.lmdb: {e}");
            return std::ptr::null_mut();
        }
    };

    info!("App initialized with store {store_name}.lmdb");
    let gateway = AdvisoryGateway::configured(config.models());
    Box::into_raw(Box::new(AppStore::new(catalog, store, gateway)))
}

/// Applies one action.
///
/// `action_json` is an [`Action`] tagged by `type`, for example
/// `{"type":"selectEngine","engineCode":"K20A"}`.
///
/// # Returns
///
/// `Ok` carrying the snapshot JSON after the action, or the error the action
/// produced. State changes made before an error (such as a build that was
/// kept in memory but not persisted) remain visible through [`get_snapshot`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn dispatch_action(
    app: *mut AppHandle,
    action_json: *const c_char,
) -> *const c_char {
    let app = match unsafe { app.as_mut() } {
        Some(app) => app,
        None => {
            let error = AppResponse::BadRequest("Null app pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    let json_str = match c_ptr_to_string(action_json, "action") {
        Ok(json) => json,
        Err(err) => return err,
    };

    let action: Action = match serde_json::from_str(&json_str) {
        Ok(action) => action,
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid action: {e}"));
            return response_to_c_string(&error);
        }
    };

    match app.dispatch(action) {
        Ok(()) => snapshot_response(app),
        Err(e) => response_to_c_string(&e),
    }
}

/// Returns the current snapshot as `Ok(json)`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_snapshot(app: *mut AppHandle) -> *const c_char {
    match unsafe { app.as_ref() } {
        Some(app) => snapshot_response(app),
        None => {
            let error = AppResponse::BadRequest("Null app pointer".to_string());
            response_to_c_string(&error)
        }
    }
}

/// Flushes the store and frees the instance. The pointer must not be used
/// afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_app(app: *mut AppHandle) -> *const c_char {
    if app.is_null() {
        let error = AppResponse::BadRequest("Null app pointer".to_string());
        return response_to_c_string(&error);
    }

    let app = unsafe { Box::from_raw(app) };
    match app.into_store().close() {
        Ok(()) => response_to_c_string(&AppResponse::success("App closed")),
        Err(e) => {
            warn!("Error closing store: {e}");
            response_to_c_string(&e)
        }
    }
}

/// Releases a string returned by this library. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn snapshot_response(app: &AppHandle) -> *const c_char {
    match serde_json::to_string(&app.snapshot()) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error =
                AppResponse::SerializationError(format!("Failed to serialize snapshot: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Serializes a response into a heap-allocated C string owned by the caller.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string argument, or returns a ready-made `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
